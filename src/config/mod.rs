//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply CLI/env overrides)
//!     → validation.rs (semantic checks)
//!     → FaucetConfig (validated, immutable)
//!     → consumed once at startup to build endpoints and the server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are referenced by environment variable name only

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError, ConfigOverrides};
pub use schema::{
    CaptchaConfig, ClaimConfig, CooldownGating, FaucetConfig, ListenerConfig, NetworkConfig,
    ObservabilityConfig, SecurityConfig,
};
