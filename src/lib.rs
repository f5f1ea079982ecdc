//! Testnet faucet library.
//!
//! Dispenses a fixed amount of test currency to a requesting address on one
//! or more independent networks, gated by human verification and a
//! per-network cooldown.

// Core
pub mod claims;
pub mod config;

// Collaborators
pub mod blockchain;
pub mod verification;

// Surfaces and cross-cutting concerns
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use claims::{ClaimOrchestrator, ClaimRequest, ClaimResult};
pub use config::schema::FaucetConfig;
pub use http::FaucetServer;
pub use lifecycle::Shutdown;
