//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variable (custodial private key), NetworkConfig
//!     → wallet.rs (key loading)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → transaction.rs (gas policy, build, sign)
//!     → endpoint.rs (nonce tracking, broadcast, outcome reporting)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod client;
pub mod endpoint;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use endpoint::{EvmEndpoint, NetworkEndpoint};
pub use types::{BlockchainError, ChainId, NetworkOutcome};
pub use wallet::Wallet;
