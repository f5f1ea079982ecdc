//! Chain-specific types and error definitions.

use serde::Serialize;
use thiserror::Error;

pub use crate::config::schema::NetworkConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Every configured RPC endpoint rejected or dropped the transaction.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The recipient is not a valid address for this network.
    #[error("Invalid recipient address '{0}'")]
    InvalidRecipient(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Result of submitting one transfer on one network.
///
/// Submission failures are data, not errors: a failed outcome never aborts
/// transfers on sibling networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkOutcome {
    /// Network name.
    pub network: String,
    /// Whether the network accepted the submission.
    pub success: bool,
    /// Transaction hash, present on success.
    pub transaction_id: Option<String>,
    /// Human-readable reason, present on failure.
    pub error_message: Option<String>,
}

impl NetworkOutcome {
    pub fn succeeded(network: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            success: true,
            transaction_id: Some(transaction_id.into()),
            error_message: None,
        }
    }

    pub fn failed(network: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            success: false,
            transaction_id: None,
            error_message: Some(error_message.into()),
        }
    }
}
