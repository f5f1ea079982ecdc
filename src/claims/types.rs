//! Claim request, result and error types.

use std::time::Duration;
use thiserror::Error;

use crate::blockchain::types::NetworkOutcome;

/// One end-user request for funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Recipient address; only checked for presence here, the network
    /// rejects malformed ones.
    pub recipient_address: String,
    /// Proof-of-humanity token from the client.
    pub verification_token: String,
}

impl ClaimRequest {
    pub fn new(recipient_address: impl Into<String>, verification_token: impl Into<String>) -> Self {
        Self {
            recipient_address: recipient_address.into(),
            verification_token: verification_token.into(),
        }
    }
}

/// Aggregated per-network outcomes of a claim, in configured network order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimResult {
    /// True when at least one network accepted a transfer.
    pub overall_success: bool,
    pub successes: Vec<NetworkOutcome>,
    pub failures: Vec<NetworkOutcome>,
}

impl ClaimResult {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = NetworkOutcome>) -> Self {
        let (successes, failures): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(|outcome| outcome.success);

        Self {
            overall_success: !successes.is_empty(),
            successes,
            failures,
        }
    }

    /// Whether every network accepted its transfer.
    pub fn is_complete(&self) -> bool {
        self.overall_success && self.failures.is_empty()
    }
}

/// Reasons a claim is rejected before or instead of dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("Missing required fields")]
    InvalidInput,

    #[error("Invalid captcha")]
    VerificationFailed,

    #[error(
        "Please wait {} between claims on {}",
        describe_duration(.window),
        .networks.join(", ")
    )]
    CooldownActive {
        /// Networks still cooling down for this address.
        networks: Vec<String>,
        /// Configured cooldown window.
        window: Duration,
        /// Time until every listed network is eligible again.
        retry_after: Duration,
    },
}

/// Render a duration the way users read it: "24 hours", "90 minutes".
pub fn describe_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}
