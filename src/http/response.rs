//! Response bodies and error-to-status mapping.
//!
//! # Wire Shapes
//! ```text
//! 200 { message, successful: [{chain, txHash}], failed: [{chain, error}], txHash? }
//! 400 { message }
//! 400 { message, retryAfterSecs }              cooldown, plus Retry-After
//! 500 { message, details: [{chain, error}] }   no network sent funds
//! 500 { message }                              anything unhandled
//! ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::types::NetworkOutcome;
use crate::claims::ClaimError;

/// A network that accepted the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessEntry {
    pub chain: String,
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

/// A network that did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub chain: String,
    pub error: String,
}

impl From<&NetworkOutcome> for SuccessEntry {
    fn from(outcome: &NetworkOutcome) -> Self {
        Self {
            chain: outcome.network.clone(),
            tx_hash: outcome.transaction_id.clone().unwrap_or_default(),
        }
    }
}

impl From<&NetworkOutcome> for FailureEntry {
    fn from(outcome: &NetworkOutcome) -> Self {
        Self {
            chain: outcome.network.clone(),
            error: outcome
                .error_message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        }
    }
}

/// Body of a successful (possibly partial) claim.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub message: String,
    pub successful: Vec<SuccessEntry>,
    pub failed: Vec<FailureEntry>,
    /// Set for single-network deployments.
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FailureEntry>>,
    #[serde(rename = "retryAfterSecs", skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// No dispatched network accepted the transfer. Networks skipped for
    /// cooldown are listed in the details too.
    #[error("Failed to send funds on every eligible network")]
    AllNetworksFailed(Vec<NetworkOutcome>),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Claim(_) => StatusCode::BAD_REQUEST,
            Self::AllNetworksFailed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whole seconds until a cooldown rejection may be retried.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Claim(ClaimError::CooldownActive { retry_after, .. }) => {
                Some(whole_secs(*retry_after))
            }
            _ => None,
        }
    }
}

fn whole_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            Self::AllNetworksFailed(failures) => Some(failures.iter().map(FailureEntry::from).collect()),
            _ => None,
        };

        let retry_after_secs = self.retry_after();

        let body = MessageBody {
            message: self.to_string(),
            details,
            retry_after_secs,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
