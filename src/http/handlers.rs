//! Request handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::claims::{ClaimError, ClaimRequest};
use crate::http::response::{ApiError, ClaimResponse, FailureEntry, SuccessEntry};
use crate::http::server::AppState;

/// Claim request body. Absent fields are caught by the orchestrator.
#[derive(Debug, Default, Deserialize)]
pub struct ClaimBody {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "captchaToken")]
    pub captcha_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NetworkHealth {
    pub name: String,
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub networks: Vec<NetworkHealth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworksResponse {
    pub networks: Vec<String>,
    pub amount: String,
    pub currency_symbol: String,
    pub cooldown_secs: u64,
}

/// `POST /api/claim`
pub async fn claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimBody>, JsonRejection>,
) -> Result<Json<ClaimResponse>, ApiError> {
    // An unreadable body is treated like one with the fields missing.
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable claim body");
        ClaimError::InvalidInput
    })?;

    let request = ClaimRequest::new(
        body.address.unwrap_or_default(),
        body.captcha_token.unwrap_or_default(),
    );
    let result = state.orchestrator.claim(request).await?;

    if !result.overall_success {
        return Err(ApiError::AllNetworksFailed(result.failures));
    }

    let policy = state.orchestrator.policy();
    let total = result.successes.len() + result.failures.len();
    let message = if result.is_complete() {
        format!("Successfully sent {} {}", policy.amount_display, policy.currency_symbol)
    } else {
        format!(
            "Partially successful: sent {} {} on {} of {} networks",
            policy.amount_display,
            policy.currency_symbol,
            result.successes.len(),
            total
        )
    };

    let tx_hash = if state.orchestrator.networks().len() == 1 {
        result
            .successes
            .first()
            .and_then(|outcome| outcome.transaction_id.clone())
    } else {
        None
    };

    Ok(Json(ClaimResponse {
        message,
        successful: result.successes.iter().map(SuccessEntry::from).collect(),
        failed: result.failures.iter().map(FailureEntry::from).collect(),
        tx_hash,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let checks = state.orchestrator.networks().iter().map(|network| async move {
        NetworkHealth {
            name: network.name().to_string(),
            healthy: network.is_healthy().await,
        }
    });
    let networks = join_all(checks).await;

    let status = if networks.iter().all(|n| n.healthy) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        networks,
    })
}

/// `GET /api/networks`
pub async fn networks(State(state): State<AppState>) -> Json<NetworksResponse> {
    let policy = state.orchestrator.policy();
    Json(NetworksResponse {
        networks: state
            .orchestrator
            .networks()
            .iter()
            .map(|n| n.name().to_string())
            .collect(),
        amount: policy.amount_display.clone(),
        currency_symbol: policy.currency_symbol.clone(),
        cooldown_secs: policy.cooldown.as_secs(),
    })
}
