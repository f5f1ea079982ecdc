//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated config into a ready `ClaimOrchestrator`
//! - Load each network's custodial key and connect its endpoint
//!
//! # Design Decisions
//! - Fail fast: a missing key or unusable RPC URL is fatal
//! - An unreachable node is not; the endpoint reports failures per claim
//! - Networks connect in configured order, which is also response order

use alloy::primitives::utils::UnitsError;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{BlockchainError, EvmEndpoint, NetworkEndpoint, Wallet};
use crate::claims::{ClaimOrchestrator, ClaimPolicy};
use crate::config::FaucetConfig;
use crate::verification::{HCaptchaVerifier, HumanVerifier};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid claim amount: {0}")]
    Amount(#[from] UnitsError),

    #[error("Network '{network}': {source}")]
    Network {
        network: String,
        #[source]
        source: BlockchainError,
    },
}

/// Build the orchestrator with live EVM endpoints and the hCaptcha verifier.
pub async fn build_orchestrator(config: &FaucetConfig) -> Result<ClaimOrchestrator, StartupError> {
    let policy = ClaimPolicy::from_config(&config.claims)?;

    let mut networks: Vec<Arc<dyn NetworkEndpoint>> = Vec::with_capacity(config.networks.len());
    for network in &config.networks {
        let wrap = |source| StartupError::Network {
            network: network.name.clone(),
            source,
        };
        let wallet = Wallet::from_env(&network.private_key_env).map_err(wrap)?;
        let endpoint = EvmEndpoint::connect(network.clone(), wallet)
            .await
            .map_err(wrap)?;
        networks.push(Arc::new(endpoint));
    }

    let verifier: Arc<dyn HumanVerifier> = Arc::new(HCaptchaVerifier::from_config(&config.captcha));

    tracing::info!(
        networks = networks.len(),
        amount = %policy.amount_display,
        cooldown_secs = policy.cooldown.as_secs(),
        gating = ?policy.gating,
        "Claim orchestrator ready"
    );

    Ok(ClaimOrchestrator::new(networks, verifier, policy))
}
