//! Claim orchestration.
//!
//! # Data Flow
//! ```text
//! ClaimRequest
//!     → Validating        (address and token present)
//!     → Verifying         (HumanVerifier)
//!     → CheckingCooldown  (reserve every network's cooldown slot)
//!     → Dispatching       (one detached task per reserved network: submit,
//!                          then commit on success or release on failure)
//!     → Aggregating       (outcomes in configured order)
//!     → ClaimResult
//! ```
//!
//! # Design Decisions
//! - Rejections before dispatch have no side effects
//! - A failed network never consumes the caller's cooldown on that network
//! - Dropping a claim (client gone, request timeout) does not abort its
//!   submissions; each still settles its own cooldown slot when it finishes
//! - Outcomes are reported in configured network order, whatever order the
//!   submissions finish in

use alloy::primitives::utils::{parse_ether, UnitsError};
use alloy::primitives::U256;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::endpoint::NetworkEndpoint;
use crate::blockchain::types::NetworkOutcome;
use crate::claims::cooldown::{now_millis, CooldownBlock, CooldownTracker};
use crate::claims::types::{ClaimError, ClaimRequest, ClaimResult};
use crate::config::schema::{ClaimConfig, CooldownGating};
use crate::observability::metrics;
use crate::verification::HumanVerifier;

/// What a claim dispenses and how cooldowns gate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPolicy {
    /// Amount sent per network, in wei.
    pub amount: U256,
    /// Amount as configured, for messages ("0.1").
    pub amount_display: String,
    pub currency_symbol: String,
    pub gating: CooldownGating,
    pub cooldown: Duration,
}

impl ClaimPolicy {
    pub fn from_config(config: &ClaimConfig) -> Result<Self, UnitsError> {
        Ok(Self {
            amount: parse_ether(&config.amount_ether)?,
            amount_display: config.amount_ether.clone(),
            currency_symbol: config.currency_symbol.clone(),
            gating: config.gating,
            cooldown: Duration::from_secs(config.cooldown_secs),
        })
    }
}

/// Runs claims against the configured networks.
pub struct ClaimOrchestrator {
    networks: Vec<Arc<dyn NetworkEndpoint>>,
    verifier: Arc<dyn HumanVerifier>,
    cooldowns: CooldownTracker,
    policy: ClaimPolicy,
}

impl ClaimOrchestrator {
    pub fn new(
        networks: Vec<Arc<dyn NetworkEndpoint>>,
        verifier: Arc<dyn HumanVerifier>,
        policy: ClaimPolicy,
    ) -> Self {
        let cooldowns = CooldownTracker::new(policy.cooldown);
        Self {
            networks,
            verifier,
            cooldowns,
            policy,
        }
    }

    /// Configured networks, in response order.
    pub fn networks(&self) -> &[Arc<dyn NetworkEndpoint>] {
        &self.networks
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn policy(&self) -> &ClaimPolicy {
        &self.policy
    }

    /// Run one claim now.
    pub async fn claim(&self, request: ClaimRequest) -> Result<ClaimResult, ClaimError> {
        self.claim_at(request, now_millis()).await
    }

    /// Run one claim as if at `now_ms`.
    pub async fn claim_at(
        &self,
        request: ClaimRequest,
        now_ms: u64,
    ) -> Result<ClaimResult, ClaimError> {
        let span = tracing::info_span!(
            "claim",
            claim_id = %Uuid::new_v4(),
            recipient = %request.recipient_address.trim(),
        );
        self.run_claim(request, now_ms).instrument(span).await
    }

    async fn run_claim(
        &self,
        request: ClaimRequest,
        now_ms: u64,
    ) -> Result<ClaimResult, ClaimError> {
        // Validating
        let address = request.recipient_address.trim();
        let token = request.verification_token.as_str();
        if address.is_empty() || token.trim().is_empty() {
            metrics::record_claim("invalid_input");
            return Err(ClaimError::InvalidInput);
        }

        // Verifying; the token goes to the provider exactly as received.
        if !self.verifier.verify(token).await {
            tracing::info!(recipient = %address, "Claim rejected by human verification");
            metrics::record_claim("verification_failed");
            return Err(ClaimError::VerificationFailed);
        }

        // CheckingCooldown
        let mut reserved = Vec::with_capacity(self.networks.len());
        let mut blocked = Vec::new();
        for (index, network) in self.networks.iter().enumerate() {
            match self.cooldowns.try_reserve(network.name(), address, now_ms) {
                Ok(reservation) => reserved.push((index, network.clone(), reservation)),
                Err(block) => blocked.push((index, network.name().to_string(), block)),
            }
        }

        let gate_closed = match self.policy.gating {
            CooldownGating::PerNetwork => reserved.is_empty(),
            CooldownGating::AllNetworks => !blocked.is_empty(),
        };
        if gate_closed {
            // Dropping the reservations releases every slot taken above.
            drop(reserved);
            let error = self.cooldown_error(blocked.iter().map(|(_, name, block)| (name, *block)));
            tracing::info!(recipient = %address, reason = %error, "Claim rejected by cooldown");
            metrics::record_claim("cooldown_active");
            return Err(error);
        }

        // Dispatching
        let amount = self.policy.amount;
        let dispatches = reserved.into_iter().map(move |(index, network, reservation)| {
            let name = network.name().to_string();
            let recipient = address.to_string();
            let task = tokio::spawn(
                async move {
                    let outcome = network.submit_transfer(&recipient, amount).await;
                    if outcome.success {
                        reservation.commit(now_ms);
                    } else {
                        reservation.release();
                    }
                    outcome
                }
                .in_current_span(),
            );
            async move {
                match task.await {
                    Ok(outcome) => (index, outcome),
                    Err(e) => {
                        tracing::error!(network = %name, error = %e, "Submission task failed");
                        (index, NetworkOutcome::failed(name, "Submission task failed"))
                    }
                }
            }
        });
        let mut outcomes = join_all(dispatches).await;

        // Aggregating
        for (index, name, block) in blocked {
            let message = self.cooldown_error(std::iter::once((&name, block))).to_string();
            outcomes.push((index, NetworkOutcome::failed(name, message)));
        }
        outcomes.sort_by_key(|(index, _)| *index);
        let result = ClaimResult::from_outcomes(outcomes.into_iter().map(|(_, outcome)| outcome));

        let label = if !result.overall_success {
            "failed"
        } else if result.failures.is_empty() {
            "succeeded"
        } else {
            "partial"
        };
        metrics::record_claim(label);
        tracing::info!(
            recipient = %address,
            succeeded = result.successes.len(),
            failed = result.failures.len(),
            outcome = label,
            "Claim finished"
        );

        Ok(result)
    }

    fn cooldown_error<'a>(
        &self,
        blocked: impl Iterator<Item = (&'a String, CooldownBlock)>,
    ) -> ClaimError {
        let mut networks = Vec::new();
        let mut retry_after = Duration::ZERO;
        for (name, block) in blocked {
            let remaining = match block {
                CooldownBlock::CoolingDown { remaining } => remaining,
                CooldownBlock::InFlight => self.policy.cooldown,
            };
            retry_after = retry_after.max(remaining);
            networks.push(name.clone());
        }

        ClaimError::CooldownActive {
            networks,
            window: self.policy.cooldown,
            retry_after,
        }
    }
}

impl std::fmt::Debug for ClaimOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.networks.iter().map(|n| n.name()).collect();
        f.debug_struct("ClaimOrchestrator")
            .field("networks", &names)
            .field("cooldowns", &self.cooldowns.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const HOUR_MS: u64 = 60 * 60 * 1000;
    const T0: u64 = 1_700_000_000_000;

    struct FakeVerifier {
        accept: bool,
        calls: AtomicUsize,
        tokens: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HumanVerifier for FakeVerifier {
        async fn verify(&self, token: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens.lock().unwrap().push(token.to_string());
            self.accept
        }
    }

    struct FakeNetwork {
        name: String,
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeNetwork {
        fn new(name: &str) -> Arc<Self> {
            Self::with(name, false, Duration::ZERO)
        }

        fn failing(name: &str) -> Arc<Self> {
            Self::with(name, true, Duration::ZERO)
        }

        fn with(name: &str, fail: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail,
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NetworkEndpoint for FakeNetwork {
        fn name(&self) -> &str {
            &self.name
        }

        async fn submit_transfer(&self, _recipient: &str, _amount: U256) -> NetworkOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                NetworkOutcome::failed(&self.name, "insufficient funds for transfer")
            } else {
                NetworkOutcome::succeeded(&self.name, format!("0x{:064x}", call + 1))
            }
        }
    }

    fn policy(gating: CooldownGating) -> ClaimPolicy {
        let config = ClaimConfig {
            gating,
            ..ClaimConfig::default()
        };
        ClaimPolicy::from_config(&config).unwrap()
    }

    fn orchestrator(networks: &[Arc<FakeNetwork>], accept: bool) -> (ClaimOrchestrator, Arc<FakeVerifier>) {
        orchestrator_with(networks, accept, CooldownGating::PerNetwork)
    }

    fn orchestrator_with(
        networks: &[Arc<FakeNetwork>],
        accept: bool,
        gating: CooldownGating,
    ) -> (ClaimOrchestrator, Arc<FakeVerifier>) {
        let verifier = Arc::new(FakeVerifier {
            accept,
            calls: AtomicUsize::new(0),
            tokens: std::sync::Mutex::new(Vec::new()),
        });
        let endpoints = networks
            .iter()
            .map(|n| n.clone() as Arc<dyn NetworkEndpoint>)
            .collect();
        let orchestrator = ClaimOrchestrator::new(endpoints, verifier.clone(), policy(gating));
        (orchestrator, verifier)
    }

    fn request() -> ClaimRequest {
        ClaimRequest::new(ADDRESS, "token")
    }

    #[test]
    fn test_policy_parses_ether_amount() {
        let policy = policy(CooldownGating::PerNetwork);
        assert_eq!(policy.amount, U256::from(100_000_000_000_000_000u64));
        assert_eq!(policy.cooldown, Duration::from_secs(86_400));

        let bad = ClaimConfig {
            amount_ether: "lots".to_string(),
            ..ClaimConfig::default()
        };
        assert!(ClaimPolicy::from_config(&bad).is_err());
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_before_verification() {
        let network = FakeNetwork::new("network1");
        let (orchestrator, verifier) = orchestrator(&[network.clone()], true);

        for req in [ClaimRequest::new("", "token"), ClaimRequest::new(ADDRESS, "  ")] {
            assert_eq!(orchestrator.claim_at(req, T0).await, Err(ClaimError::InvalidInput));
        }
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_reaches_verifier_unmodified() {
        let network = FakeNetwork::new("network1");
        let (orchestrator, verifier) = orchestrator(&[network], true);

        orchestrator
            .claim_at(ClaimRequest::new(ADDRESS, " token\n"), T0)
            .await
            .unwrap();
        assert_eq!(*verifier.tokens.lock().unwrap(), vec![" token\n".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_verification_has_no_side_effects() {
        let network = FakeNetwork::new("network1");
        let (orchestrator, _) = orchestrator(&[network.clone()], false);

        let result = orchestrator.claim_at(request(), T0).await;
        assert_eq!(result, Err(ClaimError::VerificationFailed));
        assert_eq!(network.calls(), 0);
        assert!(orchestrator.cooldowns().is_empty());
    }

    #[tokio::test]
    async fn test_single_network_success_records_cooldown() {
        let network = FakeNetwork::new("network1");
        let (orchestrator, _) = orchestrator(&[network], true);

        let result = orchestrator.claim_at(ClaimRequest::new("0xABC", "token"), T0).await.unwrap();
        assert!(result.is_complete());
        assert_eq!(result.successes.len(), 1);
        assert!(!result.successes[0].transaction_id.as_deref().unwrap_or("").is_empty());
        assert_eq!(orchestrator.cooldowns().len(), 1);
        assert!(!orchestrator.cooldowns().is_eligible("network1", "0xABC", T0));
    }

    #[tokio::test]
    async fn test_cooldown_window_boundary() {
        let network = FakeNetwork::new("network1");
        let (orchestrator, _) = orchestrator(&[network.clone()], true);
        orchestrator.claim_at(request(), T0).await.unwrap();

        let almost = T0 + 23 * HOUR_MS + 59 * 60 * 1000;
        match orchestrator.claim_at(request(), almost).await {
            Err(ClaimError::CooldownActive { networks, retry_after, .. }) => {
                assert_eq!(networks, vec!["network1"]);
                assert_eq!(retry_after, Duration::from_secs(60));
            }
            other => panic!("expected cooldown, got {:?}", other),
        }
        assert_eq!(network.calls(), 1);

        let result = orchestrator.claim_at(request(), T0 + 24 * HOUR_MS).await.unwrap();
        assert!(result.overall_success);
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_records_only_successful_networks() {
        let networks = [
            FakeNetwork::new("network1"),
            FakeNetwork::failing("network2"),
            FakeNetwork::new("network3"),
        ];
        let (orchestrator, _) = orchestrator(&networks, true);

        let result = orchestrator.claim_at(request(), T0).await.unwrap();
        assert!(result.overall_success);
        assert_eq!(result.successes.len(), 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].network, "network2");
        assert_eq!(
            result.failures[0].error_message.as_deref(),
            Some("insufficient funds for transfer")
        );

        let tracker = orchestrator.cooldowns();
        assert!(!tracker.is_eligible("network1", ADDRESS, T0 + 1));
        assert!(tracker.is_eligible("network2", ADDRESS, T0 + 1));
        assert!(!tracker.is_eligible("network3", ADDRESS, T0 + 1));
    }

    #[tokio::test]
    async fn test_all_networks_failing_consumes_no_cooldown() {
        let networks = [FakeNetwork::failing("network1"), FakeNetwork::failing("network2")];
        let (orchestrator, _) = orchestrator(&networks, true);

        let result = orchestrator.claim_at(request(), T0).await.unwrap();
        assert!(!result.overall_success);
        assert_eq!(result.failures.len(), 2);
        assert!(orchestrator.cooldowns().is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_follow_configured_order() {
        let networks = [
            FakeNetwork::with("slow", false, Duration::from_millis(50)),
            FakeNetwork::new("fast"),
        ];
        let (orchestrator, _) = orchestrator(&networks, true);

        let result = orchestrator.claim_at(request(), T0).await.unwrap();
        let names: Vec<_> = result.successes.iter().map(|o| o.network.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_per_network_gating_skips_cooling_networks() {
        let networks = [FakeNetwork::new("network1"), FakeNetwork::new("network2")];
        let (orchestrator, _) = orchestrator(&networks, true);
        orchestrator.cooldowns().record_claim("network1", ADDRESS, T0);

        let result = orchestrator.claim_at(request(), T0 + HOUR_MS).await.unwrap();
        assert!(result.overall_success);
        assert_eq!(result.successes[0].network, "network2");
        assert_eq!(result.failures[0].network, "network1");
        assert_eq!(
            result.failures[0].error_message.as_deref(),
            Some("Please wait 24 hours between claims on network1")
        );
        assert_eq!(networks[0].calls(), 0);
        assert_eq!(networks[1].calls(), 1);
    }

    #[tokio::test]
    async fn test_per_network_gating_rejects_when_every_network_cools_down() {
        let networks = [FakeNetwork::new("network1"), FakeNetwork::new("network2")];
        let (orchestrator, _) = orchestrator(&networks, true);
        orchestrator.claim_at(request(), T0).await.unwrap();

        match orchestrator.claim_at(request(), T0 + HOUR_MS).await {
            Err(ClaimError::CooldownActive { networks, .. }) => {
                assert_eq!(networks, vec!["network1", "network2"]);
            }
            other => panic!("expected cooldown, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_networks_gating_blocks_whole_claim() {
        let networks = [FakeNetwork::new("network1"), FakeNetwork::new("network2")];
        let (orchestrator, _) = orchestrator_with(&networks, true, CooldownGating::AllNetworks);
        orchestrator.cooldowns().record_claim("network1", ADDRESS, T0);

        match orchestrator.claim_at(request(), T0 + HOUR_MS).await {
            Err(ClaimError::CooldownActive { networks, .. }) => {
                assert_eq!(networks, vec!["network1"]);
            }
            other => panic!("expected cooldown, got {:?}", other),
        }
        assert_eq!(networks[1].calls(), 0);
        // The slot reserved on network2 was given back.
        assert!(orchestrator.cooldowns().is_eligible("network2", ADDRESS, T0 + HOUR_MS));
    }

    #[tokio::test]
    async fn test_address_case_does_not_bypass_cooldown() {
        let network = FakeNetwork::new("network1");
        let (orchestrator, _) = orchestrator(&[network], true);
        orchestrator.claim_at(ClaimRequest::new(ADDRESS, "token"), T0).await.unwrap();

        let upper = ADDRESS.to_uppercase().replacen("0X", "0x", 1);
        let result = orchestrator.claim_at(ClaimRequest::new(upper, "token"), T0 + 1).await;
        assert!(matches!(result, Err(ClaimError::CooldownActive { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_claims_dispatch_once() {
        let network = FakeNetwork::with("network1", false, Duration::from_millis(50));
        let (orchestrator, _) = orchestrator(&[network.clone()], true);

        let (first, second) = tokio::join!(
            orchestrator.claim_at(request(), T0),
            orchestrator.claim_at(request(), T0),
        );

        let successes = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Ok(result) if result.overall_success))
            .count();
        let cooldowns = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(ClaimError::CooldownActive { .. })))
            .count();
        assert_eq!((successes, cooldowns), (1, 1));
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_claim_still_settles_cooldowns() {
        let networks = [
            FakeNetwork::with("network1", false, Duration::from_millis(100)),
            FakeNetwork::with("network2", true, Duration::from_millis(100)),
        ];
        let (orchestrator, _) = orchestrator(&networks, true);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), orchestrator.claim_at(request(), T0)).await;
        assert!(cancelled.is_err());

        // Both submissions keep running after the claim is dropped.
        tokio::time::sleep(Duration::from_millis(250)).await;
        let tracker = orchestrator.cooldowns();
        assert!(!tracker.is_eligible("network1", ADDRESS, T0 + 1));
        assert!(tracker.is_eligible("network2", ADDRESS, T0 + 1));

        match orchestrator.claim_at(request(), T0 + 1).await {
            Ok(result) => {
                assert_eq!(result.failures[0].network, "network1");
                assert_eq!(result.failures[1].network, "network2");
            }
            other => panic!("expected a result, got {:?}", other),
        }
        assert_eq!(networks[0].calls(), 1);
        assert_eq!(networks[1].calls(), 2);
    }
}
