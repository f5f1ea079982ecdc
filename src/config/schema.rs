//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the faucet.
//! All types derive Serde traits for deserialization from config files.
//! Secrets never live here: the schema only names the environment variables
//! that hold them.

use serde::{Deserialize, Serialize};

/// Environment variable holding the custodial key shared by all networks
/// unless a network names its own.
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "FAUCET_PRIVATE_KEY";

/// Environment variable holding the captcha provider secret.
pub const DEFAULT_CAPTCHA_SECRET_ENV: &str = "HCAPTCHA_SECRET_KEY";

/// hCaptcha's public test secret. Accepts the provider's test tokens only.
pub const TEST_CAPTCHA_SECRET: &str = "0x0000000000000000000000000000000000000000";

/// Root configuration for the faucet.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Claim policy: amount, cooldown, gating.
    pub claims: ClaimConfig,

    /// Human verification service settings.
    pub captcha: CaptchaConfig,

    /// Networks funds are dispensed on, in response order.
    pub networks: Vec<NetworkConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening.
    pub security: SecurityConfig,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            claims: ClaimConfig::default(),
            captcha: CaptchaConfig::default(),
            networks: vec![NetworkConfig::default()],
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

/// How cooldowns on several networks combine within one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CooldownGating {
    /// Each network gates only its own dispatch.
    #[default]
    PerNetwork,
    /// Any cooling-down network rejects the whole claim.
    AllNetworks,
}

/// Claim policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Amount sent per claim, in ether (decimal string, e.g. "0.1").
    pub amount_ether: String,

    /// Symbol used in response messages.
    pub currency_symbol: String,

    /// Minimum time between successful claims per address and network.
    pub cooldown_secs: u64,

    /// Cooldown gating policy across networks.
    pub gating: CooldownGating,

    /// How often expired cooldown entries are evicted. 0 disables pruning.
    pub prune_interval_secs: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            amount_ether: "0.1".to_string(),
            currency_symbol: "ETH".to_string(),
            cooldown_secs: 24 * 60 * 60,
            gating: CooldownGating::PerNetwork,
            prune_interval_secs: 3600,
        }
    }
}

/// Human verification (hCaptcha-compatible) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// Site verification endpoint.
    pub verify_url: String,

    /// Environment variable holding the shared secret.
    pub secret_env: String,

    /// Verification request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            verify_url: "https://hcaptcha.com/siteverify".to_string(),
            secret_env: DEFAULT_CAPTCHA_SECRET_ENV.to_string(),
            timeout_secs: 10,
        }
    }
}

/// One network the faucet dispenses on.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Unique network name, reported back to clients as `chain`.
    pub name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID. Resolved from the RPC on first use when absent.
    pub chain_id: Option<u64>,

    /// Environment variable holding this network's custodial private key.
    pub private_key_env: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Gas price multiplier (1.0 = node estimate, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei, after the multiplier (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "network1".to_string(),
            rpc_url: "http://localhost:32002".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            private_key_env: DEFAULT_PRIVATE_KEY_ENV.to_string(),
            rpc_timeout_secs: 10,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Whole-request timeout in seconds. Covers verification and every
    /// network submission of a claim.
    pub request_timeout_secs: u64,

    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024,
            request_timeout_secs: 60,
            cors_allowed_origins: Vec::new(),
        }
    }
}
