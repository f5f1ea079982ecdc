//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check network names are unique and URLs parse
//! - Validate value ranges (timeouts > 0, amount > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FaucetConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use thiserror::Error;

use crate::config::schema::FaucetConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("at least one network must be configured")]
    NoNetworks,

    #[error("network #{0} has an empty name")]
    EmptyNetworkName(usize),

    #[error("network name '{0}' is configured more than once")]
    DuplicateNetwork(String),

    #[error("network '{network}': invalid RPC URL '{url}'")]
    RpcUrl { network: String, url: String },

    #[error("network '{0}': rpc_timeout_secs must be greater than 0")]
    RpcTimeout(String),

    #[error("network '{0}': gas_price_multiplier must be at least 1.0")]
    GasMultiplier(String),

    #[error("network '{0}': private_key_env must name an environment variable")]
    PrivateKeyEnv(String),

    #[error("claims.amount_ether '{0}' is not a positive ether amount")]
    Amount(String),

    #[error("claims.cooldown_secs must be greater than 0")]
    Cooldown,

    #[error("captcha.verify_url '{0}' is not a valid URL")]
    VerifyUrl(String),

    #[error("captcha.timeout_secs must be greater than 0")]
    CaptchaTimeout,

    #[error("security.max_body_size must be greater than 0")]
    BodySize,

    #[error("security.request_timeout_secs must be greater than 0")]
    RequestTimeout,
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &FaucetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    validate_networks(config, &mut errors);

    match parse_ether(&config.claims.amount_ether) {
        Ok(amount) if amount > U256::ZERO => {}
        _ => errors.push(ValidationError::Amount(config.claims.amount_ether.clone())),
    }
    if config.claims.cooldown_secs == 0 {
        errors.push(ValidationError::Cooldown);
    }

    if !is_http_url(&config.captcha.verify_url) {
        errors.push(ValidationError::VerifyUrl(config.captcha.verify_url.clone()));
    }
    if config.captcha.timeout_secs == 0 {
        errors.push(ValidationError::CaptchaTimeout);
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::BodySize);
    }
    if config.security.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_networks(config: &FaucetConfig, errors: &mut Vec<ValidationError>) {
    if config.networks.is_empty() {
        errors.push(ValidationError::NoNetworks);
        return;
    }

    let mut seen = HashSet::new();
    for (idx, network) in config.networks.iter().enumerate() {
        if network.name.trim().is_empty() {
            errors.push(ValidationError::EmptyNetworkName(idx));
        } else if !seen.insert(network.name.as_str()) {
            errors.push(ValidationError::DuplicateNetwork(network.name.clone()));
        }

        for url in std::iter::once(&network.rpc_url).chain(network.failover_urls.iter()) {
            if !is_http_url(url) {
                errors.push(ValidationError::RpcUrl {
                    network: network.name.clone(),
                    url: url.clone(),
                });
            }
        }

        if network.rpc_timeout_secs == 0 {
            errors.push(ValidationError::RpcTimeout(network.name.clone()));
        }
        if !(network.gas_price_multiplier >= 1.0) {
            errors.push(ValidationError::GasMultiplier(network.name.clone()));
        }
        if network.private_key_env.trim().is_empty() {
            errors.push(ValidationError::PrivateKeyEnv(network.name.clone()));
        }
    }
}

fn is_http_url(raw: &str) -> bool {
    matches!(url::Url::parse(raw), Ok(u) if u.scheme() == "http" || u.scheme() == "https")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::NetworkConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&FaucetConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = FaucetConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.claims.amount_ether = "0".to_string();
        config.claims.cooldown_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Cooldown));
        assert!(errors.contains(&ValidationError::Amount("0".to_string())));
    }

    #[test]
    fn test_rejects_duplicate_network_and_bad_url() {
        let mut config = FaucetConfig::default();
        config.networks.push(NetworkConfig {
            rpc_url: "ws://localhost:8546".to_string(),
            ..NetworkConfig::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateNetwork("network1".to_string())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RpcUrl { .. })));
    }

    #[test]
    fn test_rejects_empty_network_list() {
        let config = FaucetConfig {
            networks: Vec::new(),
            ..FaucetConfig::default()
        };
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoNetworks]));
    }

    #[test]
    fn test_rejects_unparseable_amount() {
        let mut config = FaucetConfig::default();
        config.claims.amount_ether = "lots".to_string();
        assert!(validate_config(&config).is_err());
    }
}
