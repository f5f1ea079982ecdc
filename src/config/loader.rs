//! Configuration loading from disk and the command line.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::FaucetConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("--rpc-url needs exactly one configured network, found {0}")]
    AmbiguousRpcOverride(usize),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values from the command line or environment that win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Listen on `0.0.0.0:<port>`.
    pub port: Option<u16>,
    /// RPC URL of the single configured network.
    pub rpc_url: Option<String>,
}

/// Resolve the effective configuration: file (or defaults), then overrides,
/// then validation.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<FaucetConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => FaucetConfig::default(),
    };

    if let Some(port) = overrides.port {
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }

    if let Some(rpc_url) = &overrides.rpc_url {
        match config.networks.as_mut_slice() {
            [network] => network.rpc_url = rpc_url.clone(),
            networks => return Err(ConfigError::AmbiguousRpcOverride(networks.len())),
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
