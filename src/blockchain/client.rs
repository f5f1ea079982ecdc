//! Blockchain RPC client with timeout, failover and error handling.
//!
//! # Responsibilities
//! - Connect to a network's JSON-RPC endpoint and its failovers
//! - Query chain state (chain id, nonce, gas price, balance)
//! - Broadcast signed raw transactions
//! - Provide health check for blockchain connectivity

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::TransportResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, NetworkConfig};

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    /// Network configuration.
    config: NetworkConfig,
    /// Per-call timeout.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only on an unparseable primary URL. An unreachable RPC or a
    /// chain id mismatch is logged and the client is still returned, so a
    /// network that is down at startup can recover without a restart.
    pub async fn new(config: NetworkConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider);
            } else {
                tracing::warn!(network = %config.name, url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config,
            timeout_duration,
        };

        if let Some(expected) = client.config.chain_id {
            match client.verify_chain_id(expected).await {
                Ok(()) => tracing::info!(
                    network = %client.config.name,
                    rpc_url = %client.config.rpc_url,
                    chain_id = expected,
                    "Blockchain client initialized"
                ),
                Err(e) => tracing::warn!(
                    network = %client.config.name,
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                ),
            }
        } else {
            tracing::info!(
                network = %client.config.name,
                rpc_url = %client.config.rpc_url,
                "Blockchain client initialized, chain id resolved on first use"
            );
        }

        Ok(client)
    }

    /// Run one RPC call against each provider in turn until one answers.
    async fn with_failover<T, F, Fut>(&self, operation: &str, call: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::from("no providers configured");

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(network = %self.config.name, provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(network = %self.config.name, provider_idx = i, operation, "RPC timeout, trying next provider");
                    last_error = format!("timed out after {}s", self.timeout_duration.as_secs());
                }
            }
        }

        Err(BlockchainError::Rpc(format!(
            "All RPC providers failed to {}: {}",
            operation, last_error
        )))
    }

    /// Verify the connected chain ID matches `expected`.
    pub async fn verify_chain_id(&self, expected: u64) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != expected {
            return Err(BlockchainError::ChainMismatch {
                expected,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get the balance of an address.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("get balance", |p| async move { p.get_balance(address).await })
            .await
    }

    /// Get the next nonce for an address, counting transactions still in the
    /// mempool.
    pub async fn get_pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("get transaction count", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Broadcast an EIP-2718 encoded signed transaction.
    ///
    /// Resending the same signed bytes to a failover is harmless: it carries
    /// the same hash and nonce.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        self.with_failover("send transaction", |p| async move {
            p.send_raw_transaction(raw).await.map(|pending| *pending.tx_hash())
        })
        .await
        .map_err(|e| match e {
            BlockchainError::Rpc(msg) => BlockchainError::Broadcast(msg),
            other => other,
        })
    }

    /// Check if the blockchain is reachable.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("network", &self.config.name)
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
