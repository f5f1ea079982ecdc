//! Network endpoints: where a claim's transfers are actually submitted.
//!
//! [`NetworkEndpoint`] is the seam the claim orchestrator fans out over.
//! [`EvmEndpoint`] implements it for EVM JSON-RPC networks.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::{Mutex, OnceCell};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::transaction::TransferBuilder;
use crate::blockchain::types::{BlockchainError, BlockchainResult, NetworkConfig, NetworkOutcome};
use crate::blockchain::wallet::Wallet;
use crate::observability::metrics;

/// One network the faucet can send funds on.
#[async_trait]
pub trait NetworkEndpoint: Send + Sync {
    /// Unique network name.
    fn name(&self) -> &str;

    /// Send `amount` to `recipient` from the custodial identity.
    ///
    /// Completes once the network accepts the submission. Never fails: every
    /// error is reported inside the returned outcome.
    async fn submit_transfer(&self, recipient: &str, amount: U256) -> NetworkOutcome;

    /// Whether the network currently answers.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// EVM network reached over JSON-RPC.
pub struct EvmEndpoint {
    client: BlockchainClient,
    builder: TransferBuilder,
    chain_id: OnceCell<u64>,
    /// Next nonce to use. `None` means re-read it from the chain.
    next_nonce: Mutex<Option<u64>>,
}

impl EvmEndpoint {
    /// Connect to a network and log the custodial balance.
    pub async fn connect(config: NetworkConfig, wallet: Wallet) -> BlockchainResult<Self> {
        let builder = TransferBuilder::new(
            wallet,
            config.gas_price_multiplier,
            config.max_gas_price_gwei,
        );
        let client = BlockchainClient::new(config).await?;
        let endpoint = Self::with_client(client, builder);

        match endpoint.client.get_balance(endpoint.faucet_address()).await {
            Ok(balance) => tracing::info!(
                network = %endpoint.name(),
                faucet_address = %endpoint.faucet_address(),
                balance_wei = %balance,
                "Network endpoint ready"
            ),
            Err(e) => tracing::warn!(
                network = %endpoint.name(),
                faucet_address = %endpoint.faucet_address(),
                error = %e,
                "Network endpoint created but faucet balance is unavailable"
            ),
        }

        Ok(endpoint)
    }

    fn with_client(client: BlockchainClient, builder: TransferBuilder) -> Self {
        Self {
            client,
            builder,
            chain_id: OnceCell::new(),
            next_nonce: Mutex::new(None),
        }
    }

    /// Address the faucet sends from on this network.
    pub fn faucet_address(&self) -> Address {
        self.builder.sender()
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                match self.client.config().chain_id {
                    Some(id) => Ok(id),
                    None => self.client.get_chain_id().await.map(u64::from),
                }
            })
            .await
            .copied()
    }

    async fn transfer(&self, recipient: &str, amount: U256) -> BlockchainResult<TxHash> {
        let to: Address = recipient
            .trim()
            .parse()
            .map_err(|_| BlockchainError::InvalidRecipient(recipient.to_string()))?;

        let chain_id = self.chain_id().await?;
        let gas_price = self.builder.gas_price(self.client.get_gas_price().await?)?;

        // Held until the broadcast settles so concurrent claims on this
        // network get consecutive nonces.
        let mut next_nonce = self.next_nonce.lock().await;
        let nonce = match *next_nonce {
            Some(nonce) => nonce,
            None => self.client.get_pending_nonce(self.faucet_address()).await?,
        };

        let signed = self.builder.sign(to, amount, nonce, gas_price, chain_id).await?;

        // Unset while the broadcast is in flight. A transfer dropped here
        // leaves it unset, so the next one re-reads the pending nonce.
        *next_nonce = None;
        let hash = self.client.send_raw_transaction(&signed.raw).await?;
        *next_nonce = Some(nonce + 1);

        if hash != signed.hash {
            tracing::warn!(
                network = %self.name(),
                local_hash = %signed.hash,
                rpc_hash = %hash,
                "RPC reported a different transaction hash"
            );
        }
        Ok(hash)
    }
}

#[async_trait]
impl NetworkEndpoint for EvmEndpoint {
    fn name(&self) -> &str {
        &self.client.config().name
    }

    async fn submit_transfer(&self, recipient: &str, amount: U256) -> NetworkOutcome {
        let started = Instant::now();
        let result = self.transfer(recipient, amount).await;
        metrics::record_submission(self.name(), result.is_ok(), started);

        match result {
            Ok(hash) => {
                tracing::info!(network = %self.name(), recipient, tx_hash = %hash, "Transfer submitted");
                NetworkOutcome::succeeded(self.name(), format!("{:#x}", hash))
            }
            Err(e) => {
                tracing::warn!(network = %self.name(), recipient, error = %e, "Transfer failed");
                NetworkOutcome::failed(self.name(), e.to_string())
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        self.client.is_healthy().await
    }
}

impl std::fmt::Debug for EvmEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmEndpoint")
            .field("client", &self.client)
            .field("faucet_address", &self.faucet_address())
            .finish()
    }
}
