//! Transfer building and signing.
//!
//! # Responsibilities
//! - Apply the gas price policy (multiplier, ceiling)
//! - Build plain value transfers with a fixed gas limit
//! - Sign locally so the same bytes can be broadcast to any failover

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;

/// Gas used by a plain value transfer to an externally owned account.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// A signed transfer ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    /// Hash computed locally from the signed envelope.
    pub hash: TxHash,
    /// Nonce the transfer was signed with.
    pub nonce: u64,
    /// EIP-2718 encoded bytes for `eth_sendRawTransaction`.
    pub raw: Vec<u8>,
}

/// Builds and signs faucet transfers for one network.
#[derive(Debug, Clone)]
pub struct TransferBuilder {
    wallet: Wallet,
    gas_price_multiplier: f64,
    max_gas_price_gwei: u64,
}

impl TransferBuilder {
    pub fn new(wallet: Wallet, gas_price_multiplier: f64, max_gas_price_gwei: u64) -> Self {
        Self {
            wallet,
            gas_price_multiplier,
            max_gas_price_gwei,
        }
    }

    /// Turn the node's gas price into the price we sign with. The ceiling
    /// applies to the multiplied price.
    pub fn gas_price(&self, node_gas_price: u128) -> BlockchainResult<u128> {
        let gas_price = (node_gas_price as f64 * self.gas_price_multiplier) as u128;
        if gas_price > self.max_gas_price_gwei as u128 * WEI_PER_GWEI {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: (gas_price / WEI_PER_GWEI) as u64,
                max_gwei: self.max_gas_price_gwei,
            });
        }

        Ok(gas_price)
    }

    /// Build and sign a legacy (EIP-155) value transfer.
    pub async fn sign(
        &self,
        to: Address,
        value: U256,
        nonce: u64,
        gas_price: u128,
        chain_id: u64,
    ) -> BlockchainResult<SignedTransfer> {
        let tx = TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_to(to)
            .with_value(value)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_gas_limit(TRANSFER_GAS_LIMIT)
            .with_chain_id(chain_id);

        let envelope = tx
            .build(&self.wallet.network_wallet())
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        Ok(SignedTransfer {
            hash: *envelope.tx_hash(),
            nonce,
            raw: envelope.encoded_2718(),
        })
    }

    /// Address funds are sent from.
    pub fn sender(&self) -> Address {
        self.wallet.address()
    }
}
