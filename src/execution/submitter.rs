//! Local signing, nonce sequencing and receipt polling

use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::{
    config::ExecutionSettings,
    errors::{BotError, BotResult},
    network::{ChainClient, ReceiptSummary},
};

const WEI_PER_GWEI: Decimal = dec!(1_000_000_000);

pub fn gwei_to_wei(gwei: Decimal) -> u128 {
    (gwei * WEI_PER_GWEI).floor().to_u128().unwrap_or(0)
}

/// Hands out nonces for one signer. Holding the guard serializes
/// read-sign-submit so two legs never race for the same nonce.
pub struct NonceManager {
    last_used: Mutex<Option<u64>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self {
            last_used: Mutex::new(None),
        }
    }

    /// Next nonce given a freshly read pending count.
    pub fn next(pending: u64, last_used: Option<u64>) -> u64 {
        match last_used {
            Some(used) => pending.max(used + 1),
            None => pending,
        }
    }
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TxSubmitter {
    chain: Arc<dyn ChainClient>,
    wallet: EthereumWallet,
    account: Address,
    chain_id: u64,
    nonces: NonceManager,
    gas_price_multiplier: Decimal,
    priority_fee_wei: u128,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl TxSubmitter {
    pub fn new(chain: Arc<dyn ChainClient>, signer: PrivateKeySigner, chain_id: u64, settings: &ExecutionSettings) -> Self {
        let account = signer.address();
        Self {
            chain,
            wallet: EthereumWallet::from(signer),
            account,
            chain_id,
            nonces: NonceManager::new(),
            gas_price_multiplier: settings.gas_price_multiplier.max(Decimal::ONE),
            priority_fee_wei: gwei_to_wei(settings.priority_fee_gwei),
            confirmation_timeout: settings.confirmation_timeout(),
            poll_interval: settings.receipt_poll_interval(),
        }
    }

    pub fn from_private_key(
        chain: Arc<dyn ChainClient>,
        private_key: &str,
        chain_id: u64,
        settings: &ExecutionSettings,
    ) -> BotResult<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| BotError::Signing(format!("failed to parse private key: {}", e)))?;
        Ok(Self::new(chain, signer, chain_id, settings))
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Sign an EIP-1559 call to `to` and broadcast it.
    pub async fn submit(&self, to: Address, calldata: Bytes, gas_limit: u64) -> BotResult<TxHash> {
        let mut last_used = self.nonces.last_used.lock().await;

        let pending = self.chain.pending_nonce(self.account).await?;
        let nonce = NonceManager::next(pending, *last_used);
        let gas_price = self.chain.gas_price().await?;
        let base_fee = Decimal::from_u128(gas_price).unwrap_or(Decimal::ZERO) * self.gas_price_multiplier;
        let max_fee = base_fee.ceil().to_u128().unwrap_or(gas_price).saturating_add(self.priority_fee_wei);

        let tx = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(calldata)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(gas_limit)
            .with_max_fee_per_gas(max_fee)
            .with_max_priority_fee_per_gas(self.priority_fee_wei);
        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| BotError::Signing(e.to_string()))?;
        let raw = envelope.encoded_2718();

        let hash = self.chain.send_raw_transaction(raw.into()).await?;
        *last_used = Some(nonce);
        info!(tx = %hash, nonce, to = %to, "Transaction submitted");
        Ok(hash)
    }

    /// Poll until mined or the confirmation timeout elapses.
    pub async fn wait_for_receipt(&self, hash: TxHash) -> BotResult<ReceiptSummary> {
        let chain = Arc::clone(&self.chain);
        let poll_interval = self.poll_interval;
        let polling = async move {
            loop {
                match chain.transaction_receipt(hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => debug!("{} not mined yet", hash),
                    Err(e) if e.is_transient() => warn!("Receipt poll for {} failed: {}", hash, e),
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(self.confirmation_timeout, polling).await {
            Ok(result) => result,
            Err(_) => Err(BotError::Timeout {
                operation: format!("confirmation of {}", hash),
                after: self.confirmation_timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_never_goes_backwards() {
        assert_eq!(NonceManager::next(7, None), 7);
        // node has not seen our last submission yet
        assert_eq!(NonceManager::next(7, Some(7)), 8);
        assert_eq!(NonceManager::next(9, Some(7)), 9);
    }

    #[test]
    fn converts_gwei() {
        assert_eq!(gwei_to_wei(dec!(0.01)), 10_000_000);
        assert_eq!(gwei_to_wei(dec!(50)), 50_000_000_000);
    }
}
