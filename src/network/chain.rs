//! The chain surface the engine depends on
//!
//! Adapters, the detector and the executor only ever talk to the node
//! through [`ChainClient`]. The connection manager implements it by routing
//! every request through its retry/failover `call`.

use alloy::{
    primitives::{Address, Bytes, TxHash, U256, keccak256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;
use crate::{
    errors::{BotError, BotResult},
    network::{
        classify_transport_error,
        contracts::IERC20,
        providers::{ConcreteProvider, RpcConnectionManager},
    },
};

/// What the engine needs from a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub status: bool,
    pub gas_used: u128,
    pub effective_gas_price: u128,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Read-only contract call against the latest block.
    async fn eth_call(&self, to: Address, data: Bytes) -> BotResult<Bytes>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> BotResult<u128>;

    /// Next nonce for `account`, counting pending transactions.
    async fn pending_nonce(&self, account: Address) -> BotResult<u64>;

    async fn chain_id(&self) -> BotResult<u64>;

    async fn block_number(&self) -> BotResult<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> BotResult<TxHash>;

    /// `None` while the transaction is not mined yet.
    async fn transaction_receipt(&self, hash: TxHash) -> BotResult<Option<ReceiptSummary>>;
}

/// Encode `call`, run it against `to` and decode the typed return.
pub async fn call_contract<C: SolCall>(chain: &dyn ChainClient, to: Address, call: &C) -> BotResult<C::Return> {
    let output = chain.eth_call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&output, true)
        .map_err(|e| BotError::contract(to, format!("cannot decode {} output", C::SIGNATURE), e))
}

pub async fn erc20_balance(chain: &dyn ChainClient, token: Address, account: Address) -> BotResult<U256> {
    let result = call_contract(chain, token, &IERC20::balanceOfCall { account }).await?;
    Ok(result.balance)
}

pub async fn erc20_allowance(
    chain: &dyn ChainClient,
    token: Address,
    owner: Address,
    spender: Address,
) -> BotResult<U256> {
    let result = call_contract(chain, token, &IERC20::allowanceCall { owner, spender }).await?;
    Ok(result.remaining)
}

#[async_trait]
impl ChainClient for RpcConnectionManager<ConcreteProvider> {
    async fn eth_call(&self, to: Address, data: Bytes) -> BotResult<Bytes> {
        self.call(
            |provider| {
                let tx = TransactionRequest::default().to(to).input(data.clone().into());
                async move {
                    provider.call(&tx).await.map_err(|e| {
                        let error = classify_transport_error(e, "eth_call");
                        if error.is_transient() {
                            error
                        } else {
                            BotError::contract(to, "eth_call failed", error)
                        }
                    })
                }
            },
            self.policy(),
        )
        .await
    }

    async fn gas_price(&self) -> BotResult<u128> {
        self.call(
            |provider| async move {
                provider
                    .get_gas_price()
                    .await
                    .map_err(|e| classify_transport_error(e, "eth_gasPrice"))
            },
            self.policy(),
        )
        .await
    }

    async fn pending_nonce(&self, account: Address) -> BotResult<u64> {
        self.call(
            |provider| async move {
                provider
                    .get_transaction_count(account)
                    .pending()
                    .await
                    .map_err(|e| classify_transport_error(e, "eth_getTransactionCount"))
            },
            self.policy(),
        )
        .await
    }

    async fn chain_id(&self) -> BotResult<u64> {
        self.call(
            |provider| async move {
                provider
                    .get_chain_id()
                    .await
                    .map_err(|e| classify_transport_error(e, "eth_chainId"))
            },
            self.policy(),
        )
        .await
    }

    async fn block_number(&self) -> BotResult<u64> {
        self.call(
            |provider| async move {
                provider
                    .get_block_number()
                    .await
                    .map_err(|e| classify_transport_error(e, "eth_blockNumber"))
            },
            self.policy(),
        )
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BotResult<TxHash> {
        let local_hash = keccak256(&raw);
        self.call(
            |provider| {
                let raw = raw.clone();
                async move {
                    match provider.send_raw_transaction(&raw).await {
                        Ok(pending) => Ok(*pending.tx_hash()),
                        Err(e) => {
                            let error = classify_transport_error(e, "eth_sendRawTransaction");
                            // a retry after a lost response finds our own tx in the pool
                            if !error.is_transient() && error.to_string().contains("already known") {
                                Ok(local_hash)
                            } else {
                                Err(error)
                            }
                        }
                    }
                }
            },
            self.policy(),
        )
        .await
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BotResult<Option<ReceiptSummary>> {
        self.call(
            |provider| async move {
                let receipt = provider
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(|e| classify_transport_error(e, "eth_getTransactionReceipt"))?;
                Ok(receipt.map(|receipt| ReceiptSummary {
                    status: receipt.status(),
                    gas_used: u128::from(receipt.gas_used),
                    effective_gas_price: receipt.effective_gas_price,
                    block_number: receipt.block_number,
                }))
            },
            self.policy(),
        )
        .await
    }
}
