//! Uniswap-V2 style reserve pools

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use crate::{
    errors::{BotError, BotResult},
    network::{
        ChainClient, call_contract,
        contracts::{IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router},
    },
    pools::{PoolHandle, SwapRequest, depth_in_quote},
    types::TradingPair,
    utils::from_base_units,
};

const FEE_DENOMINATOR: u64 = 10_000;

pub struct ConstantProductAdapter {
    id: String,
    chain: Arc<dyn ChainClient>,
    factory: Address,
    router: Address,
    fee_bps: u32,
    pools: RwLock<HashMap<TradingPair, PoolHandle>>,
}

impl ConstantProductAdapter {
    pub fn new(id: impl Into<String>, chain: Arc<dyn ChainClient>, factory: Address, router: Address, fee_bps: u32) -> Self {
        Self {
            id: id.into(),
            chain,
            factory,
            router,
            fee_bps,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// x·y=k output for one swap against a reserve snapshot, fee taken on input.
    pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> U256 {
        if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
            return U256::ZERO;
        }
        let with_fee = amount_in * U256::from(FEE_DENOMINATOR.saturating_sub(fee_bps as u64));
        let numerator = with_fee * reserve_out;
        let denominator = reserve_in * U256::from(FEE_DENOMINATOR) + with_fee;
        numerator / denominator
    }

    async fn pool(&self, pair: &TradingPair) -> BotResult<PoolHandle> {
        if let Some(handle) = self.pools.read().await.get(pair) {
            return Ok(*handle);
        }

        let address = call_contract(
            self.chain.as_ref(),
            self.factory,
            &IUniswapV2Factory::getPairCall {
                tokenA: pair.base().address,
                tokenB: pair.quote().address,
            },
        )
        .await?
        .pair;
        if address == Address::ZERO {
            return Err(BotError::InsufficientLiquidity {
                pool: format!("{} {}", self.id, pair),
                details: "no pool deployed".to_string(),
            });
        }
        let token0 = call_contract(self.chain.as_ref(), address, &IUniswapV2Pair::token0Call {})
            .await?
            .token;

        let handle = PoolHandle {
            address,
            base_is_token0: token0 == pair.base().address,
        };
        debug!("{} resolved {} pool at {}", self.id, pair, address);
        self.pools.write().await.insert(pair.clone(), handle);
        Ok(handle)
    }

    /// (base, quote) reserves in base units.
    async fn reserves(&self, pair: &TradingPair) -> BotResult<(U256, U256)> {
        let pool = self.pool(pair).await?;
        let reserves = call_contract(self.chain.as_ref(), pool.address, &IUniswapV2Pair::getReservesCall {}).await?;
        Ok(if pool.base_is_token0 {
            (reserves.reserve0, reserves.reserve1)
        } else {
            (reserves.reserve1, reserves.reserve0)
        })
    }

    pub async fn price_and_liquidity(&self, pair: &TradingPair) -> BotResult<(Decimal, Decimal)> {
        let (reserve_base, reserve_quote) = self.reserves(pair).await?;
        if reserve_base.is_zero() || reserve_quote.is_zero() {
            return Err(BotError::InsufficientLiquidity {
                pool: format!("{} {}", self.id, pair),
                details: "pool has zero reserves".to_string(),
            });
        }
        let base = from_base_units(reserve_base, pair.base().decimals)?;
        let quote = from_base_units(reserve_quote, pair.quote().decimals)?;
        let price = quote / base;
        Ok((price, depth_in_quote(base, quote, price)))
    }

    pub async fn quote_exact_in(&self, pair: &TradingPair, token_in: Address, amount_in: U256) -> BotResult<U256> {
        let (reserve_base, reserve_quote) = self.reserves(pair).await?;
        if token_in == pair.base().address {
            Ok(Self::amount_out(amount_in, reserve_base, reserve_quote, self.fee_bps))
        } else {
            pair.counterpart(token_in)?;
            Ok(Self::amount_out(amount_in, reserve_quote, reserve_base, self.fee_bps))
        }
    }

    /// Base → quote outputs for every probe size against a single snapshot.
    pub async fn quote_probes(&self, pair: &TradingPair, amounts_in: &[U256]) -> BotResult<Vec<U256>> {
        let (reserve_base, reserve_quote) = self.reserves(pair).await?;
        Ok(amounts_in
            .iter()
            .map(|amount| Self::amount_out(*amount, reserve_base, reserve_quote, self.fee_bps))
            .collect())
    }

    pub fn encode_swap(&self, pair: &TradingPair, request: &SwapRequest) -> BotResult<Bytes> {
        let token_out = pair.counterpart(request.token_in)?.address;
        let call = IUniswapV2Router::swapExactTokensForTokensCall {
            amountIn: request.amount_in,
            amountOutMin: request.min_amount_out,
            path: vec![request.token_in, token_out],
            to: request.recipient,
            deadline: request.deadline,
        };
        Ok(call.abi_encode().into())
    }
}
