//! Aerodrome/Velodrome pools that report their own `metadata()`

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use crate::{
    errors::{BotError, BotResult},
    network::{
        ChainClient, call_contract,
        contracts::{IAerodromeFactory, IAerodromePool, IAerodromeRouter},
    },
    pools::{PoolHandle, SwapRequest, depth_in_quote},
    types::TradingPair,
    utils::from_base_units,
};

pub struct StableMetadataAdapter {
    id: String,
    chain: Arc<dyn ChainClient>,
    factory: Address,
    router: Address,
    stable: bool,
    pools: RwLock<HashMap<TradingPair, PoolHandle>>,
}

/// Pool state oriented to the pair, in base units.
struct PoolState {
    reserve_base: U256,
    reserve_quote: U256,
    stable: bool,
}

/// Marginal price of base in quote on the `x³y + y³x = k` curve, both
/// reserves already normalized by their decimals.
///
/// Depends only on `r = x / y`: `(3r² + 1) / (r³ + 3r)`.
pub fn stable_marginal_price(x: Decimal, y: Decimal) -> Option<Decimal> {
    if x.is_zero() || y.is_zero() {
        return None;
    }
    let r = x.checked_div(y)?;
    let r2 = r.checked_mul(r)?;
    let numerator = dec!(3).checked_mul(r2)?.checked_add(Decimal::ONE)?;
    let denominator = r2.checked_mul(r)?.checked_add(dec!(3).checked_mul(r)?)?;
    numerator.checked_div(denominator)
}

impl StableMetadataAdapter {
    pub fn new(id: impl Into<String>, chain: Arc<dyn ChainClient>, factory: Address, router: Address, stable: bool) -> Self {
        Self {
            id: id.into(),
            chain,
            factory,
            router,
            stable,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Whether amounts on this venue are compared without decimal scaling.
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    async fn pool_address(&self, pair: &TradingPair) -> BotResult<(Address, Option<bool>)> {
        if let Some(handle) = self.pools.read().await.get(pair) {
            return Ok((handle.address, Some(handle.base_is_token0)));
        }
        let address = call_contract(
            self.chain.as_ref(),
            self.factory,
            &IAerodromeFactory::getPoolCall {
                tokenA: pair.base().address,
                tokenB: pair.quote().address,
                stable: self.stable,
            },
        )
        .await?
        .pool;
        if address == Address::ZERO {
            return Err(BotError::InsufficientLiquidity {
                pool: format!("{} {}", self.id, pair),
                details: "no pool deployed".to_string(),
            });
        }
        Ok((address, None))
    }

    async fn state(&self, pair: &TradingPair) -> BotResult<PoolState> {
        let (address, cached_orientation) = self.pool_address(pair).await?;
        let meta = call_contract(self.chain.as_ref(), address, &IAerodromePool::metadataCall {}).await?;

        let base_is_token0 = match cached_orientation {
            Some(orientation) => orientation,
            None => {
                let base = pair.base().address;
                if meta.t0 != base && meta.t1 != base {
                    return Err(BotError::contract(
                        address,
                        format!("pool does not hold {}", pair.base().symbol),
                        anyhow::anyhow!("tokens {} / {}", meta.t0, meta.t1),
                    ));
                }
                let handle = PoolHandle {
                    address,
                    base_is_token0: meta.t0 == base,
                };
                debug!("{} resolved {} pool at {}", self.id, pair, address);
                self.pools.write().await.insert(pair.clone(), handle);
                handle.base_is_token0
            }
        };

        let (reserve_base, reserve_quote) = if base_is_token0 { (meta.r0, meta.r1) } else { (meta.r1, meta.r0) };
        Ok(PoolState {
            reserve_base,
            reserve_quote,
            stable: meta.st,
        })
    }

    pub async fn price_and_liquidity(&self, pair: &TradingPair) -> BotResult<(Decimal, Decimal)> {
        let state = self.state(pair).await?;
        if state.reserve_base.is_zero() || state.reserve_quote.is_zero() {
            return Err(BotError::InsufficientLiquidity {
                pool: format!("{} {}", self.id, pair),
                details: "pool has zero reserves".to_string(),
            });
        }
        let base = from_base_units(state.reserve_base, pair.base().decimals)?;
        let quote = from_base_units(state.reserve_quote, pair.quote().decimals)?;

        let price = if state.stable {
            stable_marginal_price(base, quote).ok_or_else(|| BotError::PriceValidation {
                exchange: self.id.clone(),
                price: Decimal::ZERO,
                reason: format!("stable curve overflow for reserves {} / {}", base, quote),
            })?
        } else {
            quote / base
        };
        Ok((price, depth_in_quote(base, quote, price)))
    }

    pub async fn quote_exact_in(&self, pair: &TradingPair, token_in: Address, amount_in: U256) -> BotResult<U256> {
        pair.counterpart(token_in)?;
        let (address, _) = self.pool_address(pair).await?;
        let result = call_contract(
            self.chain.as_ref(),
            address,
            &IAerodromePool::getAmountOutCall {
                amountIn: amount_in,
                tokenIn: token_in,
            },
        )
        .await?;
        Ok(result.amountOut)
    }

    pub fn encode_swap(&self, pair: &TradingPair, request: &SwapRequest) -> BotResult<Bytes> {
        let token_out = pair.counterpart(request.token_in)?.address;
        let call = IAerodromeRouter::swapExactTokensForTokensCall {
            amountIn: request.amount_in,
            amountOutMin: request.min_amount_out,
            routes: vec![IAerodromeRouter::Route {
                from: request.token_in,
                to: token_out,
                stable: self.stable,
                factory: self.factory,
            }],
            to: request.recipient,
            deadline: request.deadline,
        };
        Ok(call.abi_encode().into())
    }
}
