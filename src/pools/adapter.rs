//! The closed set of exchange families behind one pricing and swap interface

use alloy::primitives::{Address, Bytes, U256};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use crate::{
    config::{ExchangeConfig, ExchangeKind},
    errors::BotResult,
    network::ChainClient,
    pools::{
        ConcentratedLiquidityAdapter, ConstantProductAdapter, StableMetadataAdapter,
        impact::{assess, probes_for},
    },
    types::{PriceImpact, QuoteResult, TradingPair},
};

/// A resolved pool and which side of it holds the pair's base token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolHandle {
    pub address: Address,
    pub base_is_token0: bool,
}

/// Exact-input swap of `amount_in` of `token_in` for the pair's other token.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub token_in: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    /// Unix seconds.
    pub deadline: U256,
}

/// Router calldata ready to be signed.
#[derive(Debug, Clone)]
pub struct SwapCall {
    pub router: Address,
    pub calldata: Bytes,
}

/// Depth in quote units: the smaller side of the pool valued at `price`.
pub fn depth_in_quote(reserve_base: Decimal, reserve_quote: Decimal, price: Decimal) -> Decimal {
    (reserve_base * price).min(reserve_quote)
}

pub enum ExchangeAdapter {
    ConstantProduct(ConstantProductAdapter),
    ConcentratedLiquidity(ConcentratedLiquidityAdapter),
    StableMetadata(StableMetadataAdapter),
}

impl ExchangeAdapter {
    pub fn from_config(config: &ExchangeConfig, chain: Arc<dyn ChainClient>) -> Self {
        let id = config.id.clone();
        match &config.kind {
            ExchangeKind::ConstantProduct { factory, router, fee_bps } => {
                Self::ConstantProduct(ConstantProductAdapter::new(id, chain, *factory, *router, *fee_bps))
            }
            ExchangeKind::ConcentratedLiquidity {
                quoter,
                router,
                fee_tier,
                probe_base_units,
            } => Self::ConcentratedLiquidity(ConcentratedLiquidityAdapter::new(
                id,
                chain,
                *quoter,
                *router,
                *fee_tier,
                *probe_base_units,
            )),
            ExchangeKind::StableMetadata { factory, router, stable } => {
                Self::StableMetadata(StableMetadataAdapter::new(id, chain, *factory, *router, *stable))
            }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::ConstantProduct(a) => a.id(),
            Self::ConcentratedLiquidity(a) => a.id(),
            Self::StableMetadata(a) => a.id(),
        }
    }

    pub fn router(&self) -> Address {
        match self {
            Self::ConstantProduct(a) => a.router(),
            Self::ConcentratedLiquidity(a) => a.router(),
            Self::StableMetadata(a) => a.router(),
        }
    }

    /// Current price and depth. Failures are reported inside the result.
    pub async fn get_price(&self, pair: &TradingPair) -> QuoteResult {
        let outcome = match self {
            Self::ConstantProduct(a) => a.price_and_liquidity(pair).await,
            Self::ConcentratedLiquidity(a) => a.price_and_liquidity(pair).await,
            Self::StableMetadata(a) => a.price_and_liquidity(pair).await,
        };

        match outcome {
            Ok((price, liquidity)) if price > Decimal::ZERO && liquidity > Decimal::ZERO => {
                debug!("{} {} price {} liquidity {}", self.id(), pair, price, liquidity);
                QuoteResult::ok(self.id(), pair, price, liquidity)
            }
            Ok((price, liquidity)) => QuoteResult::failed(
                self.id(),
                pair,
                format!("implausible quote: price {} liquidity {}", price, liquidity),
            ),
            Err(e) => {
                debug!("{} {} quote failed: {}", self.id(), pair, e);
                QuoteResult::failed(self.id(), pair, e)
            }
        }
    }

    /// Exact-input output amount for `amount_in` of `token_in`, in base units.
    pub async fn quote_exact_in(&self, pair: &TradingPair, token_in: Address, amount_in: U256) -> BotResult<U256> {
        match self {
            Self::ConstantProduct(a) => a.quote_exact_in(pair, token_in, amount_in).await,
            Self::ConcentratedLiquidity(a) => a.quote_exact_in(pair, token_in, amount_in).await,
            Self::StableMetadata(a) => a.quote_exact_in(pair, token_in, amount_in).await,
        }
    }

    /// Probe the venue at fractions of `trade_size` (base units) and compare
    /// the worst rate against `max_impact_pct`.
    pub async fn check_liquidity(
        &self,
        pair: &TradingPair,
        trade_size: Decimal,
        max_impact_pct: Decimal,
    ) -> BotResult<PriceImpact> {
        let probes = probes_for(trade_size, pair.base().decimals)?;
        let amounts: Vec<U256> = probes.iter().map(|p| p.amount_in).collect();
        let base = pair.base().address;

        let outputs = match self {
            Self::ConstantProduct(a) => a.quote_probes(pair, &amounts).await?,
            _ => join_all(amounts.iter().map(|amount| self.quote_exact_in(pair, base, *amount)))
                .await
                .into_iter()
                .collect::<BotResult<Vec<_>>>()?,
        };

        let scaled = !matches!(self, Self::StableMetadata(a) if a.is_stable());
        let impact = assess(self.id(), pair, trade_size, &probes, &outputs, scaled, max_impact_pct)?;
        debug!(
            exchange = self.id(),
            pair = %pair,
            max_impact_pct = %impact.max_impact_pct,
            sufficient = impact.sufficient_liquidity,
            "price impact measured"
        );
        Ok(impact)
    }

    pub fn encode_swap(&self, pair: &TradingPair, request: &SwapRequest) -> BotResult<SwapCall> {
        let calldata = match self {
            Self::ConstantProduct(a) => a.encode_swap(pair, request)?,
            Self::ConcentratedLiquidity(a) => a.encode_swap(pair, request)?,
            Self::StableMetadata(a) => a.encode_swap(pair, request)?,
        };
        Ok(SwapCall {
            router: self.router(),
            calldata,
        })
    }
}

/// Every configured exchange, keyed by id, sharing one chain client.
pub fn build_adapters(exchanges: &[ExchangeConfig], chain: Arc<dyn ChainClient>) -> HashMap<String, Arc<ExchangeAdapter>> {
    exchanges
        .iter()
        .map(|config| {
            (
                config.id.clone(),
                Arc::new(ExchangeAdapter::from_config(config, Arc::clone(&chain))),
            )
        })
        .collect()
}
