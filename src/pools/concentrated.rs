//! Uniswap-V3 style pools priced through QuoterV2

use alloy::{
    primitives::{Address, Bytes, U256, aliases::U160},
    sol_types::SolCall,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use crate::{
    errors::{BotError, BotResult},
    network::{
        ChainClient, call_contract,
        contracts::{IQuoterV2, ISwapRouter02},
    },
    pools::SwapRequest,
    types::TradingPair,
    utils::{rate, to_base_units_floor},
};

/// Second probe size relative to the first.
const DEPTH_PROBE_RATIO: u64 = 10;
/// Depth reported when the two probes show no degradation, as a multiple of the larger probe.
const DEPTH_CAP_MULTIPLIER: Decimal = dec!(10_000);

pub struct ConcentratedLiquidityAdapter {
    id: String,
    chain: Arc<dyn ChainClient>,
    quoter: Address,
    router: Address,
    fee_tier: u32,
    probe_base_units: Decimal,
}

/// Constant-product-equivalent base reserve implied by two probes.
///
/// With `r(x) = Y / (X + x)` the two observations give
/// `X = (x2·r2 − x1·r1) / (r1 − r2)`. Returns `None` when the rate does not
/// degrade between the probes.
pub fn implied_base_depth(x1: Decimal, r1: Decimal, x2: Decimal, r2: Decimal) -> Option<Decimal> {
    if r1 <= r2 {
        return None;
    }
    let depth = (x2 * r2 - x1 * r1) / (r1 - r2);
    (depth > Decimal::ZERO).then_some(depth)
}

impl ConcentratedLiquidityAdapter {
    pub fn new(
        id: impl Into<String>,
        chain: Arc<dyn ChainClient>,
        quoter: Address,
        router: Address,
        fee_tier: u32,
        probe_base_units: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            chain,
            quoter,
            router,
            fee_tier,
            probe_base_units,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn router(&self) -> Address {
        self.router
    }

    async fn quote(&self, token_in: Address, token_out: Address, amount_in: U256) -> BotResult<U256> {
        let params = IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            amountIn: amount_in,
            fee: self
                .fee_tier
                .try_into()
                .map_err(|_| BotError::Config(format!("fee tier {} does not fit uint24", self.fee_tier)))?,
            sqrtPriceLimitX96: U160::ZERO,
        };
        let result = call_contract(self.chain.as_ref(), self.quoter, &IQuoterV2::quoteExactInputSingleCall { params }).await?;
        Ok(result.amountOut)
    }

    pub async fn price_and_liquidity(&self, pair: &TradingPair) -> BotResult<(Decimal, Decimal)> {
        let (base, quote) = (pair.base(), pair.quote());
        let x1 = to_base_units_floor(self.probe_base_units, base.decimals)?;
        let x2 = x1 * U256::from(DEPTH_PROBE_RATIO);

        let out1 = self.quote(base.address, quote.address, x1).await?;
        if out1.is_zero() {
            return Err(BotError::InsufficientLiquidity {
                pool: format!("{} {}", self.id, pair),
                details: "quoter returned nothing for the probe amount".to_string(),
            });
        }
        let out2 = self.quote(base.address, quote.address, x2).await?;

        let r1 = rate(x1, base.decimals, out1, quote.decimals)?;
        let r2 = rate(x2, base.decimals, out2, quote.decimals)?;
        let x1 = self.probe_base_units;
        let x2 = x1 * Decimal::from(DEPTH_PROBE_RATIO);

        let liquidity = match implied_base_depth(x1, r1, x2, r2) {
            Some(depth) => depth * r1,
            None => x2 * r1 * DEPTH_CAP_MULTIPLIER,
        };
        Ok((r1, liquidity))
    }

    pub async fn quote_exact_in(&self, pair: &TradingPair, token_in: Address, amount_in: U256) -> BotResult<U256> {
        let token_out = pair.counterpart(token_in)?.address;
        self.quote(token_in, token_out, amount_in).await
    }

    pub fn encode_swap(&self, pair: &TradingPair, request: &SwapRequest) -> BotResult<Bytes> {
        let token_out = pair.counterpart(request.token_in)?.address;
        let params = ISwapRouter02::ExactInputSingleParams {
            tokenIn: request.token_in,
            tokenOut: token_out,
            fee: self
                .fee_tier
                .try_into()
                .map_err(|_| BotError::Config(format!("fee tier {} does not fit uint24", self.fee_tier)))?,
            recipient: request.recipient,
            amountIn: request.amount_in,
            amountOutMinimum: request.min_amount_out,
            sqrtPriceLimitX96: U160::ZERO,
        };
        Ok(ISwapRouter02::exactInputSingleCall { params }.abi_encode().into())
    }
}
