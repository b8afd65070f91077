//! Arbitrage opportunity calculation

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use crate::{
    config::{ConfidenceWeights, GasDenomination},
    errors::{BotError, BotResult},
    types::{Opportunity, QuoteResult, TradingPair},
    utils::pow10,
};

/// |a − b| / min(a, b) × 100
pub fn spread_percent(price_a: Decimal, price_b: Decimal) -> Decimal {
    let min = price_a.min(price_b);
    if min <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (price_a - price_b).abs() / min * dec!(100)
}

/// Two legs of `gas_per_leg` at `gas_price_wei`, padded by `multiplier`, in native units.
pub fn gas_cost_native(gas_per_leg: u64, gas_price_wei: u128, multiplier: Decimal) -> BotResult<Decimal> {
    let price = Decimal::from_u128(gas_price_wei)
        .ok_or_else(|| BotError::parsing("gas price does not fit a decimal", anyhow::anyhow!("{} wei", gas_price_wei)))?;
    let gas = Decimal::from(gas_per_leg) * dec!(2);
    Ok(gas * price / pow10(18)? * multiplier)
}

pub fn gas_cost_in_quote(native: Decimal, denomination: GasDenomination, reference_price: Decimal) -> Decimal {
    match denomination {
        GasDenomination::BaseToken => native * reference_price,
        GasDenomination::QuoteToken => native,
        GasDenomination::Fixed { native_price } => native * native_price,
    }
}

/// `trade_size × min × (max / min − 1) − gas`, all in quote units.
pub fn net_profit(trade_size: Decimal, price_a: Decimal, price_b: Decimal, gas_cost: Decimal) -> Decimal {
    let (min, max) = (price_a.min(price_b), price_a.max(price_b));
    if min <= Decimal::ZERO {
        return -gas_cost;
    }
    trade_size * min * (max / min - Decimal::ONE) - gas_cost
}

pub fn confidence_score(
    spread_pct: Decimal,
    max_impact_pct: Decimal,
    impact_limit_pct: Decimal,
    volatility_pct: Decimal,
    weights: &ConfidenceWeights,
) -> Decimal {
    let mut score = weights.base;

    if spread_pct >= weights.large_spread_pct {
        score += weights.large_spread_bonus;
    }
    // spreads this wide are usually a stale or broken quote
    if spread_pct > weights.implausible_spread_pct {
        score -= weights.implausible_spread_penalty;
    }
    if impact_limit_pct > Decimal::ZERO {
        score -= weights.impact_penalty * (max_impact_pct / impact_limit_pct).min(Decimal::ONE);
    }
    if weights.volatility_threshold_pct > Decimal::ZERO {
        score -= weights.volatility_penalty * (volatility_pct / weights.volatility_threshold_pct).min(Decimal::ONE);
    }

    score.max(Decimal::ZERO).min(Decimal::ONE)
}

/// Everything the detector measured for one ordered pair of venues.
pub struct CandidateInputs<'a> {
    pub pair: &'a TradingPair,
    pub buy: &'a QuoteResult,
    pub sell: &'a QuoteResult,
    pub trade_size: Decimal,
    pub max_price_impact_pct: Decimal,
    pub estimated_gas_cost: Decimal,
    pub net_profit: Decimal,
    pub confidence_score: Decimal,
}

pub fn calculate_arbitrage(inputs: CandidateInputs<'_>) -> Opportunity {
    Opportunity {
        id: uuid::Uuid::new_v4().to_string(),
        pair: inputs.pair.clone(),
        buy_exchange: inputs.buy.exchange_id.clone(),
        sell_exchange: inputs.sell.exchange_id.clone(),
        buy_price: inputs.buy.price,
        sell_price: inputs.sell.price,
        trade_size: inputs.trade_size,
        spread_percent: spread_percent(inputs.buy.price, inputs.sell.price),
        max_price_impact_pct: inputs.max_price_impact_pct,
        estimated_gas_cost: inputs.estimated_gas_cost,
        net_profit: inputs.net_profit,
        confidence_score: inputs.confidence_score,
        created_at: Utc::now(),
    }
}
