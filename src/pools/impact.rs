//! Price impact measurement across probe sizes

use alloy::primitives::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use crate::{
    errors::{BotError, BotResult},
    types::{PriceImpact, ProbeRate, TradingPair},
    utils::{from_base_units, to_base_units_floor},
};

/// Fractions of the intended trade size that are quoted base → quote.
pub const PROBE_FRACTIONS: [Decimal; 5] = [dec!(0.2), dec!(0.4), dec!(0.6), dec!(0.8), dec!(1.0)];

/// One probe input: its fraction, the human amount and the same amount in base units.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub fraction: Decimal,
    pub amount: Decimal,
    pub amount_in: U256,
}

pub fn probes_for(trade_size: Decimal, base_decimals: u8) -> BotResult<Vec<Probe>> {
    PROBE_FRACTIONS
        .iter()
        .map(|fraction| {
            let amount = trade_size * fraction;
            let amount_in = to_base_units_floor(amount, base_decimals)?;
            if amount_in.is_zero() {
                return Err(BotError::Config(format!(
                    "trade size {} is too small to probe at {}",
                    trade_size, fraction
                )));
            }
            Ok(Probe {
                fraction: *fraction,
                amount,
                amount_in,
            })
        })
        .collect()
}

/// Largest relative deviation of any rate from the first one, in percent.
pub fn max_impact_pct(rates: &[Decimal]) -> Option<Decimal> {
    let reference = *rates.first()?;
    if reference <= Decimal::ZERO {
        return None;
    }
    Some(
        rates
            .iter()
            .map(|rate| ((*rate - reference) / reference * dec!(100)).abs())
            .max()
            .unwrap_or(Decimal::ZERO),
    )
}

/// Turn probe outputs into a [`PriceImpact`]. `scaled` selects decimal-adjusted
/// rates; pegged stable pools compare raw amounts.
pub fn assess(
    exchange_id: &str,
    pair: &TradingPair,
    trade_size: Decimal,
    probes: &[Probe],
    outputs: &[U256],
    scaled: bool,
    limit_pct: Decimal,
) -> BotResult<PriceImpact> {
    let mut rates = Vec::with_capacity(probes.len());
    for (probe, amount_out) in probes.iter().zip(outputs) {
        let rate = if scaled {
            from_base_units(*amount_out, pair.quote().decimals)? / probe.amount
        } else {
            from_base_units(*amount_out, 0)? / from_base_units(probe.amount_in, 0)?
        };
        rates.push(ProbeRate {
            fraction: probe.fraction,
            amount_in: probe.amount,
            rate,
        });
    }

    let raw: Vec<Decimal> = rates.iter().map(|p| p.rate).collect();
    // a zero first rate means the venue cannot fill even the smallest probe
    let max_impact_pct = max_impact_pct(&raw).unwrap_or(dec!(100));

    Ok(PriceImpact {
        exchange_id: exchange_id.to_string(),
        trade_size,
        probes: rates,
        max_impact_pct,
        sufficient_liquidity: max_impact_pct < limit_pct,
    })
}
