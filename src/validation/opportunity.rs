//! Opportunity gates: spread, liquidity on both venues and economics after gas

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use crate::{
    config::{DetectionSettings, MarketConfig},
    types::{PriceImpact, ValidationResult},
    validation::validate_liquidity,
};

/// Thresholds for one market, market overrides applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitGates {
    pub min_spread_pct: Decimal,
    pub max_price_impact_pct: Decimal,
    pub min_profit_pct: Decimal,
    pub min_profit_abs: Decimal,
}

impl ProfitGates {
    pub fn for_market(detection: &DetectionSettings, market: &MarketConfig) -> Self {
        Self {
            min_spread_pct: detection.min_spread_pct,
            max_price_impact_pct: detection.max_price_impact_pct,
            min_profit_pct: market.min_profit_pct.unwrap_or(detection.min_profit_pct),
            min_profit_abs: market.min_profit_abs.unwrap_or(detection.min_profit_abs),
        }
    }

    pub fn spread_acceptable(&self, spread_pct: Decimal) -> bool {
        spread_pct > Decimal::ZERO && spread_pct >= self.min_spread_pct
    }

    /// Both the relative (percent of notional) and the absolute floor must hold.
    pub fn profit_acceptable(&self, net_profit: Decimal, notional: Decimal) -> bool {
        if net_profit <= Decimal::ZERO || notional <= Decimal::ZERO {
            return false;
        }
        let relative = net_profit / notional * dec!(100);
        relative >= self.min_profit_pct && net_profit >= self.min_profit_abs
    }
}

pub fn validate_opportunity(
    spread_pct: Decimal,
    buy_impact: &PriceImpact,
    sell_impact: &PriceImpact,
    net_profit: Decimal,
    notional: Decimal,
    gates: &ProfitGates,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    result.spread_acceptable = gates.spread_acceptable(spread_pct);
    if !result.spread_acceptable {
        result.warnings.push(format!(
            "Spread too small: {:.4}% (min: {}%)",
            spread_pct, gates.min_spread_pct
        ));
    }

    result.liquidity_check = true;
    for impact in [buy_impact, sell_impact] {
        if let Err(e) = validate_liquidity(impact, gates.max_price_impact_pct) {
            result.liquidity_check = false;
            result.warnings.push(e.to_string());
        }
    }

    result.gas_economics = gates.profit_acceptable(net_profit, notional);
    if !result.gas_economics {
        result.warnings.push(format!(
            "Insufficient profit after gas: {:.4} on {:.2} notional (min {}% and {})",
            net_profit, notional, gates.min_profit_pct, gates.min_profit_abs
        ));
    }

    result.all_passed = result.spread_acceptable && result.liquidity_check && result.gas_economics;
    result
}
