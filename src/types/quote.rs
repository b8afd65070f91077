//! Normalized exchange quotes and price-impact probes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::TradingPair;

/// One adapter's answer for one pair in one polling cycle.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteResult {
    pub exchange_id: String,
    pub pair: TradingPair,
    /// Quote units per one base unit.
    pub price: Decimal,
    /// Depth expressed in quote units.
    pub available_liquidity: Decimal,
    pub sampled_at: DateTime<Utc>,
    pub raw_error: Option<String>,
}

impl QuoteResult {
    pub fn ok(exchange_id: &str, pair: &TradingPair, price: Decimal, available_liquidity: Decimal) -> Self {
        Self {
            exchange_id: exchange_id.to_string(),
            pair: pair.clone(),
            price,
            available_liquidity,
            sampled_at: Utc::now(),
            raw_error: None,
        }
    }

    pub fn failed(exchange_id: &str, pair: &TradingPair, error: impl ToString) -> Self {
        Self {
            exchange_id: exchange_id.to_string(),
            pair: pair.clone(),
            price: Decimal::ZERO,
            available_liquidity: Decimal::ZERO,
            sampled_at: Utc::now(),
            raw_error: Some(error.to_string()),
        }
    }

    /// Usable for comparison this cycle.
    pub fn is_live(&self) -> bool {
        self.raw_error.is_none()
            && self.price > Decimal::ZERO
            && self.available_liquidity > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeRate {
    /// Fraction of the intended trade size.
    pub fraction: Decimal,
    pub amount_in: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceImpact {
    pub exchange_id: String,
    pub trade_size: Decimal,
    pub probes: Vec<ProbeRate>,
    pub max_impact_pct: Decimal,
    pub sufficient_liquidity: bool,
}
