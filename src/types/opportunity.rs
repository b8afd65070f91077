//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::TradingPair;

/// A transient recommendation: buy on one venue, sell on another.
/// Re-validated by the executor before anything is signed.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub id: String,
    pub pair: TradingPair,
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    /// Base units.
    pub trade_size: Decimal,
    pub spread_percent: Decimal,
    pub max_price_impact_pct: Decimal,
    /// Quote units.
    pub estimated_gas_cost: Decimal,
    /// Quote units.
    pub net_profit: Decimal,
    pub confidence_score: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Opportunity {
    /// Quote units spent on the buy leg.
    pub fn notional(&self) -> Decimal {
        self.trade_size * self.buy_price
    }

    pub fn roi_pct(&self) -> Decimal {
        let notional = self.notional();
        if notional.is_zero() {
            return Decimal::ZERO;
        }
        self.net_profit / notional * Decimal::ONE_HUNDRED
    }
}
