//! Price history and volatility types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeSample {
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceTrend {
    Bullish,
    Bearish,
    Sideways,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairStatistics {
    /// Mean absolute percentage change between consecutive points.
    pub volatility_pct: Decimal,
    pub trend: PriceTrend,
    pub recent_volume: Decimal,
    pub samples: usize,
}
