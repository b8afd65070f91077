//! Rolling price window with volatility and trend

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use tracing::warn;
use crate::types::{PricePoint, PriceTrend, VolumeSample};

/// Net move across the window, in percent, that counts as a trend.
const TREND_THRESHOLD_PCT: Decimal = dec!(0.5);

pub struct PriceWindow {
    points: VecDeque<PricePoint>,
    volumes: VecDeque<VolumeSample>,
    max_age: Duration,
}

impl PriceWindow {
    pub fn new(max_age: Duration) -> Self {
        PriceWindow {
            points: VecDeque::new(),
            volumes: VecDeque::new(),
            max_age,
        }
    }

    /// Append, keeping timestamps non-decreasing, then drop points older than
    /// the window relative to the newest one.
    pub fn add_price(&mut self, price: Decimal, at: DateTime<Utc>) {
        let timestamp = match self.points.back() {
            Some(last) if at < last.timestamp => {
                warn!("Price timestamp {} is older than {}, clamping", at, last.timestamp);
                last.timestamp
            }
            _ => at,
        };
        self.points.push_back(PricePoint { price, timestamp });

        let cutoff = timestamp - self.max_age;
        while self.points.front().is_some_and(|p| p.timestamp < cutoff) {
            self.points.pop_front();
        }
        while self.volumes.front().is_some_and(|v| v.timestamp < cutoff) {
            self.volumes.pop_front();
        }
    }

    pub fn add_volume(&mut self, amount: Decimal, at: DateTime<Utc>) {
        let timestamp = match self.volumes.back() {
            Some(last) if at < last.timestamp => last.timestamp,
            _ => at,
        };
        self.volumes.push_back(VolumeSample { amount, timestamp });

        let cutoff = timestamp - self.max_age;
        while self.volumes.front().is_some_and(|v| v.timestamp < cutoff) {
            self.volumes.pop_front();
        }
    }

    /// Mean absolute percentage change between consecutive points. Zero with
    /// fewer than two points.
    pub fn volatility_pct(&self) -> Decimal {
        if self.points.len() < 2 {
            return Decimal::ZERO;
        }
        let changes: Vec<Decimal> = self
            .points
            .iter()
            .zip(self.points.iter().skip(1))
            .filter(|(prev, _)| !prev.price.is_zero())
            .map(|(prev, next)| ((next.price - prev.price) / prev.price * dec!(100)).abs())
            .collect();
        if changes.is_empty() {
            return Decimal::ZERO;
        }
        changes.iter().sum::<Decimal>() / Decimal::from(changes.len())
    }

    pub fn trend(&self) -> PriceTrend {
        let (Some(first), Some(last)) = (self.points.front(), self.points.back()) else {
            return PriceTrend::Sideways;
        };
        if first.price.is_zero() {
            return PriceTrend::Sideways;
        }
        let change = (last.price - first.price) / first.price * dec!(100);
        if change > TREND_THRESHOLD_PCT {
            PriceTrend::Bullish
        } else if change < -TREND_THRESHOLD_PCT {
            PriceTrend::Bearish
        } else {
            PriceTrend::Sideways
        }
    }

    pub fn recent_volume(&self) -> Decimal {
        self.volumes.iter().map(|v| v.amount).sum()
    }

    pub fn points(&self) -> Vec<PricePoint> {
        self.points.iter().copied().collect()
    }

    pub fn sample_count(&self) -> usize {
        self.points.len()
    }
}
