//! Per-pair price history shared by every market task

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use crate::{
    types::{PairStatistics, PricePoint, PriceTrend, TradingPair},
    volatility::PriceWindow,
};

/// Owned once per process and shared behind an `Arc`. Appends for one pair
/// are serialized by that pair's lock; different pairs never contend beyond
/// the brief map lookup.
pub struct PriceHistoryStore {
    window: Duration,
    pairs: RwLock<HashMap<TradingPair, Arc<Mutex<PriceWindow>>>>,
}

impl PriceHistoryStore {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::hours(1)),
            pairs: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, pair: &TradingPair) -> Arc<Mutex<PriceWindow>> {
        if let Some(window) = self.pairs.read().await.get(pair) {
            return Arc::clone(window);
        }
        let mut pairs = self.pairs.write().await;
        Arc::clone(
            pairs
                .entry(pair.clone())
                .or_insert_with(|| Arc::new(Mutex::new(PriceWindow::new(self.window)))),
        )
    }

    async fn existing(&self, pair: &TradingPair) -> Option<Arc<Mutex<PriceWindow>>> {
        self.pairs.read().await.get(pair).cloned()
    }

    pub async fn record_price(&self, pair: &TradingPair, price: Decimal, at: DateTime<Utc>) {
        self.entry(pair).await.lock().await.add_price(price, at);
    }

    pub async fn record_volume(&self, pair: &TradingPair, amount: Decimal, at: DateTime<Utc>) {
        self.entry(pair).await.lock().await.add_volume(amount, at);
    }

    pub async fn volatility(&self, pair: &TradingPair) -> Decimal {
        match self.existing(pair).await {
            Some(window) => window.lock().await.volatility_pct(),
            None => Decimal::ZERO,
        }
    }

    pub async fn recent_volume(&self, pair: &TradingPair) -> Decimal {
        match self.existing(pair).await {
            Some(window) => window.lock().await.recent_volume(),
            None => Decimal::ZERO,
        }
    }

    pub async fn trend(&self, pair: &TradingPair) -> PriceTrend {
        match self.existing(pair).await {
            Some(window) => window.lock().await.trend(),
            None => PriceTrend::Sideways,
        }
    }

    pub async fn statistics(&self, pair: &TradingPair) -> PairStatistics {
        let Some(window) = self.existing(pair).await else {
            return PairStatistics {
                volatility_pct: Decimal::ZERO,
                trend: PriceTrend::Sideways,
                recent_volume: Decimal::ZERO,
                samples: 0,
            };
        };
        let window = window.lock().await;
        PairStatistics {
            volatility_pct: window.volatility_pct(),
            trend: window.trend(),
            recent_volume: window.recent_volume(),
            samples: window.sample_count(),
        }
    }

    /// Snapshot of the retained points, oldest first.
    pub async fn points(&self, pair: &TradingPair) -> Vec<PricePoint> {
        match self.existing(pair).await {
            Some(window) => window.lock().await.points(),
            None => Vec::new(),
        }
    }
}
