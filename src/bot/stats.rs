//! Session statistics kept by the recorder task

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use crate::types::{Opportunity, TradeResult, TradeStatus};

pub struct SessionStats {
    pub started: Instant,
    pub opportunities: u64,
    pub total_potential_profit: Decimal,
    pub rejected: u64,
    pub successful_trades: u64,
    pub partial_trades: u64,
    pub failed_trades: u64,
    pub realized_profit: Decimal,
    pub gas_spent: Decimal,
    pub error_counts: HashMap<String, u32>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            opportunities: 0,
            total_potential_profit: Decimal::ZERO,
            rejected: 0,
            successful_trades: 0,
            partial_trades: 0,
            failed_trades: 0,
            realized_profit: Decimal::ZERO,
            gas_spent: Decimal::ZERO,
            error_counts: HashMap::new(),
        }
    }

    pub fn record_opportunity(&mut self, opportunity: &Opportunity) {
        self.opportunities += 1;
        self.total_potential_profit += opportunity.net_profit;
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub fn record_trade(&mut self, result: &TradeResult) {
        match result.status {
            TradeStatus::Success => self.successful_trades += 1,
            TradeStatus::PartiallyReverted => self.partial_trades += 1,
            TradeStatus::Failed => self.failed_trades += 1,
        }
        if let Some(profit) = result.realized_profit {
            self.realized_profit += profit;
        }
        self.gas_spent += result.gas_spent;
    }

    pub fn record_error(&mut self, kind: &str) {
        *self.error_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn total_trades(&self) -> u64 {
        self.successful_trades + self.partial_trades + self.failed_trades
    }

    pub fn runtime_minutes(&self) -> u64 {
        self.started.elapsed().as_secs() / 60
    }

    /// Every 50 opportunities or 10 trades.
    pub fn should_print(&self) -> bool {
        (self.opportunities > 0 && self.opportunities % 50 == 0)
            || (self.total_trades() > 0 && self.total_trades() % 10 == 0)
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use crate::types::{Token, TradingPair, USDC_BASE, WETH_BASE};

    fn trade(status: TradeStatus, profit: Option<Decimal>) -> TradeResult {
        TradeResult {
            id: "t".to_string(),
            opportunity_id: "o".to_string(),
            pair: TradingPair::new(Token::new("WETH", WETH_BASE, 18), Token::new("USDC", USDC_BASE, 6)).unwrap(),
            buy_exchange: "a".to_string(),
            sell_exchange: "b".to_string(),
            status,
            legs: Vec::new(),
            realized_profit: profit,
            gas_spent: dec!(0.5),
            gas_spent_native: dec!(0.0002),
            expected_profit: dec!(9),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn tallies_trades_by_status() {
        let mut stats = SessionStats::new();
        stats.record_trade(&trade(TradeStatus::Success, Some(dec!(8))));
        stats.record_trade(&trade(TradeStatus::PartiallyReverted, None));
        stats.record_trade(&trade(TradeStatus::Failed, Some(dec!(-1))));

        assert_eq!(stats.total_trades(), 3);
        assert_eq!(stats.successful_trades, 1);
        assert_eq!(stats.realized_profit, dec!(7));
        assert_eq!(stats.gas_spent, dec!(1.5));
    }
}
