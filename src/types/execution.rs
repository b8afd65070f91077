//! Trade execution types

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use super::TradingPair;

/// States of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStage {
    Validating,
    Approving,
    ExecutingLeg1,
    ExecutingLeg2,
    Unwinding,
    Settled,
    Rejected,
    Failed,
    PartiallyReverted,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeStatus {
    Success,
    PartiallyReverted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegKind {
    Approval,
    Leg1,
    Leg2,
    Unwind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegStatus {
    Confirmed,
    Reverted,
    TimedOut,
    /// Never reached the node (signing, quoting or submission failed).
    SubmitFailed,
}

/// One on-chain transaction of an execution attempt.
#[derive(Debug, Clone, Serialize)]
pub struct LegOutcome {
    pub kind: LegKind,
    pub exchange_id: String,
    pub token_in: Address,
    /// Equals `token_in` on approval legs.
    pub token_out: Address,
    /// Router granted the allowance, approval legs only.
    pub spender: Option<Address>,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub tx_hash: Option<TxHash>,
    pub status: LegStatus,
    pub gas_used: Option<u128>,
    pub effective_gas_price: Option<u128>,
    pub error: Option<String>,
}

impl LegOutcome {
    /// A leg that has not reached the node yet.
    pub fn new(
        kind: LegKind,
        exchange_id: impl Into<String>,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Self {
        Self {
            kind,
            exchange_id: exchange_id.into(),
            token_in,
            token_out,
            spender: None,
            amount_in,
            min_amount_out,
            tx_hash: None,
            status: LegStatus::SubmitFailed,
            gas_used: None,
            effective_gas_price: None,
            error: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == LegStatus::Confirmed
    }

    /// Wei paid for this leg, when it was mined.
    pub fn gas_cost_wei(&self) -> u128 {
        match (self.gas_used, self.effective_gas_price) {
            (Some(used), Some(price)) => used.saturating_mul(price),
            _ => 0,
        }
    }
}

/// Terminal record of one execution attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TradeResult {
    pub id: String,
    pub opportunity_id: String,
    pub pair: TradingPair,
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub status: TradeStatus,
    pub legs: Vec<LegOutcome>,
    /// Quote units; absent when final balances could not be read.
    pub realized_profit: Option<Decimal>,
    /// Quote units.
    pub gas_spent: Decimal,
    pub gas_spent_native: Decimal,
    pub expected_profit: Decimal,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TradeResult {
    pub fn legs_of(&self, kind: LegKind) -> impl Iterator<Item = &LegOutcome> {
        self.legs.iter().filter(move |leg| leg.kind == kind)
    }
}

#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Nothing was submitted.
    Rejected { reason: String },
    Executed(TradeResult),
}
