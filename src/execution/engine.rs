//! Trade execution engine
//!
//! Runs one opportunity through `Validating → Approving → ExecutingLeg1 →
//! ExecutingLeg2 → Settled`. Leg2 never starts before Leg1 is confirmed.
//! When Leg2 cannot complete the base tokens bought in Leg1 are sold back
//! through the best quoting venue.

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use chrono::Utc;
use futures::future::join_all;
use rust_decimal::prelude::*;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use crate::{
    arbitrage::{MarketContext, gas_cost_in_quote},
    config::ExecutionSettings,
    errors::{BotError, BotResult},
    execution::{TxSubmitter, gwei_to_wei},
    network::{ChainClient, contracts::IERC20, erc20_allowance, erc20_balance},
    pools::{ExchangeAdapter, SwapRequest},
    types::{
        ExecutionOutcome, ExecutionStage, LegKind, LegOutcome, LegStatus, Opportunity, Token, TradeResult,
        TradeStatus, TradingPair,
    },
    utils::{from_base_units, min_out_after_slippage, to_base_units_ceil, to_base_units_floor},
};

/// What Validating established and the later stages rely on.
struct Plan {
    amount_in: U256,
    min_base_out: U256,
    quote_before: U256,
    base_before: U256,
}

pub struct TradeExecutor {
    chain: Arc<dyn ChainClient>,
    submitter: Arc<TxSubmitter>,
    settings: ExecutionSettings,
    /// Amounts are measured as balance differences on the one wallet, so
    /// attempts never overlap.
    in_flight: Mutex<()>,
}

fn rejected(reason: impl Into<String>) -> BotResult<ExecutionOutcome> {
    Ok(ExecutionOutcome::Rejected { reason: reason.into() })
}

/// Unwind attempt that stopped before a swap was sent.
fn unwind_not_sent(pair: &TradingPair, exchange_id: &str, held: U256, reason: String) -> LegOutcome {
    LegOutcome {
        error: Some(reason),
        ..LegOutcome::new(
            LegKind::Unwind,
            exchange_id,
            pair.base().address,
            pair.quote().address,
            held,
            U256::ZERO,
        )
    }
}

impl TradeExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, submitter: Arc<TxSubmitter>, settings: ExecutionSettings) -> Self {
        Self {
            chain,
            submitter,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    pub fn account(&self) -> Address {
        self.submitter.account()
    }

    /// Execute `opportunity`, one attempt at a time per wallet. Validation
    /// rejections come back as `ExecutionOutcome::Rejected`; `Err` only for
    /// fatal failures before anything was submitted.
    pub async fn execute(&self, opportunity: Opportunity, market: &MarketContext) -> BotResult<ExecutionOutcome> {
        let _wallet = self.in_flight.lock().await;
        let started_at = Utc::now();
        let trade_id = uuid::Uuid::new_v4().to_string();
        self.transition(&trade_id, ExecutionStage::Validating);

        let (Some(buy), Some(sell)) = (
            market.adapter(&opportunity.buy_exchange),
            market.adapter(&opportunity.sell_exchange),
        ) else {
            return rejected(format!(
                "unknown exchange in {} -> {}",
                opportunity.buy_exchange, opportunity.sell_exchange
            ));
        };

        let plan = match self.validate(&opportunity, buy, sell).await {
            Ok(Ok(plan)) => plan,
            Ok(Err(reason)) => {
                self.transition(&trade_id, ExecutionStage::Rejected);
                info!(trade_id = %trade_id, reason = %reason, "Opportunity rejected before execution");
                return rejected(reason);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.transition(&trade_id, ExecutionStage::Rejected);
                return rejected(format!("validation failed: {}", e));
            }
        };

        let pair = &opportunity.pair;
        let (base, quote) = (pair.base().clone(), pair.quote().clone());
        let mut legs = Vec::new();

        let (status, legs) = 'run: {
            // Approving
            if let Some(leg) = self.ensure_allowance(&trade_id, buy, &quote, plan.amount_in).await {
                let confirmed = leg.is_confirmed();
                legs.push(leg);
                if !confirmed {
                    self.transition(&trade_id, ExecutionStage::Failed);
                    break 'run (TradeStatus::Failed, legs);
                }
            }

            // Leg1: quote → base on the cheaper venue
            self.transition(&trade_id, ExecutionStage::ExecutingLeg1);
            let leg1 = self
                .swap(LegKind::Leg1, buy, pair, quote.address, plan.amount_in, plan.min_base_out)
                .await;
            let leg1_confirmed = leg1.is_confirmed();
            legs.push(leg1);
            if !leg1_confirmed {
                self.transition(&trade_id, ExecutionStage::Failed);
                break 'run (TradeStatus::Failed, legs);
            }

            // Leg2: sell exactly what Leg1 delivered
            self.transition(&trade_id, ExecutionStage::ExecutingLeg2);
            let received = self.received_base(&base, plan.base_before, plan.min_base_out).await;
            let leg2_ok = match self.ensure_allowance(&trade_id, sell, &base, received).await {
                Some(leg) if !leg.is_confirmed() => {
                    legs.push(leg);
                    false
                }
                approval => {
                    legs.extend(approval);
                    let min_quote_out = self.sell_minimum(sell, pair, &opportunity, received).await;
                    let leg2 = self
                        .swap(LegKind::Leg2, sell, pair, base.address, received, min_quote_out)
                        .await;
                    let confirmed = leg2.is_confirmed();
                    legs.push(leg2);
                    confirmed
                }
            };

            if leg2_ok {
                self.transition(&trade_id, ExecutionStage::Settled);
                break 'run (TradeStatus::Success, legs);
            }

            self.transition(&trade_id, ExecutionStage::PartiallyReverted);
            self.transition(&trade_id, ExecutionStage::Unwinding);
            self.unwind(&trade_id, market, &base, plan.base_before, received, &mut legs).await;
            (TradeStatus::PartiallyReverted, legs)
        };

        let result = self
            .settle(trade_id, &opportunity, market, status, legs, &plan, started_at)
            .await;
        Ok(ExecutionOutcome::Executed(result))
    }

    fn transition(&self, trade_id: &str, stage: ExecutionStage) {
        info!(trade_id = %trade_id, stage = %stage, "Execution stage");
    }

    /// `Ok(Err(reason))` is a rejection, `Err` a failed read.
    async fn validate(
        &self,
        opportunity: &Opportunity,
        buy: &ExchangeAdapter,
        sell: &ExchangeAdapter,
    ) -> BotResult<Result<Plan, String>> {
        let pair = &opportunity.pair;
        let (base, quote) = (pair.base(), pair.quote());
        let account = self.account();

        let amount_in = to_base_units_floor(opportunity.notional(), quote.decimals)?;
        if amount_in.is_zero() {
            return Ok(Err("trade notional rounds to zero".to_string()));
        }

        let quote_before = erc20_balance(self.chain.as_ref(), quote.address, account).await?;
        if quote_before < amount_in {
            let error = BotError::InsufficientBalance {
                token: quote.symbol.clone(),
                required: from_base_units(amount_in, quote.decimals)?,
                available: from_base_units(quote_before, quote.decimals)?,
            };
            return Ok(Err(error.to_string()));
        }

        let gas_price = self.chain.gas_price().await?;
        let gas_cap = gwei_to_wei(self.settings.max_gas_price_gwei);
        if gas_price > gas_cap {
            return Ok(Err(format!(
                "gas price {} gwei above cap {} gwei",
                from_base_units(U256::from(gas_price), 9)?,
                self.settings.max_gas_price_gwei
            )));
        }

        let expected_base = buy.quote_exact_in(pair, quote.address, amount_in).await?;
        if expected_base.is_zero() {
            return Ok(Err(format!("{} quotes nothing for {}", buy.id(), amount_in)));
        }
        let min_base_out = min_out_after_slippage(expected_base, self.settings.max_slippage_bps);
        let expected_back = sell.quote_exact_in(pair, base.address, expected_base).await?;
        if expected_back <= amount_in {
            return Ok(Err(format!(
                "round trip no longer profitable: {} in, {} back",
                from_base_units(amount_in, quote.decimals)?,
                from_base_units(expected_back, quote.decimals)?
            )));
        }

        let base_before = erc20_balance(self.chain.as_ref(), base.address, account).await?;
        Ok(Ok(Plan {
            amount_in,
            min_base_out,
            quote_before,
            base_before,
        }))
    }

    /// Approve `adapter`'s router for `amount` of `token` when the current
    /// allowance is short. `None` when nothing had to be sent.
    async fn ensure_allowance(
        &self,
        trade_id: &str,
        adapter: &ExchangeAdapter,
        token: &Token,
        amount: U256,
    ) -> Option<LegOutcome> {
        let spender = adapter.router();
        let mut leg = LegOutcome {
            spender: Some(spender),
            ..LegOutcome::new(LegKind::Approval, adapter.id(), token.address, token.address, amount, U256::ZERO)
        };

        match erc20_allowance(self.chain.as_ref(), token.address, self.account(), spender).await {
            Ok(current) if current >= amount => return None,
            Ok(_) => {}
            Err(e) => {
                leg.error = Some(format!("allowance read failed: {}", e));
                return Some(leg);
            }
        }

        self.transition(trade_id, ExecutionStage::Approving);
        let calldata = IERC20::approveCall { spender, amount }.abi_encode();
        self.submit_and_confirm(&mut leg, token.address, calldata.into(), self.settings.approve_gas_limit)
            .await;
        Some(leg)
    }

    async fn swap(
        &self,
        kind: LegKind,
        adapter: &ExchangeAdapter,
        pair: &TradingPair,
        token_in: Address,
        amount_in: U256,
        min_amount_out: U256,
    ) -> LegOutcome {
        let token_out = pair.counterpart(token_in).map(|t| t.address).unwrap_or(Address::ZERO);
        let mut leg = LegOutcome::new(kind, adapter.id(), token_in, token_out, amount_in, min_amount_out);

        let deadline = U256::from(Utc::now().timestamp().max(0) as u64 + self.settings.deadline_secs);
        let request = SwapRequest {
            token_in,
            amount_in,
            min_amount_out,
            recipient: self.account(),
            deadline,
        };
        match adapter.encode_swap(pair, &request) {
            Ok(call) => {
                self.submit_and_confirm(&mut leg, call.router, call.calldata, self.settings.swap_gas_limit)
                    .await
            }
            Err(e) => leg.error = Some(format!("encoding failed: {}", e)),
        }
        leg
    }

    async fn submit_and_confirm(&self, leg: &mut LegOutcome, to: Address, calldata: alloy::primitives::Bytes, gas_limit: u64) {
        let hash = match self.submitter.submit(to, calldata, gas_limit).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("{:?} on {} not submitted: {}", leg.kind, leg.exchange_id, e);
                leg.error = Some(e.to_string());
                return;
            }
        };
        leg.tx_hash = Some(hash);

        match self.submitter.wait_for_receipt(hash).await {
            Ok(receipt) => {
                leg.gas_used = Some(receipt.gas_used);
                leg.effective_gas_price = Some(receipt.effective_gas_price);
                if receipt.status {
                    leg.status = LegStatus::Confirmed;
                } else {
                    leg.status = LegStatus::Reverted;
                    leg.error = Some("reverted".to_string());
                    warn!(tx = %hash, "{:?} on {} reverted", leg.kind, leg.exchange_id);
                }
            }
            Err(e @ BotError::Timeout { .. }) => {
                leg.status = LegStatus::TimedOut;
                leg.error = Some(e.to_string());
                warn!(tx = %hash, "{:?} on {} unconfirmed: {}", leg.kind, leg.exchange_id, e);
            }
            Err(e) => {
                leg.status = LegStatus::TimedOut;
                leg.error = Some(format!("receipt unavailable: {}", e));
                warn!(tx = %hash, "{:?} on {} receipt unavailable: {}", leg.kind, leg.exchange_id, e);
            }
        }
    }

    /// Base actually received since `before`, or `fallback` when the balance
    /// cannot be read or shows nothing.
    async fn received_base(&self, base: &Token, before: U256, fallback: U256) -> U256 {
        match erc20_balance(self.chain.as_ref(), base.address, self.account()).await {
            Ok(after) if after > before => after - before,
            Ok(_) => fallback,
            Err(e) => {
                warn!("Cannot measure {} received, assuming minimum {}: {}", base.symbol, fallback, e);
                fallback
            }
        }
    }

    async fn sell_minimum(&self, sell: &ExchangeAdapter, pair: &TradingPair, opportunity: &Opportunity, amount: U256) -> U256 {
        match sell.quote_exact_in(pair, pair.base().address, amount).await {
            Ok(expected) => min_out_after_slippage(expected, self.settings.max_slippage_bps),
            Err(e) => {
                warn!("Leg2 re-quote on {} failed, bounding by detected price: {}", sell.id(), e);
                let expected = from_base_units(amount, pair.base().decimals)
                    .and_then(|base| to_base_units_ceil(base * opportunity.sell_price, pair.quote().decimals))
                    .unwrap_or(U256::ZERO);
                min_out_after_slippage(expected, self.settings.max_slippage_bps)
            }
        }
    }

    /// Sell still-held base back through the venue quoting the most quote
    /// for it, at the wider unwind tolerance.
    async fn unwind(
        &self,
        trade_id: &str,
        market: &MarketContext,
        base: &Token,
        base_before: U256,
        fallback: U256,
        legs: &mut Vec<LegOutcome>,
    ) {
        let pair = &market.pair;
        for attempt in 1..=self.settings.unwind_attempts {
            let held = match erc20_balance(self.chain.as_ref(), base.address, self.account()).await {
                Ok(balance) => balance.saturating_sub(base_before),
                Err(_) => fallback,
            };
            if held.is_zero() {
                info!(trade_id = %trade_id, "Nothing left to unwind");
                return;
            }

            let quotes = join_all(
                market
                    .adapters
                    .iter()
                    .map(|adapter| adapter.quote_exact_in(pair, base.address, held)),
            )
            .await;
            let best = market
                .adapters
                .iter()
                .zip(quotes)
                .filter_map(|(adapter, quote)| quote.ok().map(|out| (adapter, out)))
                .max_by_key(|(_, out)| *out);
            let Some((venue, expected)) = best else {
                warn!(trade_id = %trade_id, attempt, "No venue quotes the unwind");
                legs.push(unwind_not_sent(pair, "none", held, "no venue quotes the held base".to_string()));
                continue;
            };

            if let Some(approval) = self.ensure_allowance(trade_id, venue, base, held).await {
                let confirmed = approval.is_confirmed();
                let reason = format!(
                    "approval failed: {}",
                    approval.error.as_deref().unwrap_or("not confirmed")
                );
                legs.push(approval);
                if !confirmed {
                    legs.push(unwind_not_sent(pair, venue.id(), held, reason));
                    continue;
                }
            }

            let min_out = min_out_after_slippage(expected, self.settings.unwind_slippage_bps);
            let leg = self.swap(LegKind::Unwind, venue, pair, base.address, held, min_out).await;
            let confirmed = leg.is_confirmed();
            legs.push(leg);
            if confirmed {
                info!(trade_id = %trade_id, venue = venue.id(), attempt, "Position unwound");
                return;
            }
        }

        error!(
            trade_id = %trade_id,
            token = %base.symbol,
            "MANUAL ACTION REQUIRED: unwind failed after {} attempt(s), {} is still held",
            self.settings.unwind_attempts,
            base.symbol
        );
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle(
        &self,
        trade_id: String,
        opportunity: &Opportunity,
        market: &MarketContext,
        status: TradeStatus,
        legs: Vec<LegOutcome>,
        plan: &Plan,
        started_at: chrono::DateTime<Utc>,
    ) -> TradeResult {
        let pair = &opportunity.pair;
        let reference_price = (opportunity.buy_price + opportunity.sell_price) / Decimal::TWO;

        let gas_wei: u128 = legs.iter().map(LegOutcome::gas_cost_wei).sum();
        let gas_spent_native = from_base_units(U256::from(gas_wei), 18).unwrap_or(Decimal::ZERO);
        let gas_spent = gas_cost_in_quote(gas_spent_native, market.gas_denomination, reference_price);

        let realized_profit = match self.balance_change(pair, plan).await {
            Ok((quote_delta, base_delta)) => Some(quote_delta + base_delta * reference_price - gas_spent),
            Err(e) => {
                warn!(trade_id = %trade_id, "Cannot read final balances: {}", e);
                None
            }
        };

        let result = TradeResult {
            id: trade_id,
            opportunity_id: opportunity.id.clone(),
            pair: pair.clone(),
            buy_exchange: opportunity.buy_exchange.clone(),
            sell_exchange: opportunity.sell_exchange.clone(),
            status,
            legs,
            realized_profit,
            gas_spent,
            gas_spent_native,
            expected_profit: opportunity.net_profit,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            trade_id = %result.id,
            status = ?result.status,
            legs = result.legs.len(),
            realized_profit = ?result.realized_profit,
            gas_spent = %result.gas_spent.round_dp(4),
            "Trade finished"
        );
        result
    }

    /// (Δquote, Δbase) in human units since validation.
    async fn balance_change(&self, pair: &TradingPair, plan: &Plan) -> BotResult<(Decimal, Decimal)> {
        let (base, quote) = (pair.base(), pair.quote());
        let quote_after = erc20_balance(self.chain.as_ref(), quote.address, self.account()).await?;
        let base_after = erc20_balance(self.chain.as_ref(), base.address, self.account()).await?;
        let quote_delta = from_base_units(quote_after, quote.decimals)? - from_base_units(plan.quote_before, quote.decimals)?;
        let base_delta = from_base_units(base_after, base.decimals)? - from_base_units(plan.base_before, base.decimals)?;
        Ok((quote_delta, base_delta))
    }
}
