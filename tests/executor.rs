//! Two-leg execution against scripted receipts and balances.

mod common;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use common::*;
use dex_arb_engine::{
    arbitrage::{MarketContext, OpportunityDetector},
    config::Config,
    execution::{TradeExecutor, TxSubmitter},
    network::ChainClient,
    pools::build_adapters,
    types::{ExecutionOutcome, LegKind, LegStatus, Opportunity, TradeResult, TradeStatus, USDC_BASE, WETH_BASE},
    volatility::PriceHistoryStore,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    chain: Arc<ScriptedChain>,
    config: Config,
    executor: TradeExecutor,
    market: MarketContext,
    opportunity: Opportunity,
    account: Address,
}

impl Harness {
    /// Another market over the same venues, for a second concurrent trade.
    fn second_market(&self) -> MarketContext {
        let chain: Arc<dyn ChainClient> = self.chain.clone();
        let adapters = build_adapters(&self.config.exchanges, chain);
        MarketContext::resolve(&self.config.markets[0], &self.config.detection, &adapters).unwrap()
    }
}

/// Cheap venue at 2000, rich venue at 2100, 1 WETH per trade.
async fn harness() -> Harness {
    harness_with(|_| {}).await
}

async fn harness_with(configure: impl FnOnce(&mut Config)) -> Harness {
    let chain = Arc::new(
        ScriptedChain::new()
            .with_pool(CHEAP_FACTORY, CHEAP_POOL, eth(100_000), usd(200_000_000))
            .with_pool(RICH_FACTORY, RICH_POOL, eth(100_000), usd(210_000_000)),
    );
    let dyn_chain: Arc<dyn ChainClient> = chain.clone();

    let mut config = balanced_config();
    config.exchanges = vec![
        v2_exchange("cheap", CHEAP_FACTORY, CHEAP_ROUTER, 30),
        v2_exchange("rich", RICH_FACTORY, RICH_ROUTER, 30),
    ];
    config.markets = vec![weth_usdc_market(dec!(1), &["cheap", "rich"])];
    config.execution.confirmation_timeout_secs = 5;
    config.execution.receipt_poll_interval_ms = 10;
    config.execution.unwind_attempts = 2;
    configure(&mut config);

    let adapters = build_adapters(&config.exchanges, Arc::clone(&dyn_chain));
    let market = MarketContext::resolve(&config.markets[0], &config.detection, &adapters).unwrap();
    let history = Arc::new(PriceHistoryStore::new(Duration::from_secs(3_600)));
    let detector = OpportunityDetector::new(Arc::clone(&dyn_chain), history, config.detection.clone());
    let opportunity = detector.detect(&market).await.unwrap().expect("opportunity");

    let submitter = TxSubmitter::new(
        Arc::clone(&dyn_chain),
        PrivateKeySigner::random(),
        8453,
        &config.execution,
    );
    let account = submitter.account();
    let executor = TradeExecutor::new(dyn_chain, Arc::new(submitter), config.execution.clone());
    chain.set_balance(USDC_BASE, account, usd(5_000));

    Harness {
        chain,
        config,
        executor,
        market,
        opportunity,
        account,
    }
}

fn executed(outcome: ExecutionOutcome) -> TradeResult {
    match outcome {
        ExecutionOutcome::Executed(result) => result,
        ExecutionOutcome::Rejected { reason } => panic!("unexpected rejection: {}", reason),
    }
}

fn kinds(result: &TradeResult) -> Vec<(LegKind, LegStatus)> {
    result.legs.iter().map(|leg| (leg.kind, leg.status)).collect()
}

#[tokio::test]
async fn settles_both_legs() {
    let h = harness().await;
    let bought = U256::from(996_000_000_000_000_000u128);
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, bought),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::ZERO),
        (USDC_BASE, h.account, usd(5_087)),
    ]));

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::Success);
    assert_eq!(
        kinds(&result),
        vec![(LegKind::Leg1, LegStatus::Confirmed), (LegKind::Leg2, LegStatus::Confirmed)]
    );
    // Leg2 sells exactly what Leg1 delivered
    assert_eq!(result.legs[1].amount_in, bought);
    assert!(result.legs[1].min_amount_out > U256::ZERO);
    // 2 x 150k gas at 1 gwei, quote-denominated
    assert_eq!(result.gas_spent, dec!(0.0003));
    assert_eq!(result.realized_profit, Some(dec!(86.9997)));
    assert_eq!(h.chain.submitted(), 2);
}

#[tokio::test]
async fn unwinds_after_leg2_reverts() {
    let h = harness().await;
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::from(996_000_000_000_000_000u128)),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    h.chain.push_step(Step::revert());
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::ZERO),
        (USDC_BASE, h.account, usd(5_085)),
    ]));

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::PartiallyReverted);
    assert_eq!(
        kinds(&result),
        vec![
            (LegKind::Leg1, LegStatus::Confirmed),
            (LegKind::Leg2, LegStatus::Reverted),
            (LegKind::Unwind, LegStatus::Confirmed),
        ]
    );
    // rich quotes the most for the held WETH
    assert_eq!(result.legs[2].exchange_id, "rich");
    assert_eq!(result.gas_spent, dec!(0.00045));
    assert_eq!(result.realized_profit, Some(dec!(84.99955)));
}

#[tokio::test]
async fn leg1_revert_fails_without_touching_the_sell_venue() {
    let h = harness().await;
    h.chain.push_step(Step::revert());

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::Failed);
    assert_eq!(kinds(&result), vec![(LegKind::Leg1, LegStatus::Reverted)]);
    assert_eq!(h.chain.submitted(), 1);
}

#[tokio::test]
async fn rejects_when_the_quote_balance_is_short() {
    let h = harness().await;
    h.chain.set_balance(USDC_BASE, h.account, usd(100));

    let outcome = h.executor.execute(h.opportunity, &h.market).await.unwrap();

    match outcome {
        ExecutionOutcome::Rejected { reason } => assert!(reason.contains("USDC"), "{}", reason),
        ExecutionOutcome::Executed(result) => panic!("executed: {:?}", result.status),
    }
    assert_eq!(h.chain.submitted(), 0);
}

#[tokio::test]
async fn rejects_above_the_gas_price_cap() {
    let h = harness().await;
    // cap is 50 gwei
    h.chain.set_gas_price(80 * ONE_GWEI);

    let outcome = h.executor.execute(h.opportunity, &h.market).await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Rejected { .. }));
    assert_eq!(h.chain.submitted(), 0);
}

#[tokio::test]
async fn approves_the_router_when_allowance_is_short() {
    let h = harness().await;
    h.chain.set_allowance(USDC_BASE, h.account, CHEAP_ROUTER, U256::ZERO);
    h.chain.push_step(Step::ok(Vec::new()));
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::from(996_000_000_000_000_000u128)),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::ZERO),
        (USDC_BASE, h.account, usd(5_087)),
    ]));

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::Success);
    assert_eq!(
        kinds(&result),
        vec![
            (LegKind::Approval, LegStatus::Confirmed),
            (LegKind::Leg1, LegStatus::Confirmed),
            (LegKind::Leg2, LegStatus::Confirmed),
        ]
    );
    assert_eq!(result.legs[0].spender, Some(CHEAP_ROUTER));
    assert_eq!(result.legs[0].token_out, USDC_BASE);
}

fn bought() -> U256 {
    U256::from(996_000_000_000_000_000u128)
}

/// Leg1 confirms with `bought()` WETH for 2000 USDC, Leg2 reverts.
fn leg1_then_leg2_revert(h: &Harness) {
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, bought()),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    h.chain.push_step(Step::revert());
}

#[tokio::test]
async fn records_an_unwind_attempt_when_no_venue_quotes() {
    let h = harness().await;
    leg1_then_leg2_revert(&h);
    // pools stop answering once Leg1 and Leg2 were sent
    h.chain.fail_quotes_after(2);

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::PartiallyReverted);
    assert_eq!(
        kinds(&result),
        vec![
            (LegKind::Leg1, LegStatus::Confirmed),
            (LegKind::Leg2, LegStatus::Reverted),
            (LegKind::Unwind, LegStatus::SubmitFailed),
            (LegKind::Unwind, LegStatus::SubmitFailed),
        ]
    );
    let unwind = &result.legs[2];
    assert_eq!(unwind.amount_in, bought());
    assert!(unwind.tx_hash.is_none());
    assert!(unwind.error.as_deref().unwrap_or_default().contains("no venue"));
    assert_eq!(h.chain.submitted(), 2);
}

#[tokio::test]
async fn records_an_unwind_attempt_when_its_approval_fails() {
    let h = harness_with(|config| config.execution.unwind_attempts = 1).await;
    h.chain.set_allowance(WETH_BASE, h.account, RICH_ROUTER, U256::ZERO);
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, bought()),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    // Leg2's approval, then the unwind's approval
    h.chain.push_step(Step::revert());
    h.chain.push_step(Step::revert());

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::PartiallyReverted);
    assert_eq!(
        kinds(&result),
        vec![
            (LegKind::Leg1, LegStatus::Confirmed),
            (LegKind::Approval, LegStatus::Reverted),
            (LegKind::Approval, LegStatus::Reverted),
            (LegKind::Unwind, LegStatus::SubmitFailed),
        ]
    );
    assert_eq!(result.legs[3].exchange_id, "rich");
    assert!(result.legs[3].error.as_deref().unwrap_or_default().contains("approval failed"));
}

#[tokio::test]
async fn leg1_timeout_fails_the_trade() {
    let h = harness_with(|config| config.execution.confirmation_timeout_secs = 1).await;
    h.chain.push_step(Step::unmined());

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::Failed);
    assert_eq!(kinds(&result), vec![(LegKind::Leg1, LegStatus::TimedOut)]);
    assert!(result.legs[0].tx_hash.is_some());
    assert_eq!(h.chain.submitted(), 1);
}

#[tokio::test]
async fn leg2_timeout_unwinds_the_position() {
    let h = harness_with(|config| config.execution.confirmation_timeout_secs = 1).await;
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, bought()),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    h.chain.push_step(Step::unmined());
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::ZERO),
        (USDC_BASE, h.account, usd(5_085)),
    ]));

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::PartiallyReverted);
    assert_eq!(
        kinds(&result),
        vec![
            (LegKind::Leg1, LegStatus::Confirmed),
            (LegKind::Leg2, LegStatus::TimedOut),
            (LegKind::Unwind, LegStatus::Confirmed),
        ]
    );
    // the unconfirmed Leg2 paid nothing
    assert_eq!(result.gas_spent, dec!(0.0003));
}

#[tokio::test]
async fn failed_unwind_keeps_every_attempt() {
    let h = harness().await;
    leg1_then_leg2_revert(&h);
    h.chain.push_step(Step::revert());
    h.chain.push_step(Step::revert());

    let result = executed(h.executor.execute(h.opportunity, &h.market).await.unwrap());

    assert_eq!(result.status, TradeStatus::PartiallyReverted);
    assert_eq!(
        kinds(&result),
        vec![
            (LegKind::Leg1, LegStatus::Confirmed),
            (LegKind::Leg2, LegStatus::Reverted),
            (LegKind::Unwind, LegStatus::Reverted),
            (LegKind::Unwind, LegStatus::Reverted),
        ]
    );
    // the WETH is still held and valued into the result
    assert!(result.realized_profit.is_some());
    assert_eq!(h.chain.submitted(), 4);
}

#[tokio::test]
async fn concurrent_trades_on_one_wallet_do_not_interleave() {
    let h = harness().await;
    let other_market = h.second_market();
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, bought()),
        (USDC_BASE, h.account, usd(3_000)),
    ]));
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::ZERO),
        (USDC_BASE, h.account, usd(5_087)),
    ]));
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, bought()),
        (USDC_BASE, h.account, usd(3_087)),
    ]));
    h.chain.push_step(Step::ok(vec![
        (WETH_BASE, h.account, U256::ZERO),
        (USDC_BASE, h.account, usd(5_174)),
    ]));

    let (first, second) = tokio::join!(
        h.executor.execute(h.opportunity.clone(), &h.market),
        h.executor.execute(h.opportunity.clone(), &other_market),
    );

    for result in [executed(first.unwrap()), executed(second.unwrap())] {
        assert_eq!(result.status, TradeStatus::Success);
        assert_eq!(result.legs[1].amount_in, bought());
        assert_eq!(result.realized_profit, Some(dec!(86.9997)));
    }
    assert_eq!(h.chain.submitted(), 4);
}
