//! Display and printing utilities

use tracing::{error, info, warn};
use crate::{
    bot::SessionStats,
    types::{LegKind, LegStatus, Opportunity, PairStatistics, TradeResult, TradeStatus},
};

pub fn print_session_stats(stats: &SessionStats, open_breakers: &[String]) {
    let runtime = stats.runtime_minutes();

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 ARBITRAGE:");
    info!("     Opportunities detected: {}", stats.opportunities);
    info!("     Total potential profit: {:.2}", stats.total_potential_profit);

    info!("   🚀 TRADE EXECUTION:");
    info!("     Rejected at validation: {}", stats.rejected);
    info!("     Executed: {}", stats.total_trades());
    info!("     Successful: {}", stats.successful_trades);
    info!("     Partially reverted: {}", stats.partial_trades);
    info!("     Failed: {}", stats.failed_trades);
    info!("     Success rate: {:.1}%",
        if stats.total_trades() > 0 {
            (stats.successful_trades as f64 / stats.total_trades() as f64) * 100.0
        } else {
            0.0
        }
    );
    info!("     Realized profit: {:.4}", stats.realized_profit);
    info!("     Gas spent: {:.4}", stats.gas_spent);

    info!("   ⚙️  SYSTEM:");
    if open_breakers.is_empty() {
        info!("     Circuit breakers: all CLOSED");
    } else {
        info!("     Circuit breakers OPEN: {}", open_breakers.join(", "));
    }

    if !stats.error_counts.is_empty() {
        info!("     Error summary:");
        let mut counts: Vec<_> = stats.error_counts.iter().collect();
        counts.sort();
        for (error_type, count) in counts {
            info!("       {}: {}", error_type, count);
        }
    }

    info!("");
}

pub fn print_arbitrage_opportunity(opportunity: &Opportunity, statistics: &PairStatistics) {
    warn!("\n🎯 ARBITRAGE OPPORTUNITY #{}", opportunity.id);
    warn!("📍 Pair: {}", opportunity.pair);
    warn!("📋 Strategy: buy on {} → sell on {}", opportunity.buy_exchange, opportunity.sell_exchange);
    warn!("💰 Profit Analysis:");
    warn!("   Buy Price:  {:.6}", opportunity.buy_price);
    warn!("   Sell Price: {:.6}", opportunity.sell_price);
    warn!("   Spread: {:.4}%", opportunity.spread_percent);
    warn!("   Trade Size: {} {}", opportunity.trade_size, opportunity.pair.base().symbol);
    warn!("   Gas Cost: {:.4}", opportunity.estimated_gas_cost);
    warn!("   Net Profit: {:.4} {}", opportunity.net_profit, opportunity.pair.quote().symbol);
    warn!("   ROI: {:.3}%", opportunity.roi_pct());
    warn!("📊 Max Impact: {:.3}% | Volatility: {:.3}% ({:?}) | Confidence: {:.2}",
        opportunity.max_price_impact_pct,
        statistics.volatility_pct,
        statistics.trend,
        opportunity.confidence_score
    );
}

pub fn print_trade_result(result: &TradeResult) {
    match result.status {
        TradeStatus::Success => {
            warn!("\n✅ TRADE #{} SETTLED", result.id);
        }
        TradeStatus::PartiallyReverted => {
            error!("\n⚠️  TRADE #{} PARTIALLY REVERTED", result.id);
        }
        TradeStatus::Failed => {
            error!("\n❌ TRADE #{} FAILED", result.id);
        }
    }
    warn!("📍 {}: buy on {} → sell on {}", result.pair, result.buy_exchange, result.sell_exchange);
    for leg in &result.legs {
        let marker = match leg.status {
            LegStatus::Confirmed => "✓",
            LegStatus::Reverted => "✗",
            LegStatus::TimedOut => "⏱",
            LegStatus::SubmitFailed => "–",
        };
        let tx = leg.tx_hash.map(|h| h.to_string()).unwrap_or_else(|| "not submitted".to_string());
        warn!("   {} {:?} on {}: {}", marker, leg.kind, leg.exchange_id, tx);
        if let Some(error) = &leg.error {
            warn!("       {}", error);
        }
    }
    let unwinds = result.legs_of(LegKind::Unwind).count();
    if unwinds > 0 {
        warn!("   Unwind attempts: {}", unwinds);
    }
    warn!("   Expected Profit: {:.4}", result.expected_profit);
    match result.realized_profit {
        Some(profit) => warn!("   Realized Profit: {:.4}", profit),
        None => warn!("   Realized Profit: unknown"),
    }
    warn!("   Gas Spent: {:.4} ({:.6} native)", result.gas_spent, result.gas_spent_native);
    warn!("   Duration: {}ms", (result.finished_at - result.started_at).num_milliseconds());
}
