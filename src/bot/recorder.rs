//! Recorder task: persists events, keeps session statistics, prints reports

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use crate::{
    bot::{BotEvent, SessionStats},
    errors::CircuitBreaker,
    storage::{save_opportunity, save_trade_result},
    utils::{print_arbitrage_opportunity, print_session_stats, print_trade_result},
};

const REPORT_INTERVAL: Duration = Duration::from_secs(300);

/// Drain `events` until every sender is gone, then print final statistics.
pub async fn record_events(
    mut events: mpsc::Receiver<BotEvent>,
    output_dir: PathBuf,
    breakers: Vec<Arc<CircuitBreaker>>,
) -> SessionStats {
    let mut stats = SessionStats::new();
    let mut report = tokio::time::interval(REPORT_INTERVAL);
    report.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if handle_event(&mut stats, &output_dir, event) {
                    print_session_stats(&stats, &open_breakers(&breakers).await);
                }
            }
            _ = report.tick() => {
                print_session_stats(&stats, &open_breakers(&breakers).await);
            }
        }
    }

    info!("\n🛑 Shutting down gracefully...");
    print_session_stats(&stats, &open_breakers(&breakers).await);
    stats
}

/// Returns true when a periodic report is due.
fn handle_event(stats: &mut SessionStats, output_dir: &Path, event: BotEvent) -> bool {
    match event {
        BotEvent::Opportunity { opportunity, statistics } => {
            stats.record_opportunity(&opportunity);
            print_arbitrage_opportunity(&opportunity, &statistics);
            if let Err(e) = save_opportunity(output_dir, &opportunity) {
                error!("Failed to save arbitrage opportunity: {}", e);
                stats.record_error("save_opportunity");
            }
            stats.should_print()
        }
        BotEvent::Rejected { opportunity_id, reason } => {
            info!(opportunity_id = %opportunity_id, "Execution declined: {}", reason);
            stats.record_rejection();
            false
        }
        BotEvent::Trade(result) => {
            stats.record_trade(&result);
            print_trade_result(&result);
            if let Err(e) = save_trade_result(output_dir, &result) {
                error!("Failed to save trade result: {}", e);
                stats.record_error("save_trade");
            }
            stats.should_print()
        }
        BotEvent::CycleError { kind, .. } => {
            stats.record_error(kind);
            false
        }
        BotEvent::Fatal(message) => {
            error!("Engine stopping: {}", message);
            stats.record_error("fatal");
            false
        }
    }
}

async fn open_breakers(breakers: &[Arc<CircuitBreaker>]) -> Vec<String> {
    let mut open = Vec::new();
    for breaker in breakers {
        if *breaker.is_open.read().await {
            open.push(breaker.name.clone());
        }
    }
    open
}

