//! Control loop: one polling task per market, a recorder task, and
//! cooperative shutdown

pub mod recorder;
pub mod stats;

pub use recorder::*;
pub use stats::*;

use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use crate::{
    arbitrage::{MarketContext, OpportunityDetector},
    config::Config,
    errors::{AlertDecision, AlertThrottle, BotError, BotResult, CircuitBreaker},
    execution::TradeExecutor,
    network::ChainClient,
    pools::build_adapters,
    types::{ExecutionOutcome, LegKind, Opportunity, PairStatistics, TradeResult},
    volatility::PriceHistoryStore,
};

const EVENT_BUFFER: usize = 256;

/// Everything the recorder is told about.
#[derive(Debug)]
pub enum BotEvent {
    Opportunity {
        opportunity: Opportunity,
        statistics: PairStatistics,
    },
    Rejected {
        opportunity_id: String,
        reason: String,
    },
    Trade(TradeResult),
    CycleError {
        market: String,
        kind: &'static str,
    },
    Fatal(String),
}

pub struct Bot {
    config: Arc<Config>,
    detector: Arc<OpportunityDetector>,
    executor: Option<Arc<TradeExecutor>>,
    markets: Vec<Arc<MarketContext>>,
    alerts: Arc<AlertThrottle>,
}

/// Shared pieces handed to each market task.
struct MarketTask {
    market: Arc<MarketContext>,
    detector: Arc<OpportunityDetector>,
    executor: Option<Arc<TradeExecutor>>,
    breaker: Arc<CircuitBreaker>,
    alerts: Arc<AlertThrottle>,
    events: mpsc::Sender<BotEvent>,
    interval: Duration,
}

impl Bot {
    /// Resolve adapters and markets. `executor` is `None` in dry-run mode.
    pub fn new(config: Arc<Config>, chain: Arc<dyn ChainClient>, executor: Option<Arc<TradeExecutor>>) -> BotResult<Self> {
        let adapters = build_adapters(&config.exchanges, Arc::clone(&chain));
        let markets = config
            .markets
            .iter()
            .map(|market| MarketContext::resolve(market, &config.detection, &adapters).map(Arc::new))
            .collect::<BotResult<Vec<_>>>()?;

        let history = Arc::new(PriceHistoryStore::new(config.history_window()));
        let detector = Arc::new(OpportunityDetector::new(chain, history, config.detection.clone()));
        let alerts = Arc::new(AlertThrottle::new(Duration::from_secs(config.alert_interval_secs)));

        Ok(Self {
            config,
            detector,
            executor,
            markets,
            alerts,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.executor.is_none()
    }

    /// Run until `shutdown` flips to true or a fatal error occurs. Returns the
    /// session statistics, or the fatal error after the recorder has flushed.
    pub async fn run(self, shutdown: watch::Receiver<bool>, trigger: Arc<watch::Sender<bool>>) -> BotResult<SessionStats> {
        let (events, event_rx) = mpsc::channel(EVENT_BUFFER);

        let breakers: Vec<Arc<CircuitBreaker>> = self
            .markets
            .iter()
            .map(|market| {
                Arc::new(CircuitBreaker::new(
                    market.pair.symbol(),
                    self.config.max_consecutive_errors,
                    self.config.circuit_breaker_cooldown_secs,
                ))
            })
            .collect();

        let recorder = tokio::spawn(record_events(
            event_rx,
            self.config.output_dir.clone().into(),
            breakers.clone(),
        ));

        info!(
            markets = self.markets.len(),
            dry_run = self.is_dry_run(),
            "Starting market loops"
        );

        let handles: Vec<_> = self
            .markets
            .iter()
            .zip(breakers)
            .map(|(market, breaker)| {
                let task = MarketTask {
                    market: Arc::clone(market),
                    detector: Arc::clone(&self.detector),
                    executor: self.executor.clone(),
                    breaker,
                    alerts: Arc::clone(&self.alerts),
                    events: events.clone(),
                    interval: self.config.poll_interval(),
                };
                tokio::spawn(run_market(task, shutdown.clone(), Arc::clone(&trigger)))
            })
            .collect();
        drop(events);

        let mut fatal = None;
        for outcome in join_all(handles).await {
            match outcome {
                Ok(Some(e)) if fatal.is_none() => fatal = Some(e),
                Ok(_) => {}
                Err(e) => error!("Market task panicked: {}", e),
            }
        }

        let stats = recorder
            .await
            .map_err(|e| BotError::Config(format!("recorder task failed: {}", e)))?;
        match fatal {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

/// Poll one market until shutdown. Returns the fatal error that stopped it, if any.
async fn run_market(
    task: MarketTask,
    mut shutdown: watch::Receiver<bool>,
    trigger: Arc<watch::Sender<bool>>,
) -> Option<BotError> {
    let pair = task.market.pair.clone();
    let mut ticker = tokio::time::interval(task.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut alerting: Option<String> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        if let Err(e) = task.breaker.check().await {
            debug!(market = %pair, "{}", e);
            continue;
        }

        // detection is abandoned on shutdown, execution below is not
        let detected = tokio::select! {
            result = task.detector.detect(&task.market) => result,
            _ = shutdown.changed() => break,
        };

        let opportunity = match detected {
            Ok(Some(opportunity)) => opportunity,
            Ok(None) => {
                recovered(&task, &mut alerting).await;
                continue;
            }
            Err(e) if e.is_fatal() => {
                error!(market = %pair, "Fatal error, shutting down: {}", e);
                let _ = task.events.send(BotEvent::Fatal(e.to_string())).await;
                trigger.send_replace(true);
                return Some(e);
            }
            Err(e) => {
                alerting = Some(report_cycle_error(&task, &e).await);
                continue;
            }
        };
        recovered(&task, &mut alerting).await;

        let statistics = task.detector.history().statistics(&pair).await;
        let _ = task
            .events
            .send(BotEvent::Opportunity {
                opportunity: opportunity.clone(),
                statistics,
            })
            .await;

        let Some(executor) = &task.executor else {
            continue;
        };
        let opportunity_id = opportunity.id.clone();
        let notional = opportunity.notional();
        match executor.execute(opportunity, &task.market).await {
            Ok(ExecutionOutcome::Rejected { reason }) => {
                let _ = task.events.send(BotEvent::Rejected { opportunity_id, reason }).await;
            }
            Ok(ExecutionOutcome::Executed(result)) => {
                if result.legs_of(LegKind::Leg1).any(|leg| leg.is_confirmed()) {
                    task.detector
                        .history()
                        .record_volume(&pair, notional, result.finished_at)
                        .await;
                }
                let _ = task.events.send(BotEvent::Trade(result)).await;
            }
            Err(e) if e.is_fatal() => {
                error!(market = %pair, "Fatal error during execution, shutting down: {}", e);
                let _ = task.events.send(BotEvent::Fatal(e.to_string())).await;
                trigger.send_replace(true);
                return Some(e);
            }
            Err(e) => alerting = Some(report_cycle_error(&task, &e).await),
        }
    }

    info!(market = %pair, "Market loop stopped");
    None
}

async fn recovered(task: &MarketTask, alerting: &mut Option<String>) {
    task.breaker.record_success().await;
    if let Some(key) = alerting.take() {
        task.alerts.clear(&key).await;
        info!(market = %task.market.pair, "Market recovered");
    }
}

/// Log (throttled), count against the breaker and report. Returns the alert key.
async fn report_cycle_error(task: &MarketTask, error: &BotError) -> String {
    let market = task.market.pair.symbol();
    let key = format!("{}:{}", market, error.kind());
    match task.alerts.check(&key).await {
        AlertDecision::Emit { suppressed: 0 } => warn!(market = %market, "Cycle failed: {}", error),
        AlertDecision::Emit { suppressed } => {
            warn!(market = %market, "Cycle failed: {} ({} similar suppressed)", error, suppressed)
        }
        AlertDecision::Suppress => {}
    }
    task.breaker.record_error().await;
    let _ = task
        .events
        .send(BotEvent::CycleError {
            market,
            kind: error.kind(),
        })
        .await;
    key
}
