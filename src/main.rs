//! DEX Arbitrage Engine - Main Entry Point

use anyhow::Result;
use dex_arb_engine::{
    bot::Bot,
    execution::{TradeExecutor, TxSubmitter},
    network::{ChainClient, RpcConnectionManager},
    utils, Config,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Arc::new(Config::load()?);
    let output_dir = Path::new(&config.output_dir);

    utils::setup_output_directories(output_dir)?;
    let _logging_guard = utils::setup_logging(output_dir)?;

    info!("🔁 DEX Arbitrage Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Profile: {}", config.profile);
    info!("   Exchanges: {}", config.exchanges.len());
    info!("   Markets: {}", config.markets.len());
    info!("   Min spread: {}%", config.detection.min_spread_pct);
    info!("   Min profit: {}% / {}", config.detection.min_profit_pct, config.detection.min_profit_abs);
    info!("   Max price impact: {}%", config.detection.max_price_impact_pct);
    info!("   Poll interval: {}ms", config.poll_interval_ms);

    let manager = Arc::new(RpcConnectionManager::from_settings(&config.rpc)?);
    let chain: Arc<dyn ChainClient> = manager.clone();
    info!("   RPC endpoints: {}", manager.endpoint_count());

    info!("🔗 Connecting to {}...", manager.current_endpoint().await);
    let chain_id = chain.chain_id().await?;
    let block = chain.block_number().await?;
    info!("✅ Connected: chain id {}, block {}", chain_id, block);

    let executor = match (config.execution.enabled, &config.execution.private_key) {
        (true, Some(key)) => {
            let submitter = TxSubmitter::from_private_key(Arc::clone(&chain), key, chain_id, &config.execution)?;
            info!("   Trade Execution: ENABLED as {}", submitter.account());
            info!("   Max Gas Price: {} gwei", config.execution.max_gas_price_gwei);
            info!("   Slippage Tolerance: {} bps", config.execution.max_slippage_bps);
            Some(Arc::new(TradeExecutor::new(
                Arc::clone(&chain),
                Arc::new(submitter),
                config.execution.clone(),
            )))
        }
        (true, None) => {
            warn!("   Trade execution requested but no private key configured; running detection only");
            None
        }
        (false, _) => {
            info!("   Trade Execution: disabled (detection only)");
            None
        }
    };

    let bot = Bot::new(Arc::clone(&config), chain, executor)?;

    let (trigger, shutdown) = watch::channel(false);
    let trigger = Arc::new(trigger);
    let ctrl_c_trigger = Arc::clone(&trigger);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after in-flight work completes");
                ctrl_c_trigger.send_replace(true);
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    match bot.run(shutdown, trigger).await {
        Ok(stats) => {
            info!("Stopped after {} minutes", stats.runtime_minutes());
            Ok(())
        }
        Err(e) => {
            error!("Engine stopped on fatal error: {}", e);
            Err(e.into())
        }
    }
}
