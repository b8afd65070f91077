//! Logging setup and configuration

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Console output plus hourly log files under `<output_dir>/logs`. `RUST_LOG`
/// overrides the default `info` level.
pub fn setup_logging(output_dir: &Path) -> Result<Arc<LoggingGuard>> {
    let file_appender = tracing_appender::rolling::hourly(output_dir.join("logs"), "dex-arb-engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::new("info"),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_level(true)
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(false)
                .compact()
        )
        .with(filter)
        .try_init()?;

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}

pub fn setup_output_directories(output_dir: &Path) -> Result<()> {
    use std::fs;

    fs::create_dir_all(output_dir.join("logs"))?;
    fs::create_dir_all(output_dir.join("opportunities"))?;
    fs::create_dir_all(output_dir.join("trades"))?;

    Ok(())
}
