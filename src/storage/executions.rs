//! Trade result storage

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use tracing::info;
use crate::{storage::append_jsonl, types::TradeResult};

pub fn save_trade_result(output_dir: &Path, result: &TradeResult) -> Result<()> {
    let filename = output_dir
        .join("trades")
        .join(format!("trades_{}.jsonl", Utc::now().format("%Y-%m-%d")));
    append_jsonl(&filename, result)?;

    info!(
        trade_id = %result.id,
        status = ?result.status,
        realized_profit = ?result.realized_profit,
        "Saved trade result"
    );

    Ok(())
}
