//! Arbitrage opportunity storage

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use tracing::info;
use crate::{storage::append_jsonl, types::Opportunity};

pub fn save_opportunity(output_dir: &Path, opp: &Opportunity) -> Result<()> {
    let filename = output_dir
        .join("opportunities")
        .join(format!("arbitrage_{}.jsonl", Utc::now().format("%Y-%m-%d")));
    append_jsonl(&filename, opp)?;

    info!(
        opportunity_id = %opp.id,
        pair = %opp.pair,
        profit = %opp.net_profit.round_dp(4),
        confidence = %opp.confidence_score.round_dp(3),
        "Saved arbitrage opportunity"
    );

    Ok(())
}
