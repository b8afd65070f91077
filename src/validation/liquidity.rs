//! Liquidity validation from measured price impact

use crate::{
    errors::{BotError, BotResult},
    types::PriceImpact,
};

pub fn validate_liquidity(impact: &PriceImpact, limit_pct: rust_decimal::Decimal) -> BotResult<()> {
    if !impact.sufficient_liquidity {
        return Err(BotError::InsufficientLiquidity {
            pool: impact.exchange_id.clone(),
            details: format!(
                "price impact {:.3}% for {} base units (limit {}%)",
                impact.max_impact_pct, impact.trade_size, limit_pct
            ),
        });
    }
    Ok(())
}
