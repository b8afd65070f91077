//! Price plausibility checks

use rust_decimal::prelude::*;
use crate::{
    errors::{BotError, BotResult},
    types::QuoteResult,
};

/// Accepted price range for one market, either side optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceBand {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

pub fn validate_price(price: Decimal, source: &str, band: PriceBand) -> BotResult<()> {
    if price <= Decimal::ZERO {
        return Err(BotError::PriceValidation {
            exchange: source.to_string(),
            price,
            reason: "zero or negative".to_string(),
        });
    }

    let below = band.min.is_some_and(|min| price < min);
    let above = band.max.is_some_and(|max| price > max);
    if below || above {
        return Err(BotError::PriceValidation {
            exchange: source.to_string(),
            price,
            reason: format!(
                "outside the accepted range {}..{}",
                band.min.map(|v| v.to_string()).unwrap_or_default(),
                band.max.map(|v| v.to_string()).unwrap_or_default()
            ),
        });
    }

    Ok(())
}

/// Live quotes whose price sits inside `band`; the rest are returned as reasons.
pub fn usable_quotes(quotes: Vec<QuoteResult>, band: PriceBand) -> (Vec<QuoteResult>, Vec<String>) {
    let mut usable = Vec::with_capacity(quotes.len());
    let mut rejected = Vec::new();
    for quote in quotes {
        if let Some(error) = &quote.raw_error {
            rejected.push(format!("{}: {}", quote.exchange_id, error));
        } else if !quote.is_live() {
            rejected.push(format!("{}: no usable price or liquidity", quote.exchange_id));
        } else if let Err(e) = validate_price(quote.price, &quote.exchange_id, band) {
            rejected.push(e.to_string());
        } else {
            usable.push(quote);
        }
    }
    (usable, rejected)
}
