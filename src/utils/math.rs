//! Fixed-point conversions between on-chain integers and decimal amounts

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;
use crate::errors::{BotError, BotResult};

const BPS_DENOMINATOR: u64 = 10_000;

/// Largest decimal exponent a `Decimal` can hold.
pub const MAX_DECIMALS: u8 = 28;

/// 10^`exp`. Errors instead of overflowing past `MAX_DECIMALS`.
pub fn pow10(exp: u8) -> BotResult<Decimal> {
    match exp {
        0 => Ok(dec!(1)),
        6 => Ok(dec!(1_000_000)),
        18 => Ok(dec!(1_000_000_000_000_000_000)),
        _ => (0..exp).try_fold(dec!(1), |acc, _| {
            acc.checked_mul(dec!(10))
                .ok_or_else(|| BotError::Config(format!("10^{} does not fit a decimal", exp)))
        }),
    }
}

/// Base units to a human amount.
pub fn from_base_units(value: U256, decimals: u8) -> BotResult<Decimal> {
    let raw = Decimal::from_str(&value.to_string())
        .map_err(|e| BotError::parsing(format!("{} does not fit a decimal", value), e))?;
    Ok(raw / pow10(decimals)?)
}

/// Human amount to base units, rounding down. Used for amounts we spend.
pub fn to_base_units_floor(amount: Decimal, decimals: u8) -> BotResult<U256> {
    scale_to_units(amount, decimals, Decimal::floor)
}

/// Human amount to base units, rounding up. Used for amounts we require back.
pub fn to_base_units_ceil(amount: Decimal, decimals: u8) -> BotResult<U256> {
    scale_to_units(amount, decimals, Decimal::ceil)
}

fn scale_to_units(amount: Decimal, decimals: u8, round: fn(&Decimal) -> Decimal) -> BotResult<U256> {
    if amount.is_sign_negative() {
        return Err(BotError::Config(format!("negative amount {}", amount)));
    }
    let scaled = amount
        .checked_mul(pow10(decimals)?)
        .ok_or_else(|| BotError::Config(format!("{} overflows at {} decimals", amount, decimals)))?;
    round(&scaled)
        .to_u128()
        .map(U256::from)
        .ok_or_else(|| BotError::Config(format!("{} is not representable in base units", amount)))
}

/// Minimum acceptable output for `expected` under `slippage_bps`, rounded up.
pub fn min_out_after_slippage(expected: U256, slippage_bps: u32) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps as u64);
    let numerator = expected.saturating_mul(U256::from(keep));
    let denominator = U256::from(BPS_DENOMINATOR);
    numerator.div_ceil(denominator)
}

/// Output per unit of input, both scaled by their decimals.
pub fn rate(amount_in: U256, decimals_in: u8, amount_out: U256, decimals_out: u8) -> BotResult<Decimal> {
    let amount_in = from_base_units(amount_in, decimals_in)?;
    if amount_in.is_zero() {
        return Err(BotError::Config("rate of a zero input".to_string()));
    }
    Ok(from_base_units(amount_out, decimals_out)? / amount_in)
}
