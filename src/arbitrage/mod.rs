//! Spread, cost and confidence arithmetic plus the per-market detector

pub mod calculator;
pub mod detector;

pub use calculator::*;
pub use detector::*;
