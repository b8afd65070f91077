//! Price history and volatility

pub mod calculator;
pub mod history;

pub use calculator::*;
pub use history::*;
