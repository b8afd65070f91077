//! Validation of quotes, liquidity and opportunities

pub mod price;
pub mod liquidity;
pub mod opportunity;

pub use price::*;
pub use liquidity::*;
pub use opportunity::*;
