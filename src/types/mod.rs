//! Core data types and structures

pub mod addresses;
pub mod pair;
pub mod quote;
pub mod opportunity;
pub mod execution;
pub mod volatility;
pub mod validation;

pub use addresses::*;
pub use pair::*;
pub use quote::*;
pub use opportunity::*;
pub use execution::*;
pub use volatility::*;
pub use validation::*;
