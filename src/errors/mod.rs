//! Error handling, circuit breaking and alert throttling

pub mod bot_error;
pub mod alerts;
pub mod circuit_breaker;

pub use bot_error::*;
pub use alerts::*;
pub use circuit_breaker::*;
