//! DEX Arbitrage Engine - cross-venue arbitrage for EVM chains
//!
//! Polls several on-chain exchanges for the same trading pair, flags price
//! discrepancies that survive gas and price impact, and can execute them as
//! a two-leg buy/sell with unwind on partial failure.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod pools;
pub mod arbitrage;
pub mod execution;
pub mod volatility;
pub mod validation;
pub mod utils;
pub mod storage;
pub mod bot;

// Re-export commonly used items
pub use config::Config;
pub use errors::{BotError, BotResult};
pub use network::ConcreteProvider;
pub use types::*;
