//! Configuration management for the arbitrage engine
//!
//! The configuration is built once at start-up and handed to each component;
//! nothing reads the environment after that.

pub mod profile;
pub mod markets;
pub mod settings;

pub use profile::*;
pub use markets::*;
pub use settings::*;
