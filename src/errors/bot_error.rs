//! Custom error types for the engine

use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// Transient transport failure. Retried by the connection manager.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("All RPC endpoints exhausted after {attempts} attempts: {last_error}")]
    EndpointsExhausted {
        attempts: u32,
        last_error: String,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Price validation failed: {exchange} price {price} is invalid - {reason}")]
    PriceValidation {
        exchange: String,
        price: Decimal,
        reason: String,
    },

    #[error("Insufficient liquidity: {pool} - {details}")]
    InsufficientLiquidity {
        pool: String,
        details: String,
    },

    #[error("Insufficient balance of {token}: required {required}, available {available}")]
    InsufficientBalance {
        token: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Data parsing error: {context}")]
    DataParsing {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Circuit breaker active: {reason}")]
    CircuitBreakerOpen {
        reason: String,
        cooldown_remaining: Duration,
    },
}

pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    pub fn network(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        BotError::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn contract(contract: Address, message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        BotError::Contract {
            contract,
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn parsing(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        BotError::DataParsing {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Worth retrying against the same or another endpoint.
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::Network { .. } | BotError::Timeout { .. })
    }

    /// The process cannot make progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::EndpointsExhausted { .. })
    }

    /// Short stable label used for error accounting and alert throttling.
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Network { .. } => "network",
            BotError::EndpointsExhausted { .. } => "endpoints_exhausted",
            BotError::Contract { .. } => "contract",
            BotError::PriceValidation { .. } => "invalid_price",
            BotError::InsufficientLiquidity { .. } => "low_liquidity",
            BotError::InsufficientBalance { .. } => "low_balance",
            BotError::DataParsing { .. } => "parse_error",
            BotError::Timeout { .. } => "timeout",
            BotError::Signing(_) => "signing",
            BotError::Config(_) => "config",
            BotError::CircuitBreakerOpen { .. } => "circuit_breaker",
        }
    }
}
