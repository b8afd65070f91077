//! Retry policy with exponential backoff and transport error classification

use alloy::transports::{RpcError, TransportError};
use std::time::Duration;
use crate::errors::BotError;

/// JSON-RPC error codes that signal a busy node rather than a bad request.
const RATE_LIMIT_CODES: &[i64] = &[429, -32005, -32029];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Passes over the endpoint list before giving up.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    /// Randomize each delay by up to ±5%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests and read paths that prefer failing fast.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            exponential_base: 1.0,
            jitter: false,
        }
    }

    pub fn total_attempts(&self, endpoints: usize) -> u32 {
        self.max_retries.max(1).saturating_mul(endpoints.max(1) as u32)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let mut delay = (self.initial_delay_ms as f64 * self.exponential_base.powi(exponent))
            .min(self.max_delay_ms as f64);
        if self.jitter && delay > 0.0 {
            delay += delay * 0.1 * (rand::random::<f64>() - 0.5);
        }
        Duration::from_millis(delay.max(0.0) as u64)
    }
}

/// Map an alloy transport error onto the engine's taxonomy: connection
/// problems and busy nodes are transient, everything the node answered
/// deliberately is semantic.
pub fn classify_transport_error(error: TransportError, context: &str) -> BotError {
    match &error {
        RpcError::Transport(_) | RpcError::NullResp => BotError::network(
            format!("{} failed", context),
            anyhow::Error::new(error),
        ),
        RpcError::ErrorResp(payload) if RATE_LIMIT_CODES.contains(&payload.code) => BotError::network(
            format!("{} rate limited", context),
            anyhow::Error::new(error),
        ),
        RpcError::ErrorResp(payload) => BotError::DataParsing {
            context: format!("{} rejected by node (code {}): {}", context, payload.code, payload.message),
            source: anyhow::Error::new(error),
        },
        _ => BotError::parsing(format!("{} returned an unusable response", context), anyhow::Error::new(error)),
    }
}
