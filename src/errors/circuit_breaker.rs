//! Circuit breaker guarding a market's polling loop

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};
use super::BotError;

pub struct CircuitBreaker {
    pub name: String,
    pub consecutive_errors: Arc<RwLock<u32>>,
    pub is_open: Arc<RwLock<bool>>,
    pub last_error_time: Arc<RwLock<Option<Instant>>>,
    pub max_consecutive_errors: u32,
    pub cooldown_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, max_consecutive_errors: u32, cooldown_secs: u64) -> Self {
        Self {
            name: name.into(),
            consecutive_errors: Arc::new(RwLock::new(0)),
            is_open: Arc::new(RwLock::new(false)),
            last_error_time: Arc::new(RwLock::new(None)),
            max_consecutive_errors: max_consecutive_errors.max(1),
            cooldown_duration: Duration::from_secs(cooldown_secs),
        }
    }

    pub async fn record_success(&self) {
        *self.consecutive_errors.write().await = 0;
        *self.is_open.write().await = false;
    }

    /// Returns true when this error tripped the breaker.
    pub async fn record_error(&self) -> bool {
        let mut errors = self.consecutive_errors.write().await;
        *errors += 1;

        if *errors >= self.max_consecutive_errors && !*self.is_open.read().await {
            *self.is_open.write().await = true;
            *self.last_error_time.write().await = Some(Instant::now());
            error!(breaker = %self.name, "Circuit breaker OPEN after {} consecutive errors", *errors);
            return true;
        }
        false
    }

    pub async fn can_proceed(&self) -> bool {
        let is_open = *self.is_open.read().await;
        if !is_open {
            return true;
        }

        if let Some(last_error) = *self.last_error_time.read().await {
            if last_error.elapsed() > self.cooldown_duration {
                info!(breaker = %self.name, "Circuit breaker cooldown complete, resetting");
                *self.is_open.write().await = false;
                *self.consecutive_errors.write().await = 0;
                return true;
            }
        }
        false
    }

    pub async fn check(&self) -> Result<(), BotError> {
        if self.can_proceed().await {
            return Ok(());
        }
        let elapsed = self
            .last_error_time
            .read()
            .await
            .map(|t| t.elapsed())
            .unwrap_or_default();
        Err(BotError::CircuitBreakerOpen {
            reason: format!("{} paused after repeated failures", self.name),
            cooldown_remaining: self.cooldown_duration.saturating_sub(elapsed),
        })
    }
}
