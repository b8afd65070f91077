//! Rate limiting for repeated error alerts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// Log it. Carries the number of identical alerts swallowed since the last one.
    Emit { suppressed: u32 },
    Suppress,
}

struct AlertState {
    last_emitted: Instant,
    suppressed: u32,
}

/// Lets one alert per key through every `min_interval`.
pub struct AlertThrottle {
    min_interval: Duration,
    states: Arc<RwLock<HashMap<String, AlertState>>>,
}

impl AlertThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn check(&self, key: &str) -> AlertDecision {
        let mut states = self.states.write().await;
        let now = Instant::now();

        match states.get_mut(key) {
            Some(state) if now.duration_since(state.last_emitted) < self.min_interval => {
                state.suppressed += 1;
                AlertDecision::Suppress
            }
            Some(state) => {
                let suppressed = state.suppressed;
                state.last_emitted = now;
                state.suppressed = 0;
                AlertDecision::Emit { suppressed }
            }
            None => {
                states.insert(key.to_string(), AlertState { last_emitted: now, suppressed: 0 });
                AlertDecision::Emit { suppressed: 0 }
            }
        }
    }

    /// Forget a key once the condition clears, so the next failure alerts immediately.
    pub async fn clear(&self, key: &str) {
        self.states.write().await.remove(key);
    }
}
