//! RPC connection management with retry and endpoint failover

use alloy::{
    providers::{ProviderBuilder, RootProvider},
    rpc::client::RpcClient,
    transports::{BoxTransport, http::Http},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::{
    config::RpcSettings,
    errors::{BotError, BotResult},
    network::RetryPolicy,
};

pub type ConcreteProvider = RootProvider<BoxTransport>;

#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub url: String,
    pub timeout: Duration,
}

/// Builds a handle for one endpoint. Called lazily, and again after each rotation.
pub type Connector<H> = Box<dyn Fn(&RpcEndpoint) -> BotResult<H> + Send + Sync>;

struct ActiveEndpoint<H> {
    index: usize,
    /// Bumped on every rotation so concurrent failures rotate once.
    generation: u64,
    handle: Option<Arc<H>>,
}

/// Owns the ordered endpoint list and a single shared, lazily (re)connected
/// handle. Calls run concurrently under the read lock; rotation and
/// reconnection take the write lock.
pub struct RpcConnectionManager<H = ConcreteProvider> {
    endpoints: Vec<RpcEndpoint>,
    connector: Connector<H>,
    active: RwLock<ActiveEndpoint<H>>,
    policy: RetryPolicy,
}

/// Alloy HTTP provider with the endpoint's request timeout enforced by reqwest.
pub fn http_connector() -> Connector<ConcreteProvider> {
    Box::new(|endpoint: &RpcEndpoint| {
        let url: reqwest::Url = endpoint
            .url
            .parse()
            .map_err(|e| BotError::Config(format!("invalid RPC url {}: {}", endpoint.url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| BotError::network("failed to build HTTP client", e))?;
        let rpc_client = RpcClient::new(Http::with_client(client, url), false);
        Ok(ProviderBuilder::new().on_client(rpc_client).boxed())
    })
}

impl RpcConnectionManager<ConcreteProvider> {
    pub fn from_settings(settings: &RpcSettings) -> BotResult<Self> {
        let timeout = Duration::from_millis(settings.request_timeout_ms);
        let endpoints = settings
            .endpoints
            .iter()
            .map(|url| RpcEndpoint { url: url.clone(), timeout })
            .collect();
        Self::new(endpoints, settings.retry.clone(), http_connector())
    }
}

impl<H: Send + Sync + 'static> RpcConnectionManager<H> {
    pub fn new(endpoints: Vec<RpcEndpoint>, policy: RetryPolicy, connector: Connector<H>) -> BotResult<Self> {
        if endpoints.is_empty() {
            return Err(BotError::Config("no RPC endpoints configured".to_string()));
        }
        Ok(Self {
            endpoints,
            connector,
            active: RwLock::new(ActiveEndpoint {
                index: 0,
                generation: 0,
                handle: None,
            }),
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub async fn current_endpoint(&self) -> String {
        let active = self.active.read().await;
        self.endpoints[active.index].url.clone()
    }

    /// Run `operation` against the current endpoint. Transient failures are
    /// retried with backoff, rotating to the next endpoint first; anything
    /// else is returned as is. Gives up with `EndpointsExhausted` after
    /// `max_retries × endpoints` attempts.
    pub async fn call<T, F, Fut>(&self, operation: F, policy: &RetryPolicy) -> BotResult<T>
    where
        F: Fn(Arc<H>) -> Fut,
        Fut: Future<Output = BotResult<T>>,
    {
        let total_attempts = policy.total_attempts(self.endpoints.len());
        let mut last_error = String::new();

        for attempt in 1..=total_attempts {
            let (generation, handle) = match self.acquire().await {
                Ok(acquired) => acquired,
                Err(e) if e.is_transient() => {
                    last_error = e.to_string();
                    self.rotate_after(attempt, total_attempts, policy, None, &e).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match operation(handle).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    last_error = e.to_string();
                    self.rotate_after(attempt, total_attempts, policy, Some(generation), &e).await;
                }
            }
        }

        Err(BotError::EndpointsExhausted {
            attempts: total_attempts,
            last_error,
        })
    }

    async fn rotate_after(
        &self,
        attempt: u32,
        total_attempts: u32,
        policy: &RetryPolicy,
        generation: Option<u64>,
        error: &BotError,
    ) {
        if attempt >= total_attempts {
            warn!("RPC attempt {}/{} failed, no attempts left: {}", attempt, total_attempts, error);
            return;
        }
        let delay = policy.delay_for(attempt);
        warn!(
            "RPC attempt {}/{} failed: {}. Rotating endpoint, retrying in {:?}",
            attempt, total_attempts, error, delay
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.rotate(generation).await;
    }

    /// The current handle, connecting first if needed.
    async fn acquire(&self) -> BotResult<(u64, Arc<H>)> {
        {
            let active = self.active.read().await;
            if let Some(handle) = &active.handle {
                return Ok((active.generation, Arc::clone(handle)));
            }
        }

        let mut active = self.active.write().await;
        if let Some(handle) = &active.handle {
            return Ok((active.generation, Arc::clone(handle)));
        }
        let endpoint = &self.endpoints[active.index];
        debug!("Connecting to RPC endpoint {}", endpoint.url);
        let handle = Arc::new((self.connector)(endpoint)?);
        active.handle = Some(Arc::clone(&handle));
        Ok((active.generation, handle))
    }

    /// Advance to the next endpoint unless someone else already moved past
    /// `seen_generation`.
    async fn rotate(&self, seen_generation: Option<u64>) {
        let mut active = self.active.write().await;
        if let Some(seen) = seen_generation {
            if active.generation != seen {
                return;
            }
        }
        active.index = (active.index + 1) % self.endpoints.len();
        active.generation += 1;
        active.handle = None;
        if self.endpoints.len() > 1 {
            info!("Switched RPC endpoint to {}", self.endpoints[active.index].url);
        }
    }
}
