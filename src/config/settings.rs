//! Engine configuration and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use crate::{
    config::{ConfidenceWeights, DeploymentProfile, ExchangeConfig, MarketConfig, MarketsFile},
    errors::{BotError, BotResult},
    network::RetryPolicy,
    utils::MAX_DECIMALS,
};

// Hard limits applied on top of whatever the environment asks for
pub const MAX_SLIPPAGE_BPS: u32 = 1_000; // 10%
pub const MAX_GAS_PRICE_GWEI: Decimal = dec!(500);
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

pub const DEFAULT_GAS_PER_LEG: u64 = 150_000;
pub const DEFAULT_GAS_PRICE_MULTIPLIER: Decimal = dec!(1.1);
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HISTORY_WINDOW_SECS: u64 = 3_600;

#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Ordered; the first entry is preferred.
    pub endpoints: Vec<String>,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub min_spread_pct: Decimal,
    pub max_price_impact_pct: Decimal,
    pub min_profit_pct: Decimal,
    pub min_profit_abs: Decimal,
    pub gas_per_leg: u64,
    pub gas_price_multiplier: Decimal,
    pub confidence: ConfidenceWeights,
}

#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub enabled: bool,
    pub private_key: Option<String>,
    pub max_slippage_bps: u32,
    pub max_gas_price_gwei: Decimal,
    pub priority_fee_gwei: Decimal,
    pub gas_price_multiplier: Decimal,
    pub swap_gas_limit: u64,
    pub approve_gas_limit: u64,
    pub confirmation_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub deadline_secs: u64,
    pub unwind_attempts: u32,
    pub unwind_slippage_bps: u32,
}

impl ExecutionSettings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub profile: DeploymentProfile,
    pub rpc: RpcSettings,
    pub detection: DetectionSettings,
    pub execution: ExecutionSettings,
    pub poll_interval_ms: u64,
    pub history_window_secs: u64,
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
    pub alert_interval_secs: u64,
    pub output_dir: String,
    pub exchanges: Vec<ExchangeConfig>,
    pub markets: Vec<MarketConfig>,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|s| Decimal::from_str(s.trim()).ok())
}

impl Config {
    /// Profile defaults with the Base mainnet market set and no endpoints.
    pub fn from_profile(profile: DeploymentProfile) -> Self {
        let defaults = profile.defaults();
        let markets = MarketsFile::base_mainnet();

        Self {
            profile,
            rpc: RpcSettings {
                endpoints: Vec::new(),
                request_timeout_ms: 5_000,
                retry: RetryPolicy::default(),
            },
            detection: DetectionSettings {
                min_spread_pct: defaults.min_spread_pct,
                max_price_impact_pct: defaults.max_price_impact_pct,
                min_profit_pct: defaults.min_profit_pct,
                min_profit_abs: defaults.min_profit_abs,
                gas_per_leg: DEFAULT_GAS_PER_LEG,
                gas_price_multiplier: DEFAULT_GAS_PRICE_MULTIPLIER,
                confidence: defaults.confidence,
            },
            execution: ExecutionSettings {
                enabled: false,
                private_key: None,
                max_slippage_bps: defaults.max_slippage_bps,
                max_gas_price_gwei: dec!(50),
                priority_fee_gwei: dec!(0.01),
                gas_price_multiplier: DEFAULT_GAS_PRICE_MULTIPLIER,
                swap_gas_limit: 300_000,
                approve_gas_limit: 80_000,
                confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
                receipt_poll_interval_ms: 1_000,
                deadline_secs: 120,
                unwind_attempts: defaults.unwind_attempts,
                unwind_slippage_bps: defaults.unwind_slippage_bps,
            },
            poll_interval_ms: 2_000,
            history_window_secs: DEFAULT_HISTORY_WINDOW_SECS,
            max_consecutive_errors: 5,
            circuit_breaker_cooldown_secs: 300, // 5 minutes
            alert_interval_secs: 60,
            output_dir: "output".to_string(),
            exchanges: markets.exchanges,
            markets: markets.markets,
        }
    }

    /// Build the configuration once at start-up from the process environment.
    pub fn load() -> BotResult<Self> {
        let profile = match env::var("PROFILE") {
            Ok(name) => name.parse().map_err(BotError::Config)?,
            Err(_) => DeploymentProfile::Balanced,
        };
        let mut config = Self::from_profile(profile);

        config.rpc.endpoints = env::var("RPC_URLS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(timeout) = env_parse("RPC_TIMEOUT_MS") {
            config.rpc.request_timeout_ms = timeout;
        }
        if let Some(retries) = env_parse("RPC_MAX_RETRIES") {
            config.rpc.retry.max_retries = retries;
        }
        if let Some(base) = env_parse("RPC_BACKOFF_BASE_MS") {
            config.rpc.retry.initial_delay_ms = base;
        }
        if let Some(max) = env_parse("RPC_MAX_BACKOFF_MS") {
            config.rpc.retry.max_delay_ms = max;
        }

        let detection = &mut config.detection;
        if let Some(v) = env_decimal("MIN_SPREAD_PCT") {
            detection.min_spread_pct = v;
        }
        if let Some(v) = env_decimal("MAX_PRICE_IMPACT_PCT") {
            detection.max_price_impact_pct = v;
        }
        if let Some(v) = env_decimal("MIN_PROFIT_PCT") {
            detection.min_profit_pct = v;
        }
        if let Some(v) = env_decimal("MIN_PROFIT_ABS") {
            detection.min_profit_abs = v;
        }
        if let Some(v) = env_parse("GAS_PER_LEG") {
            detection.gas_per_leg = v;
        }
        if let Some(v) = env_decimal("GAS_PRICE_MULTIPLIER") {
            detection.gas_price_multiplier = v.max(Decimal::ONE);
        }

        let execution = &mut config.execution;
        execution.gas_price_multiplier = config.detection.gas_price_multiplier;
        execution.enabled = env::var("ENABLE_TRADE_EXECUTION")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        execution.private_key = env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty());
        if let Some(v) = env_parse::<u32>("SLIPPAGE_TOLERANCE_BPS") {
            execution.max_slippage_bps = v.min(MAX_SLIPPAGE_BPS);
        }
        if let Some(v) = env_parse::<u32>("UNWIND_SLIPPAGE_BPS") {
            execution.unwind_slippage_bps = v.min(MAX_SLIPPAGE_BPS);
        }
        if let Some(v) = env_parse("UNWIND_ATTEMPTS") {
            execution.unwind_attempts = v;
        }
        if let Some(v) = env_decimal("MAX_GAS_PRICE_GWEI") {
            execution.max_gas_price_gwei = v.min(MAX_GAS_PRICE_GWEI);
        }
        if let Some(v) = env_decimal("PRIORITY_FEE_GWEI") {
            execution.priority_fee_gwei = v;
        }
        if let Some(v) = env_parse("CONFIRMATION_TIMEOUT_SECS") {
            execution.confirmation_timeout_secs = v;
        }

        if let Some(v) = env_parse::<u64>("POLL_INTERVAL_MS") {
            config.poll_interval_ms = v.max(MIN_POLL_INTERVAL_MS);
        }
        if let Some(v) = env_parse("HISTORY_WINDOW_SECS") {
            config.history_window_secs = v;
        }
        if let Some(v) = env_parse("MAX_CONSECUTIVE_ERRORS") {
            config.max_consecutive_errors = v;
        }
        if let Some(v) = env_parse("CIRCUIT_BREAKER_COOLDOWN_SECS") {
            config.circuit_breaker_cooldown_secs = v;
        }
        if let Some(v) = env_parse("ALERT_INTERVAL_SECS") {
            config.alert_interval_secs = v;
        }
        if let Ok(dir) = env::var("OUTPUT_DIR") {
            config.output_dir = dir;
        }

        if let Ok(path) = env::var("MARKETS_FILE") {
            let file = MarketsFile::load(&path)?;
            config.exchanges = file.exchanges;
            config.markets = file.markets;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.rpc.endpoints.is_empty() {
            return Err(BotError::Config("RPC_URLS must list at least one endpoint".to_string()));
        }
        if self.rpc.retry.max_retries == 0 {
            return Err(BotError::Config("RPC_MAX_RETRIES must be at least 1".to_string()));
        }
        if self.execution.max_slippage_bps >= 10_000 || self.execution.unwind_slippage_bps >= 10_000 {
            return Err(BotError::Config("slippage tolerance must be below 100%".to_string()));
        }
        if self.markets.is_empty() {
            return Err(BotError::Config("no markets configured".to_string()));
        }

        for market in &self.markets {
            let pair = market.pair()?;
            if market.trade_size <= Decimal::ZERO {
                return Err(BotError::Config(format!("{}: trade size must be positive", pair)));
            }
            if market.exchanges.len() < 2 {
                return Err(BotError::Config(format!("{}: at least two exchanges are required", pair)));
            }
            for token in [&market.base, &market.quote] {
                if token.decimals > MAX_DECIMALS {
                    return Err(BotError::Config(format!(
                        "{}: {} has {} decimals, at most {} are supported",
                        pair, token.symbol, token.decimals, MAX_DECIMALS
                    )));
                }
            }
            for id in &market.exchanges {
                if self.exchange(id).is_none() {
                    return Err(BotError::Config(format!("{}: unknown exchange '{}'", pair, id)));
                }
            }
        }
        Ok(())
    }

    pub fn exchange(&self, id: &str) -> Option<&ExchangeConfig> {
        self.exchanges.iter().find(|e| e.id == id)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_secs(self.history_window_secs)
    }
}
