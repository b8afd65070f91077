//! Exchange and market definitions

use alloy::primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::{
    errors::{BotError, BotResult},
    types::{
        Token, TradingPair,
        AERODROME_FACTORY_BASE, AERODROME_ROUTER_BASE, UNISWAP_V2_FACTORY_BASE, UNISWAP_V2_ROUTER_BASE,
        UNISWAP_V3_QUOTER_V2_BASE, UNISWAP_V3_SWAP_ROUTER_02_BASE, USDC_BASE, WETH_BASE,
    },
};

fn default_v2_fee_bps() -> u32 {
    30
}

fn default_probe_base_units() -> Decimal {
    dec!(0.01)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeKind {
    /// Reserve-ratio pools behind a Uniswap-V2 style factory and router.
    ConstantProduct {
        factory: Address,
        router: Address,
        #[serde(default = "default_v2_fee_bps")]
        fee_bps: u32,
    },
    /// Uniswap-V3 style pools priced through QuoterV2.
    ConcentratedLiquidity {
        quoter: Address,
        router: Address,
        fee_tier: u32,
        #[serde(default = "default_probe_base_units")]
        probe_base_units: Decimal,
    },
    /// Aerodrome/Velodrome pools reporting `metadata()`.
    StableMetadata {
        factory: Address,
        router: Address,
        stable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub id: String,
    #[serde(flatten)]
    pub kind: ExchangeKind,
}

/// What the chain's gas token is worth in the market's quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GasDenomination {
    /// Gas is paid in the base token (e.g. WETH/USDC): convert at the quoted price.
    #[default]
    BaseToken,
    /// Gas is paid in the quote token: no conversion.
    QuoteToken,
    /// Neither side is the gas token.
    Fixed { native_price: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub base: Token,
    pub quote: Token,
    /// Base units per trade.
    pub trade_size: Decimal,
    /// Exchange ids, each must be defined in the exchange list.
    pub exchanges: Vec<String>,
    #[serde(default)]
    pub min_profit_pct: Option<Decimal>,
    #[serde(default)]
    pub min_profit_abs: Option<Decimal>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub gas_denomination: GasDenomination,
}

impl MarketConfig {
    pub fn pair(&self) -> BotResult<TradingPair> {
        TradingPair::new(self.base.clone(), self.quote.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketsFile {
    pub exchanges: Vec<ExchangeConfig>,
    pub markets: Vec<MarketConfig>,
}

impl MarketsFile {
    pub fn load(path: impl AsRef<Path>) -> BotResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| BotError::Config(format!("invalid markets file {}: {}", path.display(), e)))
    }

    pub fn exchange(&self, id: &str) -> Option<&ExchangeConfig> {
        self.exchanges.iter().find(|e| e.id == id)
    }

    /// WETH/USDC on Base across Uniswap V2, Uniswap V3 (0.05%) and Aerodrome volatile.
    pub fn base_mainnet() -> Self {
        let exchanges = vec![
            ExchangeConfig {
                id: "uniswap-v2".to_string(),
                kind: ExchangeKind::ConstantProduct {
                    factory: UNISWAP_V2_FACTORY_BASE,
                    router: UNISWAP_V2_ROUTER_BASE,
                    fee_bps: 30,
                },
            },
            ExchangeConfig {
                id: "uniswap-v3-500".to_string(),
                kind: ExchangeKind::ConcentratedLiquidity {
                    quoter: UNISWAP_V3_QUOTER_V2_BASE,
                    router: UNISWAP_V3_SWAP_ROUTER_02_BASE,
                    fee_tier: 500,
                    probe_base_units: dec!(0.01),
                },
            },
            ExchangeConfig {
                id: "aerodrome-volatile".to_string(),
                kind: ExchangeKind::StableMetadata {
                    factory: AERODROME_FACTORY_BASE,
                    router: AERODROME_ROUTER_BASE,
                    stable: false,
                },
            },
        ];

        let markets = vec![MarketConfig {
            base: Token::new("WETH", WETH_BASE, 18),
            quote: Token::new("USDC", USDC_BASE, 6),
            trade_size: dec!(0.1),
            exchanges: exchanges.iter().map(|e| e.id.clone()).collect(),
            min_profit_pct: None,
            min_profit_abs: None,
            min_price: Some(dec!(100)),
            max_price: Some(dec!(100000)),
            gas_denomination: GasDenomination::BaseToken,
        }];

        Self { exchanges, markets }
    }
}
