//! QuoterV2 and Aerodrome adapters against the in-memory chain.

mod common;

use alloy::primitives::{Address, address};
use common::*;
use dex_arb_engine::{
    config::{ExchangeConfig, ExchangeKind},
    network::ChainClient,
    pools::{ConstantProductAdapter, ExchangeAdapter},
    types::{Token, TradingPair, USDC_BASE, WETH_BASE},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const QUOTER: Address = address!("00000000000000000000000000000000000000a1");
const V3_ROUTER: Address = address!("00000000000000000000000000000000000000a2");
const V3_POOL: Address = address!("00000000000000000000000000000000000000a3");
const AERO_FACTORY: Address = address!("00000000000000000000000000000000000000b1");
const AERO_ROUTER: Address = address!("00000000000000000000000000000000000000b2");
const AERO_POOL: Address = address!("00000000000000000000000000000000000000b3");
const DAI: Address = address!("50c5725949a6f0c72e6c4a641f24049a917db0cb");

fn weth_usdc() -> TradingPair {
    TradingPair::new(weth(), usdc()).unwrap()
}

fn adapter(kind: ExchangeKind, chain: ScriptedChain) -> ExchangeAdapter {
    let chain: Arc<dyn ChainClient> = Arc::new(chain);
    let config = ExchangeConfig {
        id: "venue".to_string(),
        kind,
    };
    ExchangeAdapter::from_config(&config, chain)
}

/// QuoterV2 in front of a 100 WETH / 200_000 USDC pool.
fn concentrated() -> ExchangeAdapter {
    let chain = ScriptedChain::new()
        .with_pool(CHEAP_FACTORY, V3_POOL, eth(100), usd(200_000))
        .with_quoter(QUOTER, V3_POOL);
    adapter(
        ExchangeKind::ConcentratedLiquidity {
            quoter: QUOTER,
            router: V3_ROUTER,
            fee_tier: 500,
            probe_base_units: dec!(0.01),
        },
        chain,
    )
}

fn aerodrome(pool: Pool) -> ExchangeAdapter {
    let stable = pool.stable;
    let chain = ScriptedChain::new().with_token_pool(AERO_FACTORY, AERO_POOL, pool);
    adapter(
        ExchangeKind::StableMetadata {
            factory: AERO_FACTORY,
            router: AERO_ROUTER,
            stable,
        },
        chain,
    )
}

#[tokio::test]
async fn quoter_price_comes_from_the_small_probe() {
    let quote = concentrated().get_price(&weth_usdc()).await;

    assert!(quote.is_live(), "{:?}", quote.raw_error);
    // 0.01 WETH returns 19.998 USDC
    assert_eq!(quote.price, dec!(1999.8));
    // the two probes imply roughly the 100 WETH behind the quoter
    assert!(quote.available_liquidity > dec!(199_000), "{}", quote.available_liquidity);
    assert!(quote.available_liquidity < dec!(201_000), "{}", quote.available_liquidity);
}

#[tokio::test]
async fn quoter_quotes_both_directions() {
    let venue = concentrated();
    let pair = weth_usdc();

    let weth_out = venue.quote_exact_in(&pair, USDC_BASE, usd(2_000)).await.unwrap();
    assert_eq!(weth_out, ConstantProductAdapter::amount_out(usd(2_000), usd(200_000), eth(100), 0));

    let usdc_out = venue.quote_exact_in(&pair, WETH_BASE, eth(1)).await.unwrap();
    assert_eq!(usdc_out, ConstantProductAdapter::amount_out(eth(1), eth(100), usd(200_000), 0));
}

#[tokio::test]
async fn quoter_impact_grows_with_size() {
    let venue = concentrated();

    // 0.2 WETH gets ~1996.0, 1 WETH ~1980.2: about 0.79%
    let impact = venue.check_liquidity(&weth_usdc(), dec!(1), dec!(1)).await.unwrap();
    assert_eq!(impact.probes.len(), 5);
    assert!(impact.max_impact_pct > dec!(0.7), "{}", impact.max_impact_pct);
    assert!(impact.max_impact_pct < dec!(0.9), "{}", impact.max_impact_pct);
    assert!(impact.sufficient_liquidity);

    let strict = venue.check_liquidity(&weth_usdc(), dec!(1), dec!(0.5)).await.unwrap();
    assert!(!strict.sufficient_liquidity);
}

#[tokio::test]
async fn metadata_reserves_follow_the_pool_token_order() {
    // the pool lists USDC first, the pair quotes WETH in USDC
    let venue = aerodrome(Pool {
        token0: USDC_BASE,
        token1: WETH_BASE,
        decimals: [6, 18],
        reserve0: usd(2_000_000),
        reserve1: eth(1_000),
        stable: false,
    });
    let pair = weth_usdc();

    let quote = venue.get_price(&pair).await;
    assert!(quote.is_live(), "{:?}", quote.raw_error);
    assert_eq!(quote.price, dec!(2000));
    assert_eq!(quote.available_liquidity, dec!(2_000_000));

    let out = venue.quote_exact_in(&pair, WETH_BASE, eth(1)).await.unwrap();
    assert_eq!(out, ConstantProductAdapter::amount_out(eth(1), eth(1_000), usd(2_000_000), 0));
}

#[tokio::test]
async fn pool_missing_the_base_token_is_rejected() {
    let venue = aerodrome(Pool {
        token0: USDC_BASE,
        token1: DAI,
        decimals: [6, 18],
        reserve0: usd(1_000_000),
        reserve1: eth(1_000_000),
        stable: true,
    });

    let quote = venue.get_price(&weth_usdc()).await;
    assert!(!quote.is_live());
    assert!(quote.raw_error.is_some());
}

#[tokio::test]
async fn stable_pool_prices_on_the_curve_and_compares_raw_amounts() {
    let dai = Token::new("DAI", DAI, 18);
    let pair = TradingPair::new(dai, usdc()).unwrap();
    let venue = aerodrome(Pool {
        token0: DAI,
        token1: USDC_BASE,
        decimals: [18, 6],
        reserve0: eth(1_000_000),
        reserve1: usd(1_000_000),
        stable: true,
    });

    let quote = venue.get_price(&pair).await;
    assert!(quote.is_live(), "{:?}", quote.raw_error);
    assert_eq!(quote.price, dec!(1));

    let impact = venue.check_liquidity(&pair, dec!(1_000), dec!(1)).await.unwrap();
    // raw USDC units per raw DAI unit, no decimal adjustment
    assert!(impact.probes[0].rate < dec!(0.000001), "{}", impact.probes[0].rate);
    assert!(impact.probes[0].rate > Decimal::ZERO);
    assert!(impact.max_impact_pct > dec!(0.05), "{}", impact.max_impact_pct);
    assert!(impact.max_impact_pct < dec!(0.1), "{}", impact.max_impact_pct);
    assert!(impact.sufficient_liquidity);
}
