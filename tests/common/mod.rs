//! Shared fixtures: an in-memory chain that serves V2, QuoterV2 and
//! Aerodrome style pools, ERC-20 balances and scripted transaction receipts.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, TxHash, U256, address, aliases::U160, keccak256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use dex_arb_engine::{
    config::{Config, DeploymentProfile, ExchangeConfig, ExchangeKind, GasDenomination, MarketConfig},
    errors::{BotError, BotResult},
    network::{
        ChainClient, ReceiptSummary,
        contracts::{IAerodromeFactory, IAerodromePool, IERC20, IQuoterV2, IUniswapV2Factory, IUniswapV2Pair},
    },
    pools::ConstantProductAdapter,
    types::{Token, WETH_BASE, USDC_BASE},
};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const CHEAP_FACTORY: Address = address!("00000000000000000000000000000000000000f1");
pub const CHEAP_ROUTER: Address = address!("00000000000000000000000000000000000000e1");
pub const CHEAP_POOL: Address = address!("00000000000000000000000000000000000000d1");
pub const RICH_FACTORY: Address = address!("00000000000000000000000000000000000000f2");
pub const RICH_ROUTER: Address = address!("00000000000000000000000000000000000000e2");
pub const RICH_POOL: Address = address!("00000000000000000000000000000000000000d2");

pub const ONE_GWEI: u128 = 1_000_000_000;
pub const GAS_PER_TX: u128 = 150_000;

pub fn weth() -> Token {
    Token::new("WETH", WETH_BASE, 18)
}

pub fn usdc() -> Token {
    Token::new("USDC", USDC_BASE, 6)
}

pub fn eth(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

pub fn usd(amount: u64) -> U256 {
    U256::from(amount) * U256::from(1_000_000u64)
}

#[derive(Debug, Clone)]
pub struct Pool {
    pub token0: Address,
    pub token1: Address,
    pub decimals: [u8; 2],
    pub reserve0: U256,
    pub reserve1: U256,
    pub stable: bool,
}

impl Pool {
    /// Fee-free x·y=k output, used for every quoting surface.
    fn amount_out(&self, token_in: Address, amount_in: U256) -> Option<U256> {
        if token_in == self.token0 {
            Some(ConstantProductAdapter::amount_out(amount_in, self.reserve0, self.reserve1, 0))
        } else if token_in == self.token1 {
            Some(ConstantProductAdapter::amount_out(amount_in, self.reserve1, self.reserve0, 0))
        } else {
            None
        }
    }
}

/// Outcome of the next submitted transaction.
#[derive(Debug, Clone)]
pub struct Step {
    /// No receipt ever appears.
    pub mined: bool,
    pub success: bool,
    /// Absolute (token, account, balance) values once mined.
    pub balances: Vec<(Address, Address, U256)>,
}

impl Step {
    pub fn ok(balances: Vec<(Address, Address, U256)>) -> Self {
        Self {
            mined: true,
            success: true,
            balances,
        }
    }

    pub fn revert() -> Self {
        Self {
            mined: true,
            success: false,
            balances: Vec::new(),
        }
    }

    pub fn unmined() -> Self {
        Self {
            mined: false,
            success: false,
            balances: Vec::new(),
        }
    }
}

#[derive(Default)]
struct State {
    factories: HashMap<Address, Address>,
    pools: HashMap<Address, Pool>,
    quoters: HashMap<Address, Address>,
    /// Pool reads revert once this many transactions were submitted.
    quotes_fail_after: Option<usize>,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    gas_price: u128,
    script: VecDeque<Step>,
    submitted: Vec<TxHash>,
    receipts: HashMap<TxHash, ReceiptSummary>,
}

impl State {
    fn pool(&self, address: Address) -> BotResult<&Pool> {
        self.pools.get(&address).ok_or_else(|| reverted(address))
    }
}

fn reverted(to: Address) -> BotError {
    BotError::contract(to, "pool read failed", anyhow::anyhow!("execution reverted"))
}

pub struct ScriptedChain {
    state: Mutex<State>,
    /// Allowance reported for any (token, owner, spender) not set explicitly.
    default_allowance: U256,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                gas_price: ONE_GWEI,
                ..State::default()
            }),
            default_allowance: U256::MAX,
        }
    }

    /// WETH/USDC pool with WETH as token0.
    pub fn with_pool(self, factory: Address, pool: Address, weth_reserve: U256, usdc_reserve: U256) -> Self {
        self.with_token_pool(
            factory,
            pool,
            Pool {
                token0: WETH_BASE,
                token1: USDC_BASE,
                decimals: [18, 6],
                reserve0: weth_reserve,
                reserve1: usdc_reserve,
                stable: false,
            },
        )
    }

    /// Any pool, served by `factory` for both `getPair` and `getPool`.
    pub fn with_token_pool(self, factory: Address, address: Address, pool: Pool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.factories.insert(factory, address);
            state.pools.insert(address, pool);
        }
        self
    }

    /// A QuoterV2 at `quoter` that quotes against `pool`.
    pub fn with_quoter(self, quoter: Address, pool: Address) -> Self {
        self.state.lock().unwrap().quoters.insert(quoter, pool);
        self
    }

    pub fn fail_quotes_after(&self, submitted: usize) {
        self.state.lock().unwrap().quotes_fail_after = Some(submitted);
    }

    pub fn set_balance(&self, token: Address, account: Address, amount: U256) {
        self.state.lock().unwrap().balances.insert((token, account), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state.lock().unwrap().allowances.insert((token, owner, spender), amount);
    }

    pub fn set_gas_price(&self, wei: u128) {
        self.state.lock().unwrap().gas_price = wei;
    }

    pub fn push_step(&self, step: Step) {
        self.state.lock().unwrap().script.push_back(step);
    }

    pub fn submitted(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    fn abi_error(to: Address, e: alloy::sol_types::Error) -> BotError {
        BotError::contract(to, "bad calldata", e)
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn eth_call(&self, to: Address, data: Bytes) -> BotResult<Bytes> {
        let state = self.state.lock().unwrap();
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| BotError::contract(to, "empty calldata", anyhow::anyhow!("no selector")))?;

        let revert = || reverted(to);
        let quotes_failing = state
            .quotes_fail_after
            .is_some_and(|after| state.submitted.len() >= after);

        let output = match selector {
            s if s == IUniswapV2Factory::getPairCall::SELECTOR => {
                let pool = state.factories.get(&to).copied().unwrap_or(Address::ZERO);
                IUniswapV2Factory::getPairCall::abi_encode_returns(&(pool,))
            }
            s if s == IUniswapV2Pair::token0Call::SELECTOR => {
                let pool = state.pool(to)?;
                IUniswapV2Pair::token0Call::abi_encode_returns(&(pool.token0,))
            }
            s if s == IUniswapV2Pair::getReservesCall::SELECTOR => {
                if quotes_failing {
                    return Err(revert());
                }
                let pool = state.pool(to)?;
                IUniswapV2Pair::getReservesCall::abi_encode_returns(&(pool.reserve0, pool.reserve1, U256::ZERO))
            }
            s if s == IAerodromeFactory::getPoolCall::SELECTOR => {
                let pool = state.factories.get(&to).copied().unwrap_or(Address::ZERO);
                IAerodromeFactory::getPoolCall::abi_encode_returns(&(pool,))
            }
            s if s == IAerodromePool::metadataCall::SELECTOR => {
                let pool = state.pool(to)?;
                let scale = |decimals: u8| U256::from(10u64).pow(U256::from(decimals));
                IAerodromePool::metadataCall::abi_encode_returns(&(
                    scale(pool.decimals[0]),
                    scale(pool.decimals[1]),
                    pool.reserve0,
                    pool.reserve1,
                    pool.stable,
                    pool.token0,
                    pool.token1,
                ))
            }
            s if s == IAerodromePool::getAmountOutCall::SELECTOR => {
                if quotes_failing {
                    return Err(revert());
                }
                let call = IAerodromePool::getAmountOutCall::abi_decode(&data, true).map_err(|e| Self::abi_error(to, e))?;
                let out = state.pool(to)?.amount_out(call.tokenIn, call.amountIn).ok_or_else(revert)?;
                IAerodromePool::getAmountOutCall::abi_encode_returns(&(out,))
            }
            s if s == IQuoterV2::quoteExactInputSingleCall::SELECTOR => {
                if quotes_failing {
                    return Err(revert());
                }
                let call = IQuoterV2::quoteExactInputSingleCall::abi_decode(&data, true)
                    .map_err(|e| Self::abi_error(to, e))?;
                let pool = state.quoters.get(&to).copied().ok_or_else(revert)?;
                let out = state
                    .pool(pool)?
                    .amount_out(call.params.tokenIn, call.params.amountIn)
                    .ok_or_else(revert)?;
                IQuoterV2::quoteExactInputSingleCall::abi_encode_returns(&(out, U160::ZERO, 1u32, U256::from(80_000u64)))
            }
            s if s == IERC20::balanceOfCall::SELECTOR => {
                let call = IERC20::balanceOfCall::abi_decode(&data, true).map_err(|e| Self::abi_error(to, e))?;
                let balance = state.balances.get(&(to, call.account)).copied().unwrap_or_default();
                IERC20::balanceOfCall::abi_encode_returns(&(balance,))
            }
            s if s == IERC20::allowanceCall::SELECTOR => {
                let call = IERC20::allowanceCall::abi_decode(&data, true).map_err(|e| Self::abi_error(to, e))?;
                let remaining = state
                    .allowances
                    .get(&(to, call.owner, call.spender))
                    .copied()
                    .unwrap_or(self.default_allowance);
                IERC20::allowanceCall::abi_encode_returns(&(remaining,))
            }
            _ => {
                return Err(BotError::contract(to, "unknown selector", anyhow::anyhow!("execution reverted")));
            }
        };
        Ok(output.into())
    }

    async fn gas_price(&self) -> BotResult<u128> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    async fn pending_nonce(&self, _account: Address) -> BotResult<u64> {
        Ok(self.state.lock().unwrap().submitted.len() as u64)
    }

    async fn chain_id(&self) -> BotResult<u64> {
        Ok(8453)
    }

    async fn block_number(&self) -> BotResult<u64> {
        Ok(1)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BotResult<TxHash> {
        let hash = keccak256(&raw);
        let mut state = self.state.lock().unwrap();
        let step = state.script.pop_front().unwrap_or(Step::ok(Vec::new()));
        if step.mined {
            if step.success {
                for (token, account, amount) in &step.balances {
                    state.balances.insert((*token, *account), *amount);
                }
            }
            let receipt = ReceiptSummary {
                status: step.success,
                gas_used: GAS_PER_TX,
                effective_gas_price: state.gas_price,
                block_number: Some(state.submitted.len() as u64 + 2),
            };
            state.receipts.insert(hash, receipt);
        }
        state.submitted.push(hash);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BotResult<Option<ReceiptSummary>> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).copied())
    }
}

pub fn v2_exchange(id: &str, factory: Address, router: Address, fee_bps: u32) -> ExchangeConfig {
    ExchangeConfig {
        id: id.to_string(),
        kind: ExchangeKind::ConstantProduct { factory, router, fee_bps },
    }
}

pub fn weth_usdc_market(trade_size: Decimal, exchanges: &[&str]) -> MarketConfig {
    MarketConfig {
        base: weth(),
        quote: usdc(),
        trade_size,
        exchanges: exchanges.iter().map(|id| id.to_string()).collect(),
        min_profit_pct: None,
        min_profit_abs: None,
        min_price: None,
        max_price: None,
        gas_denomination: GasDenomination::QuoteToken,
    }
}

pub fn balanced_config() -> Config {
    Config::from_profile(DeploymentProfile::Balanced)
}
