//! Tokens and trading pairs

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::errors::{BotError, BotResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }
}

/// A base/quote pair. Prices are quoted as quote units per one base unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TradingPair {
    base: Token,
    quote: Token,
}

impl TradingPair {
    pub fn new(base: Token, quote: Token) -> BotResult<Self> {
        if base.address == quote.address {
            return Err(BotError::Config(format!(
                "trading pair needs two distinct tokens, got {} twice",
                base.symbol
            )));
        }
        Ok(Self { base, quote })
    }

    pub fn base(&self) -> &Token {
        &self.base
    }

    pub fn quote(&self) -> &Token {
        &self.quote
    }

    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }

    /// The opposite side of a swap that spends `token_in`.
    pub fn counterpart(&self, token_in: Address) -> BotResult<&Token> {
        if token_in == self.base.address {
            Ok(&self.quote)
        } else if token_in == self.quote.address {
            Ok(&self.base)
        } else {
            Err(BotError::Config(format!("{} is not part of {}", token_in, self.symbol())))
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base.symbol, self.quote.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{USDC_BASE, WETH_BASE};

    #[test]
    fn rejects_identical_tokens() {
        let weth = Token::new("WETH", WETH_BASE, 18);
        assert!(TradingPair::new(weth.clone(), weth).is_err());
    }

    #[test]
    fn resolves_counterpart() {
        let pair = TradingPair::new(
            Token::new("WETH", WETH_BASE, 18),
            Token::new("USDC", USDC_BASE, 6),
        )
        .unwrap();
        assert_eq!(pair.counterpart(WETH_BASE).unwrap().symbol, "USDC");
        assert_eq!(pair.counterpart(USDC_BASE).unwrap().symbol, "WETH");
        assert!(pair.counterpart(Address::ZERO).is_err());
        assert_eq!(pair.to_string(), "WETH/USDC");
    }
}
