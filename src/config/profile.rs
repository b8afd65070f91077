//! Deployment profiles
//!
//! Thresholds that used to be scattered constants live here so a deployment
//! picks one coherent set and overrides individual values through the
//! environment.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentProfile {
    Conservative,
    Balanced,
    Aggressive,
}

/// How the detector scores a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub base: Decimal,
    /// Spreads at or above this earn `large_spread_bonus`.
    pub large_spread_pct: Decimal,
    pub large_spread_bonus: Decimal,
    /// Spreads above this look like stale or manipulated quotes.
    pub implausible_spread_pct: Decimal,
    pub implausible_spread_penalty: Decimal,
    /// Applied in proportion to `max_impact / max_price_impact_pct`.
    pub impact_penalty: Decimal,
    pub volatility_threshold_pct: Decimal,
    /// Applied in proportion to `volatility / volatility_threshold_pct`, capped at 1x.
    pub volatility_penalty: Decimal,
}

pub struct ProfileDefaults {
    pub min_spread_pct: Decimal,
    pub max_price_impact_pct: Decimal,
    pub min_profit_pct: Decimal,
    pub min_profit_abs: Decimal,
    pub max_slippage_bps: u32,
    pub unwind_slippage_bps: u32,
    pub unwind_attempts: u32,
    pub confidence: ConfidenceWeights,
}

impl DeploymentProfile {
    pub fn defaults(self) -> ProfileDefaults {
        match self {
            DeploymentProfile::Conservative => ProfileDefaults {
                min_spread_pct: dec!(1.0),
                max_price_impact_pct: dec!(3),
                min_profit_pct: dec!(0.3),
                min_profit_abs: dec!(5),
                max_slippage_bps: 30,
                unwind_slippage_bps: 200,
                unwind_attempts: 2,
                confidence: ConfidenceWeights {
                    base: dec!(0.6),
                    large_spread_pct: dec!(1.5),
                    large_spread_bonus: dec!(0.1),
                    implausible_spread_pct: dec!(5),
                    implausible_spread_penalty: dec!(0.5),
                    impact_penalty: dec!(0.3),
                    volatility_threshold_pct: dec!(2),
                    volatility_penalty: dec!(0.2),
                },
            },
            DeploymentProfile::Balanced => ProfileDefaults {
                min_spread_pct: dec!(0.3),
                max_price_impact_pct: dec!(5),
                min_profit_pct: dec!(0.1),
                min_profit_abs: dec!(1),
                max_slippage_bps: 50,
                unwind_slippage_bps: 300,
                unwind_attempts: 2,
                confidence: ConfidenceWeights {
                    base: dec!(0.7),
                    large_spread_pct: dec!(1),
                    large_spread_bonus: dec!(0.1),
                    implausible_spread_pct: dec!(10),
                    implausible_spread_penalty: dec!(0.4),
                    impact_penalty: dec!(0.2),
                    volatility_threshold_pct: dec!(5),
                    volatility_penalty: dec!(0.1),
                },
            },
            DeploymentProfile::Aggressive => ProfileDefaults {
                min_spread_pct: dec!(0.1),
                max_price_impact_pct: dec!(5),
                min_profit_pct: dec!(0.02),
                min_profit_abs: dec!(0.10),
                max_slippage_bps: 100,
                unwind_slippage_bps: 500,
                unwind_attempts: 1,
                confidence: ConfidenceWeights {
                    base: dec!(0.7),
                    large_spread_pct: dec!(0.5),
                    large_spread_bonus: dec!(0.15),
                    implausible_spread_pct: dec!(15),
                    implausible_spread_penalty: dec!(0.3),
                    impact_penalty: dec!(0.1),
                    volatility_threshold_pct: dec!(10),
                    volatility_penalty: dec!(0.05),
                },
            },
        }
    }
}

impl FromStr for DeploymentProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(DeploymentProfile::Conservative),
            "balanced" => Ok(DeploymentProfile::Balanced),
            "aggressive" => Ok(DeploymentProfile::Aggressive),
            other => Err(format!("unknown deployment profile '{}'", other)),
        }
    }
}

impl fmt::Display for DeploymentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentProfile::Conservative => "conservative",
            DeploymentProfile::Balanced => "balanced",
            DeploymentProfile::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_names() {
        assert_eq!("Balanced".parse::<DeploymentProfile>().unwrap(), DeploymentProfile::Balanced);
        assert_eq!(" aggressive ".parse::<DeploymentProfile>().unwrap(), DeploymentProfile::Aggressive);
        assert!("yolo".parse::<DeploymentProfile>().is_err());
    }

    #[test]
    fn stricter_profiles_demand_wider_spreads() {
        let conservative = DeploymentProfile::Conservative.defaults();
        let aggressive = DeploymentProfile::Aggressive.defaults();
        assert!(conservative.min_spread_pct > aggressive.min_spread_pct);
        assert!(conservative.max_price_impact_pct <= aggressive.max_price_impact_pct);
        assert!(conservative.unwind_attempts >= aggressive.unwind_attempts);
    }
}
