//! Validation result types

use serde::Serialize;

#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationResult {
    pub spread_acceptable: bool,
    pub liquidity_check: bool,
    pub gas_economics: bool,
    pub all_passed: bool,
    pub warnings: Vec<String>,
}
