//! Base mainnet token and exchange addresses used by the default market set

use alloy::primitives::{Address, address};

// Tokens
pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");

// Uniswap V2
pub const UNISWAP_V2_FACTORY_BASE: Address = address!("8909dc15e40173ff4699343b6eb8132c65e18ec6");
pub const UNISWAP_V2_ROUTER_BASE: Address = address!("4752ba5dbc23f44d87826276bf6fd6b1c372ad24");

// Uniswap V3
pub const UNISWAP_V3_QUOTER_V2_BASE: Address = address!("3d4e44eb1374240ce5f1b871ab261cd16335b76a");
pub const UNISWAP_V3_SWAP_ROUTER_02_BASE: Address = address!("2626664c2603336e57b271c5c0b26f421741e481");

// Aerodrome
pub const AERODROME_FACTORY_BASE: Address = address!("420dd381b31aef6683db6b902084cb0ffece40da");
pub const AERODROME_ROUTER_BASE: Address = address!("cf77a3ba9a5ca399b7c97c74d54e5b1beb874e43");
