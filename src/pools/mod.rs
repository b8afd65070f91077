//! Exchange adapters: pricing, depth, impact and swap encoding per DEX family

pub mod adapter;
pub mod concentrated;
pub mod constant_product;
pub mod impact;
pub mod stable;

pub use adapter::*;
pub use concentrated::*;
pub use constant_product::*;
pub use impact::*;
pub use stable::*;
