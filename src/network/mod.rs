//! Node access: connection management, retry policy, ABI bindings and the
//! chain client the rest of the engine is written against

pub mod chain;
pub mod contracts;
pub mod providers;
pub mod retry;

pub use chain::*;
pub use providers::*;
pub use retry::*;
