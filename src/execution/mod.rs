//! Trade execution: signing and submission, and the two-leg state machine

pub mod engine;
pub mod submitter;

pub use engine::*;
pub use submitter::*;
