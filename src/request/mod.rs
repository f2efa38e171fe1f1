//! Request lifecycle: core types and type-safe state transitions.

pub mod transitions;
pub mod types;

pub use types::*;
