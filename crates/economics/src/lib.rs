//! Lucid Economics Module
//!
//! Turns externally supplied network and market telemetry into the inputs the
//! rest of the engine consumes:
//! - four 0–200 scores (100 = neutral) recomputed on every telemetry update
//! - a dynamic burn rate clamped to governance-set bounds
//! - a reward multiplier composed from the scores and a participant's standing
//!
//! Metrics flow one way: staking and the reward distributor read from this
//! engine and never write to it.

pub mod engine;
pub mod errors;
pub mod parameters;
pub mod types;

pub use engine::*;
pub use errors::*;
pub use parameters::*;
pub use types::*;

/// Module version for API introspection
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
