//! Lucid Access Tiers
//!
//! Maps an account's holdings and stake to an access tier carrying daily
//! action quotas, a storage budget and feature flags.
//!
//! Tier membership is never stored. It is recomputed from the current
//! balance and stake on every query, so it always reflects the latest
//! position. Only usage counters and special-permission overrides persist.
//!
//! The component also runs a small flat-rate staking pool over the access
//! token, letting an account raise its tier by locking tokens here.

pub mod errors;
pub mod staking;
pub mod tiers;
pub mod types;

pub use errors::*;
pub use staking::*;
pub use tiers::*;
pub use types::*;
