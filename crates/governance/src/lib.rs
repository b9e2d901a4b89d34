//! Lucid Governance Module
//!
//! On-chain governance for the token-economy engine:
//! - proposals carrying target calls, categorised and prioritised
//! - staking-weighted voting (`tokens * multiplier / BASE_MULTIPLIER`)
//! - timelocked execution through an injected [`TimelockExecutor`]
//! - emergency proposals and an emergency pause
//!
//! Governance parameters change only by executing a passed proposal that
//! calls `governance.updateGovernanceParameters`.

pub mod errors;
pub mod governor;
pub mod parameters;
pub mod timelock;
pub mod types;
pub mod voting;

pub use errors::*;
pub use governor::*;
pub use parameters::*;
pub use timelock::*;
pub use types::*;
pub use voting::*;

/// Governance module version (for API introspection)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
