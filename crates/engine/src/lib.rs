//! Lucid Engine
//!
//! Host-facing context for the token-economy engine:
//! - [`Engine`] owns the staking pool, access tiers, reward distributor,
//!   governance and economic engine together with the host ledger
//! - [`EngineExecutor`] applies passed proposals to those components
//! - [`EngineConfig`] loads layered TOML and environment configuration
//! - [`SharedEngine`] serialises racing callers behind a lock

pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod shared;
pub mod telemetry;

pub use config::*;
pub use engine::*;
pub use errors::*;
pub use executor::*;
pub use shared::*;
pub use telemetry::*;

/// Crate version (for API introspection)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
