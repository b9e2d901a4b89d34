//! Lucid shared types
//!
//! Primitives used by every component of the token-economy engine:
//! - identifiers and deterministic module account derivation
//! - fixed-point helpers (basis points, no floats)
//! - the injected authorization context and the error taxonomy
//! - the fungible-asset ledger contract consumed from the host
//! - read-only cross-component views, height-indexed history and the
//!   event log buffer

pub mod address;
pub mod auth;
pub mod error;
pub mod events;
pub mod history;
pub mod ledger;
pub mod scalars;
pub mod units;
pub mod view;

pub use address::*;
pub use auth::*;
pub use error::*;
pub use events::*;
pub use history::*;
pub use ledger::*;
pub use scalars::*;
pub use units::*;
pub use view::*;

/// Crate version (for API introspection)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
