//! Error taxonomy shared by every component.
//!
//! Each component defines its own `thiserror` enum and classifies every
//! variant into one of these kinds so that hosts can react uniformly.

use serde::{Deserialize, Serialize};

/// Coarse classification of a rejected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad amount, duration, threshold or other argument.
    Validation,
    /// Missing role or ownership.
    Authorization,
    /// Wrong lifecycle state (locked, paused, not yet executable, ...).
    State,
    /// Tier, stake or other cap exceeded.
    Capacity,
    /// Parameter update violating its bounds.
    Configuration,
    /// The host ledger refused a transfer.
    Ledger,
}

/// Implemented by every component error.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
