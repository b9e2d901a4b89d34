//! Lucid Treasury Module
//!
//! Splits the distributor's balance of an asset into a burn, an owner share,
//! a treasury share and a reward pool paid to registered participants in
//! proportion to their performance points.
//!
//! ## Key Invariants
//! - Every unit of the balance is accounted for:
//!   `burned + owner + treasury + rewards == balance`
//! - Integer division dust and unallocated rewards go to the treasury
//! - Stale performance records decay before every distribution

pub mod distributor;
pub mod errors;
pub mod participants;

pub use distributor::*;
pub use errors::*;
pub use participants::*;
