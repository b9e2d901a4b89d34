//! Lucid Staking
//!
//! Locked deposits of a fungible asset with duration-based reward multipliers.
//!
//! ## Accrual
//! Each pool keeps a monotonically increasing reward-per-share accumulator
//! that is brought up to date lazily at the start of every mutating call.
//! A stake remembers the accumulator value it last settled against
//! (`reward_debt`), so its owed reward is always
//! `principal * (acc - reward_debt) / PRECISION`, scaled by its multiplier.
//!
//! ## Custody
//! Principal and the funded reward reserve are held by the module account
//! `module_account_id("staking")`. Depositors approve that account on the
//! host ledger before staking.

pub mod accrual;
pub mod errors;
pub mod pool;
pub mod types;

pub use accrual::*;
pub use errors::*;
pub use pool::*;
pub use types::*;
