//! Read-only cross-component views.
//!
//! Components never hold references to each other; a caller hands the
//! reading component a view of the owning component for the duration of one
//! call.

use crate::address::AccountId;
use crate::units::{Amount, Height, BASE_MULTIPLIER};

/// Staking positions as seen by other components.
pub trait StakeView {
    /// Sum of active staked principal owned by `account`.
    fn staked_amount(&self, account: &AccountId) -> Amount;

    /// Principal-weighted multiplier across the account's active stakes
    /// (basis points, `BASE_MULTIPLIER` when the account has none).
    fn voting_multiplier(&self, account: &AccountId) -> u32;

    /// `staked_amount` as it stood at the end of `height`.
    fn staked_amount_at(&self, account: &AccountId, height: Height) -> Amount;

    /// `voting_multiplier` as it stood at the end of `height`.
    fn voting_multiplier_at(&self, account: &AccountId, height: Height) -> u32;
}

/// View used where no staking component is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStakes;

impl StakeView for NoStakes {
    fn staked_amount(&self, _account: &AccountId) -> Amount {
        0
    }

    fn voting_multiplier(&self, _account: &AccountId) -> u32 {
        BASE_MULTIPLIER
    }

    fn staked_amount_at(&self, _account: &AccountId, _height: Height) -> Amount {
        0
    }

    fn voting_multiplier_at(&self, _account: &AccountId, _height: Height) -> u32 {
        BASE_MULTIPLIER
    }
}

/// Fixed per-account stakes, handy for hosts replaying snapshots. The same
/// stakes apply at every height.
impl StakeView for std::collections::HashMap<AccountId, Amount> {
    fn staked_amount(&self, account: &AccountId) -> Amount {
        self.get(account).copied().unwrap_or(0)
    }

    fn voting_multiplier(&self, _account: &AccountId) -> u32 {
        BASE_MULTIPLIER
    }

    fn staked_amount_at(&self, account: &AccountId, _height: Height) -> Amount {
        self.staked_amount(account)
    }

    fn voting_multiplier_at(&self, _account: &AccountId, _height: Height) -> u32 {
        BASE_MULTIPLIER
    }
}
