//! Voting power.
//!
//! A voter's weight is their token position scaled by the staking multiplier:
//! `tokens * multiplier / BASE_MULTIPLIER`. Governance never reads balances
//! itself; the host supplies a [`VotingPowerSource`] for each call.
//!
//! Every query names the height it is asked at. Ballots are weighed at the
//! proposal's snapshot height, so tokens moved after a vote cannot vote again.

use crate::errors::{GovernanceError, Result};
use lucid_types::{
    mul_div, AccountId, Amount, AssetId, Height, StakeView, TokenLedger, BASE_MULTIPLIER,
};

/// Read-only view of voting power at the end of a height
pub trait VotingPowerSource {
    /// Tokens counted for `account` before the staking multiplier
    fn token_voting_power(&self, account: &AccountId, height: Height) -> Amount;

    /// Staking multiplier of `account` in basis points
    fn voting_multiplier(&self, account: &AccountId, height: Height) -> u32;

    /// Supply the quorum fraction is taken from
    fn total_voting_supply(&self, height: Height) -> Amount;
}

/// Weighted voting power of `account` at the end of `height`.
pub fn voting_power(
    source: &dyn VotingPowerSource,
    account: &AccountId,
    height: Height,
) -> Result<Amount> {
    mul_div(
        source.token_voting_power(account, height),
        source.voting_multiplier(account, height) as u128,
        BASE_MULTIPLIER as u128,
    )
    .ok_or(GovernanceError::Overflow("voting power"))
}

/// Voting power read from a token ledger and the staking pool.
///
/// Staked tokens sit in the pool's custody account, so they are added back
/// to the wallet balance.
pub struct LedgerVotingPower<'a> {
    pub ledger: &'a dyn TokenLedger,
    pub asset: AssetId,
    pub stakes: &'a dyn StakeView,
}

impl<'a> LedgerVotingPower<'a> {
    pub fn new(ledger: &'a dyn TokenLedger, asset: AssetId, stakes: &'a dyn StakeView) -> Self {
        Self {
            ledger,
            asset,
            stakes,
        }
    }
}

impl VotingPowerSource for LedgerVotingPower<'_> {
    fn token_voting_power(&self, account: &AccountId, height: Height) -> Amount {
        self.ledger
            .balance_at(&self.asset, account, height)
            .saturating_add(self.stakes.staked_amount_at(account, height))
    }

    fn voting_multiplier(&self, account: &AccountId, height: Height) -> u32 {
        self.stakes.voting_multiplier_at(account, height)
    }

    fn total_voting_supply(&self, height: Height) -> Amount {
        self.ledger.total_supply_at(&self.asset, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_types::{account_id, asset_id, InMemoryLedger, NoStakes};

    struct Fixed {
        tokens: Amount,
        multiplier: u32,
    }

    impl VotingPowerSource for Fixed {
        fn token_voting_power(&self, _account: &AccountId, _height: Height) -> Amount {
            self.tokens
        }

        fn voting_multiplier(&self, _account: &AccountId, _height: Height) -> u32 {
            self.multiplier
        }

        fn total_voting_supply(&self, _height: Height) -> Amount {
            self.tokens
        }
    }

    #[test]
    fn test_multiplier_scales_power() {
        let source = Fixed {
            tokens: 1_000,
            multiplier: 25_000,
        };
        assert_eq!(voting_power(&source, &account_id("a"), 0).unwrap(), 2_500);
    }

    #[test]
    fn test_ledger_source_without_stakes() {
        let asset = asset_id("LUCID");
        let alice = account_id("alice");
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&asset, &alice, 700).unwrap();
        ledger.mint(&asset, &account_id("bob"), 300).unwrap();

        let source = LedgerVotingPower::new(&ledger, asset, &NoStakes);
        assert_eq!(voting_power(&source, &alice, 0).unwrap(), 700);
        assert_eq!(source.total_voting_supply(0), 1_000);
    }

    #[test]
    fn test_ledger_source_reads_past_heights() {
        let asset = asset_id("LUCID");
        let alice = account_id("alice");
        let bob = account_id("bob");
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&asset, &alice, 1_000).unwrap();
        ledger.advance_to(20);
        ledger.transfer(&asset, &alice, &bob, 1_000).unwrap();

        let source = LedgerVotingPower::new(&ledger, asset, &NoStakes);
        assert_eq!(voting_power(&source, &alice, 19).unwrap(), 1_000);
        assert_eq!(voting_power(&source, &bob, 19).unwrap(), 0);
        assert_eq!(voting_power(&source, &bob, 20).unwrap(), 1_000);
    }
}
