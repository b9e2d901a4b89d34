//! Flat-rate staking over the access token.
//!
//! One position per account, a single reward-per-share accumulator and no
//! duration multipliers. Each deposit restarts the account's lock.

use crate::errors::{AccessError, Result};
use lucid_types::{
    module_account_id, mul_div, AccountId, Amount, AssetId, Height, TokenLedger, PRECISION,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label of the custody account for access stakes.
pub const ACCESS_MODULE: &str = "access";

/// An account's access stake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStake {
    pub amount: Amount,
    /// Accumulator value at the last settlement
    pub reward_debt: u128,
    /// Settled rewards not yet paid
    pub unclaimed: Amount,
    pub unlock_height: Height,
}

/// The access staking pool.
#[derive(Debug, Clone)]
pub struct AccessStaking {
    asset: AssetId,
    custody: AccountId,
    reward_rate: Amount,
    lock: Height,
    total_staked: Amount,
    acc_reward_per_share: u128,
    last_update_height: Height,
    reward_reserve: Amount,
    positions: HashMap<AccountId, AccessStake>,
}

impl AccessStaking {
    pub fn new(asset: AssetId, reward_rate: Amount, lock: Height) -> Self {
        Self {
            asset,
            custody: module_account_id(ACCESS_MODULE),
            reward_rate,
            lock,
            total_staked: 0,
            acc_reward_per_share: 0,
            last_update_height: 0,
            reward_reserve: 0,
            positions: HashMap::new(),
        }
    }

    fn accrued(&self, now: Height) -> Result<u128> {
        if now <= self.last_update_height || self.total_staked == 0 || self.reward_rate == 0 {
            return Ok(self.acc_reward_per_share);
        }
        let elapsed = (now - self.last_update_height) as u128;
        let emitted = elapsed
            .checked_mul(self.reward_rate)
            .and_then(|value| value.checked_mul(PRECISION))
            .ok_or(AccessError::Overflow("access reward accumulator"))?;
        self.acc_reward_per_share
            .checked_add(emitted / self.total_staked)
            .ok_or(AccessError::Overflow("access reward accumulator"))
    }

    fn owed(position: &AccessStake, acc: u128) -> Result<Amount> {
        let fresh = mul_div(
            position.amount,
            acc.saturating_sub(position.reward_debt),
            PRECISION,
        )
        .ok_or(AccessError::Overflow("access reward"))?;
        position
            .unclaimed
            .checked_add(fresh)
            .ok_or(AccessError::Overflow("access reward"))
    }

    fn commit_accumulator(&mut self, acc: u128, now: Height) {
        self.acc_reward_per_share = acc;
        self.last_update_height = self.last_update_height.max(now);
    }

    /// Deposit `amount`, returning the position total and its unlock height.
    pub fn stake(
        &mut self,
        ledger: &mut dyn TokenLedger,
        account: AccountId,
        amount: Amount,
        now: Height,
    ) -> Result<(Amount, Height)> {
        if amount == 0 {
            return Err(AccessError::InvalidAmount(amount));
        }
        let acc = self.accrued(now)?;
        let mut position = self.positions.get(&account).cloned().unwrap_or_default();
        position.unclaimed = Self::owed(&position, acc)?;
        position.amount = position
            .amount
            .checked_add(amount)
            .ok_or(AccessError::Overflow("access stake"))?;
        position.reward_debt = acc;
        position.unlock_height = now
            .checked_add(self.lock)
            .ok_or(AccessError::Overflow("unlock height"))?;
        let total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(AccessError::Overflow("access total"))?;

        ledger.transfer_from(&self.asset, &self.custody, &account, &self.custody, amount)?;

        self.commit_accumulator(acc, now);
        self.total_staked = total_staked;
        let result = (position.amount, position.unlock_height);
        self.positions.insert(account, position);
        Ok(result)
    }

    /// Withdraw the whole position after its lock, returning `(principal, reward)`.
    pub fn unstake(
        &mut self,
        ledger: &mut dyn TokenLedger,
        account: AccountId,
        now: Height,
    ) -> Result<(Amount, Amount)> {
        let position = match self.positions.get(&account) {
            Some(position) if position.amount > 0 => position.clone(),
            _ => return Err(AccessError::NoAccessStake),
        };
        if now < position.unlock_height {
            return Err(AccessError::StillLocked {
                unlock_height: position.unlock_height,
                now,
            });
        }
        let acc = self.accrued(now)?;
        let reward = Self::owed(&position, acc)?;
        let reserve = self.withdraw_reserve(reward)?;
        let payout = position
            .amount
            .checked_add(reward)
            .ok_or(AccessError::Overflow("access payout"))?;

        ledger.transfer(&self.asset, &self.custody, &account, payout)?;

        self.commit_accumulator(acc, now);
        self.reward_reserve = reserve;
        self.total_staked = self.total_staked.saturating_sub(position.amount);
        self.positions.remove(&account);
        Ok((position.amount, reward))
    }

    /// Pay out settled rewards, keeping the position.
    pub fn claim(
        &mut self,
        ledger: &mut dyn TokenLedger,
        account: AccountId,
        now: Height,
    ) -> Result<Amount> {
        let position = self
            .positions
            .get(&account)
            .cloned()
            .ok_or(AccessError::NoAccessStake)?;
        let acc = self.accrued(now)?;
        let reward = Self::owed(&position, acc)?;
        let reserve = self.withdraw_reserve(reward)?;

        if reward > 0 {
            ledger.transfer(&self.asset, &self.custody, &account, reward)?;
        }

        self.commit_accumulator(acc, now);
        self.reward_reserve = reserve;
        if let Some(position) = self.positions.get_mut(&account) {
            position.unclaimed = 0;
            position.reward_debt = acc;
        }
        Ok(reward)
    }

    pub fn pending(&self, account: &AccountId, now: Height) -> Result<Amount> {
        match self.positions.get(account) {
            Some(position) => Self::owed(position, self.accrued(now)?),
            None => Ok(0),
        }
    }

    /// Add `amount` from `funder` to the reward reserve.
    pub fn fund(
        &mut self,
        ledger: &mut dyn TokenLedger,
        funder: AccountId,
        amount: Amount,
    ) -> Result<Amount> {
        if amount == 0 {
            return Err(AccessError::InvalidAmount(amount));
        }
        let reserve = self
            .reward_reserve
            .checked_add(amount)
            .ok_or(AccessError::Overflow("access reward reserve"))?;
        ledger.transfer_from(&self.asset, &self.custody, &funder, &self.custody, amount)?;
        self.reward_reserve = reserve;
        Ok(reserve)
    }

    /// Change the flat rate, settling the accumulator at the old rate first.
    pub fn set_reward_rate(&mut self, reward_rate: Amount, now: Height) -> Result<Amount> {
        let acc = self.accrued(now)?;
        self.commit_accumulator(acc, now);
        Ok(std::mem::replace(&mut self.reward_rate, reward_rate))
    }

    pub fn staked_of(&self, account: &AccountId) -> Amount {
        self.positions
            .get(account)
            .map(|position| position.amount)
            .unwrap_or(0)
    }

    pub fn position(&self, account: &AccountId) -> Option<&AccessStake> {
        self.positions.get(account)
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn reward_reserve(&self) -> Amount {
        self.reward_reserve
    }

    pub fn reward_rate(&self) -> Amount {
        self.reward_rate
    }

    pub fn asset(&self) -> AssetId {
        self.asset
    }

    pub fn custody_account(&self) -> AccountId {
        self.custody
    }

    fn withdraw_reserve(&self, reward: Amount) -> Result<Amount> {
        self.reward_reserve
            .checked_sub(reward)
            .ok_or(AccessError::InsufficientRewardReserve {
                required: reward,
                available: self.reward_reserve,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_types::{account_id, asset_id, InMemoryLedger};

    fn setup() -> (AccessStaking, InMemoryLedger, AccountId, AccountId) {
        let asset = asset_id("ACCESS");
        let staking = AccessStaking::new(asset, 10, 100);
        let alice = account_id("alice");
        let treasury = account_id("treasury");
        let mut ledger = InMemoryLedger::new();
        for who in [alice, treasury] {
            ledger.mint(&asset, &who, 1_000_000).unwrap();
            ledger
                .approve(&asset, &who, &staking.custody_account(), Amount::MAX)
                .unwrap();
        }
        (staking, ledger, alice, treasury)
    }

    #[test]
    fn test_flat_rate_accrual_and_claim() {
        let (mut staking, mut ledger, alice, treasury) = setup();
        staking.fund(&mut ledger, treasury, 10_000).unwrap();
        staking.stake(&mut ledger, alice, 500, 0).unwrap();

        assert_eq!(staking.pending(&alice, 50).unwrap(), 500);
        assert_eq!(staking.claim(&mut ledger, alice, 50).unwrap(), 500);
        assert_eq!(staking.claim(&mut ledger, alice, 50).unwrap(), 0);
        assert_eq!(staking.reward_reserve(), 9_500);
    }

    #[test]
    fn test_redeposit_keeps_rewards_and_restarts_lock() {
        let (mut staking, mut ledger, alice, treasury) = setup();
        staking.fund(&mut ledger, treasury, 10_000).unwrap();
        staking.stake(&mut ledger, alice, 500, 0).unwrap();
        let (total, unlock) = staking.stake(&mut ledger, alice, 500, 20).unwrap();
        assert_eq!(total, 1_000);
        assert_eq!(unlock, 120);
        assert_eq!(staking.position(&alice).unwrap().unclaimed, 200);

        assert!(matches!(
            staking.unstake(&mut ledger, alice, 119),
            Err(AccessError::StillLocked { .. })
        ));
        let (principal, reward) = staking.unstake(&mut ledger, alice, 120).unwrap();
        assert_eq!(principal, 1_000);
        assert_eq!(reward, 1_200);
        assert_eq!(staking.total_staked(), 0);
        assert_eq!(ledger.balance_of(&asset_id("ACCESS"), &alice), 1_001_200);
    }

    #[test]
    fn test_unstake_without_position() {
        let (mut staking, mut ledger, alice, _) = setup();
        assert!(matches!(
            staking.unstake(&mut ledger, alice, 10),
            Err(AccessError::NoAccessStake)
        ));
    }
}
