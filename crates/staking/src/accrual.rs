//! Reward-per-share arithmetic.

use crate::errors::{Result, StakingError};
use crate::types::{Pool, Stake};
use lucid_types::{mul_div, Amount, Height, BASE_MULTIPLIER, PRECISION};

/// Advance an accumulator by `elapsed` heights at `rate` over `total_staked`.
///
/// An empty pool accrues nothing; the emission for those heights is simply
/// not distributed.
pub fn accumulate(acc: u128, elapsed: Height, rate: Amount, total_staked: Amount) -> Result<u128> {
    if total_staked == 0 || elapsed == 0 || rate == 0 {
        return Ok(acc);
    }
    let emitted = (elapsed as u128)
        .checked_mul(rate)
        .and_then(|value| value.checked_mul(PRECISION))
        .ok_or(StakingError::Overflow("reward accumulator"))?;
    acc.checked_add(emitted / total_staked)
        .ok_or(StakingError::Overflow("reward accumulator"))
}

/// Reward owed for `principal` between two accumulator values, scaled by
/// `multiplier`.
pub fn owed_between(principal: Amount, acc: u128, debt: u128, multiplier: u32) -> Result<Amount> {
    let delta = acc.saturating_sub(debt);
    let base = mul_div(principal, delta, PRECISION).ok_or(StakingError::Overflow("owed reward"))?;
    mul_div(base, multiplier as u128, BASE_MULTIPLIER as u128)
        .ok_or(StakingError::Overflow("owed reward"))
}

impl Pool {
    /// Copy of the pool with its accumulator brought up to `now`.
    pub fn accrued(&self, now: Height) -> Result<Pool> {
        let mut pool = self.clone();
        if now > pool.last_update_height {
            let elapsed = now - pool.last_update_height;
            pool.acc_reward_per_share = accumulate(
                pool.acc_reward_per_share,
                elapsed,
                pool.reward_rate,
                pool.total_staked,
            )?;
            pool.last_update_height = now;
        }
        Ok(pool)
    }
}

impl Stake {
    /// Reward owed against an already accrued pool.
    pub fn owed(&self, pool: &Pool) -> Result<Amount> {
        if !self.active {
            return Ok(0);
        }
        owed_between(
            self.principal,
            pool.acc_reward_per_share,
            self.reward_debt,
            self.multiplier,
        )
    }
}
