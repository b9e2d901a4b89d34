//! Staking data model: pools, stakes, multiplier bands and events.

use crate::errors::{Result, StakingError};
use lucid_types::{
    days, AccountId, Amount, AssetId, Height, StakeId, BASE_MULTIPLIER, MAX_MULTIPLIER,
};
use serde::{Deserialize, Serialize};

/// Smallest accepted stake.
pub const DEFAULT_MIN_STAKE: Amount = 100;

/// Largest accepted stake, per position and per account.
pub const DEFAULT_MAX_STAKE: Amount = 1_000_000_000_000_000_000_000_000_000;

/// Default pool lock bounds.
pub const DEFAULT_MIN_LOCK: Height = days(1);
pub const DEFAULT_MAX_LOCK: Height = days(730);

/// A lock duration threshold and the multiplier it unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierBand {
    /// Shortest lock duration (heights) that earns this band
    pub min_duration: Height,
    /// Multiplier in basis points
    pub multiplier: u32,
}

/// Ordered band table mapping lock durations to multipliers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiplierBands(Vec<MultiplierBand>);

impl Default for MultiplierBands {
    fn default() -> Self {
        Self(vec![
            MultiplierBand {
                min_duration: 0,
                multiplier: 12_000,
            },
            MultiplierBand {
                min_duration: days(30),
                multiplier: 15_000,
            },
            MultiplierBand {
                min_duration: days(180) + 1,
                multiplier: 25_000,
            },
        ])
    }
}

impl MultiplierBands {
    /// Build a validated band table.
    pub fn new(bands: Vec<MultiplierBand>) -> Result<Self> {
        let bands = Self(bands);
        bands.validate()?;
        Ok(bands)
    }

    /// Bands must start at duration 0, ascend strictly in duration, never
    /// lower the multiplier, and keep every value within
    /// `[BASE_MULTIPLIER, MAX_MULTIPLIER]`.
    pub fn validate(&self) -> Result<()> {
        let first = self
            .0
            .first()
            .ok_or_else(|| StakingError::InvalidBands("band table is empty".into()))?;
        if first.min_duration != 0 {
            return Err(StakingError::InvalidBands(
                "first band must start at duration 0".into(),
            ));
        }
        for band in &self.0 {
            if band.multiplier < BASE_MULTIPLIER || band.multiplier > MAX_MULTIPLIER {
                return Err(StakingError::InvalidBands(format!(
                    "multiplier {} outside [{}, {}]",
                    band.multiplier, BASE_MULTIPLIER, MAX_MULTIPLIER
                )));
            }
        }
        for pair in self.0.windows(2) {
            if pair[1].min_duration <= pair[0].min_duration {
                return Err(StakingError::InvalidBands(
                    "band durations must be strictly ascending".into(),
                ));
            }
            if pair[1].multiplier < pair[0].multiplier {
                return Err(StakingError::InvalidBands(
                    "longer locks cannot earn a lower multiplier".into(),
                ));
            }
        }
        Ok(())
    }

    /// Multiplier earned by a lock of `duration` heights.
    pub fn multiplier_for(&self, duration: Height) -> u32 {
        self.0
            .iter()
            .rev()
            .find(|band| band.min_duration <= duration)
            .map(|band| band.multiplier)
            .unwrap_or(BASE_MULTIPLIER)
    }

    pub fn as_slice(&self) -> &[MultiplierBand] {
        &self.0
    }
}

/// Component-wide staking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingParams {
    #[serde(with = "lucid_types::serde_amount")]
    pub min_stake: Amount,
    #[serde(with = "lucid_types::serde_amount")]
    pub max_stake: Amount,
    pub bands: MultiplierBands,
    /// Reward units credited per recorded participant action
    #[serde(with = "lucid_types::serde_amount")]
    pub action_bonus: Amount,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            min_stake: DEFAULT_MIN_STAKE,
            max_stake: DEFAULT_MAX_STAKE,
            bands: MultiplierBands::default(),
            action_bonus: 0,
        }
    }
}

impl StakingParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_stake == 0 {
            return Err(StakingError::InvalidParameter(
                "min_stake must be positive".into(),
            ));
        }
        if self.max_stake < self.min_stake {
            return Err(StakingError::InvalidParameter(format!(
                "max_stake {} is below min_stake {}",
                self.max_stake, self.min_stake
            )));
        }
        self.bands.validate()
    }
}

/// Per-asset pool state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub asset: AssetId,
    /// Sum of active stake principals
    pub total_staked: Amount,
    /// Accounts holding at least one active stake
    pub total_stakers: u64,
    /// Reward units emitted per height
    pub reward_rate: Amount,
    pub last_update_height: Height,
    /// Reward per unit of principal, scaled by `PRECISION`
    pub acc_reward_per_share: u128,
    pub min_lock: Height,
    pub max_lock: Height,
    /// Funded rewards not yet paid out
    pub reward_reserve: Amount,
}

/// A single locked deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub id: StakeId,
    pub owner: AccountId,
    pub asset: AssetId,
    pub principal: Amount,
    pub lock_duration: Height,
    pub start_height: Height,
    pub end_height: Height,
    /// Height of the last settlement
    pub checkpoint_height: Height,
    /// Pool accumulator value at the last settlement
    pub reward_debt: u128,
    pub multiplier: u32,
    pub active: bool,
}

/// Amounts returned to the owner when a stake is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payout {
    pub principal: Amount,
    pub reward: Amount,
    pub bonus: Amount,
}

impl Payout {
    pub fn total(&self) -> Amount {
        self.principal
            .saturating_add(self.reward)
            .saturating_add(self.bonus)
    }
}

/// An account's staking weight as seen by governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPosition {
    /// Active principal across all pools
    pub staked: Amount,
    /// Principal-weighted multiplier in basis points
    pub multiplier: u32,
}

impl Default for VotingPosition {
    fn default() -> Self {
        Self {
            staked: 0,
            multiplier: BASE_MULTIPLIER,
        }
    }
}

/// Events emitted by the staking component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingEvent {
    PoolCreated {
        asset: AssetId,
        reward_rate: Amount,
        min_lock: Height,
        max_lock: Height,
    },
    RewardRateUpdated {
        asset: AssetId,
        old_rate: Amount,
        new_rate: Amount,
    },
    LockBoundsUpdated {
        asset: AssetId,
        min_lock: Height,
        max_lock: Height,
    },
    MultiplierBandsUpdated {
        bands: Vec<MultiplierBand>,
    },
    RewardsFunded {
        asset: AssetId,
        funder: AccountId,
        amount: Amount,
        reserve_after: Amount,
    },
    Staked {
        stake_id: StakeId,
        owner: AccountId,
        asset: AssetId,
        amount: Amount,
        end_height: Height,
        multiplier: u32,
        total_staked_before: Amount,
        total_staked_after: Amount,
    },
    Unstaked {
        stake_id: StakeId,
        owner: AccountId,
        payout: Payout,
        total_staked_before: Amount,
        total_staked_after: Amount,
    },
    RewardsClaimed {
        stake_id: StakeId,
        owner: AccountId,
        reward: Amount,
        bonus: Amount,
    },
    StakeExtended {
        stake_id: StakeId,
        old_end_height: Height,
        new_end_height: Height,
        old_multiplier: u32,
        new_multiplier: u32,
        reward_paid: Amount,
    },
    RewardsCompounded {
        stake_id: StakeId,
        reward: Amount,
        principal_before: Amount,
        principal_after: Amount,
    },
    EmergencyWithdrawn {
        stake_id: StakeId,
        owner: AccountId,
        principal: Amount,
        forfeited: Amount,
    },
    ActionBonusCredited {
        account: AccountId,
        asset: AssetId,
        amount: Amount,
        balance: Amount,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },
}
