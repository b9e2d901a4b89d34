//! Access tiers, usage counters and permission bits.

use crate::errors::{AccessError, Result};
use lucid_types::{days, AccountId, Amount, Height, TierId, BASE_MULTIPLIER, MAX_MULTIPLIER};
use serde::{Deserialize, Serialize};

/// Most tiers that may exist at once, base tier included.
pub const MAX_TIERS: usize = 16;

/// Ceiling for any tier's daily action quota.
pub const MAX_DAILY_ACTIONS: u64 = 100_000;

/// Ceiling for any tier's storage quota (1 TiB).
pub const MAX_STORAGE: u64 = 1 << 40;

/// Identifier of the default tier.
pub const BASE_TIER_ID: TierId = 0;

/// Special permission bits.
pub mod permissions {
    /// Bypass the daily action quota.
    pub const UNLIMITED_ACTIONS: u32 = 1;
    /// Bypass the storage quota.
    pub const PREMIUM_STORAGE: u32 = 1 << 1;
    pub const PRIORITY_SUPPORT: u32 = 1 << 2;
    pub const BETA_FEATURES: u32 = 1 << 3;

    /// Every bit the component understands.
    pub const ALL: u32 = UNLIMITED_ACTIONS | PREMIUM_STORAGE | PRIORITY_SUPPORT | BETA_FEATURES;
}

/// Definition of a tier as supplied by governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    /// Balance plus stake needed to qualify
    #[serde(with = "lucid_types::serde_amount")]
    pub required_balance: Amount,
    /// Stake alone needed to qualify
    #[serde(with = "lucid_types::serde_amount")]
    pub required_staked: Amount,
    pub max_actions_per_day: u64,
    /// Storage budget in bytes
    pub storage_quota: u64,
    /// Priority weight in basis points
    pub priority_multiplier: u32,
    /// Permission bits every member of the tier enjoys
    #[serde(default)]
    pub special_permissions: u32,
}

impl TierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AccessError::InvalidTier("name must not be empty".into()));
        }
        if self.max_actions_per_day > MAX_DAILY_ACTIONS {
            return Err(AccessError::ActionLimitTooHigh {
                value: self.max_actions_per_day,
                max: MAX_DAILY_ACTIONS,
            });
        }
        if self.storage_quota > MAX_STORAGE {
            return Err(AccessError::StorageQuotaTooHigh {
                value: self.storage_quota,
                max: MAX_STORAGE,
            });
        }
        if self.priority_multiplier < BASE_MULTIPLIER || self.priority_multiplier > MAX_MULTIPLIER {
            return Err(AccessError::InvalidTier(format!(
                "priority multiplier {} outside [{}, {}]",
                self.priority_multiplier, BASE_MULTIPLIER, MAX_MULTIPLIER
            )));
        }
        if self.special_permissions & !permissions::ALL != 0 {
            return Err(AccessError::InvalidPermission(
                self.special_permissions & !permissions::ALL,
            ));
        }
        Ok(())
    }

    /// The default tier every account falls back to.
    pub fn basic() -> Self {
        Self {
            name: "Basic".to_string(),
            required_balance: 0,
            required_staked: 0,
            max_actions_per_day: 10,
            storage_quota: 100 * 1024 * 1024,
            priority_multiplier: BASE_MULTIPLIER,
            special_permissions: 0,
        }
    }
}

/// A rung of the tier ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTier {
    pub id: TierId,
    pub name: String,
    #[serde(with = "lucid_types::serde_amount")]
    pub required_balance: Amount,
    #[serde(with = "lucid_types::serde_amount")]
    pub required_staked: Amount,
    pub max_actions_per_day: u64,
    pub storage_quota: u64,
    pub priority_multiplier: u32,
    pub special_permissions: u32,
    pub active: bool,
}

impl AccessTier {
    pub fn from_config(id: TierId, config: TierConfig) -> Self {
        Self {
            id,
            name: config.name,
            required_balance: config.required_balance,
            required_staked: config.required_staked,
            max_actions_per_day: config.max_actions_per_day,
            storage_quota: config.storage_quota,
            priority_multiplier: config.priority_multiplier,
            special_permissions: config.special_permissions,
            active: true,
        }
    }

    /// Whether a position of `total` (balance plus stake) and `staked` qualifies.
    pub fn admits(&self, total: Amount, staked: Amount) -> bool {
        self.active && total >= self.required_balance && staked >= self.required_staked
    }
}

/// Persisted per-account usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    /// Day index the daily counter belongs to
    pub day: u64,
    pub actions_today: u64,
    /// Cumulative storage in bytes
    pub storage_used: u64,
    pub total_actions: u64,
    /// Override bits granted by governance
    pub special_permissions: u32,
}

impl UserAccess {
    /// Actions already recorded on `day`.
    pub fn actions_on(&self, day: u64) -> u64 {
        if self.day == day {
            self.actions_today
        } else {
            0
        }
    }
}

/// Why a gated action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    DailyLimitExceeded,
    StorageLimitExceeded,
}

/// Outcome of a gated-action check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub tier: TierId,
    pub reason: Option<DenyReason>,
}

impl GateDecision {
    pub fn allow(tier: TierId) -> Self {
        Self {
            allowed: true,
            tier,
            reason: None,
        }
    }

    pub fn deny(tier: TierId, reason: DenyReason) -> Self {
        Self {
            allowed: false,
            tier,
            reason: Some(reason),
        }
    }
}

/// Component parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessParams {
    /// Definition of tier 0; requirements are forced to zero
    pub base_tier: TierConfig,
    /// Additional tiers installed at construction, in id order
    pub tiers: Vec<TierConfig>,
    /// Reward units per height for the access staking pool
    #[serde(with = "lucid_types::serde_amount")]
    pub staking_reward_rate: Amount,
    /// Lock applied to every access stake deposit
    pub staking_lock: Height,
}

impl Default for AccessParams {
    fn default() -> Self {
        Self {
            base_tier: TierConfig::basic(),
            tiers: Vec::new(),
            staking_reward_rate: 1,
            staking_lock: days(1),
        }
    }
}

impl AccessParams {
    pub fn validate(&self) -> Result<()> {
        if self.base_tier.required_balance != 0 || self.base_tier.required_staked != 0 {
            return Err(AccessError::BaseTierImmutable);
        }
        self.base_tier.validate()?;
        if self.tiers.len() + 1 > MAX_TIERS {
            return Err(AccessError::TooManyTiers { max: MAX_TIERS });
        }
        for tier in &self.tiers {
            tier.validate()?;
        }
        if self.staking_lock == 0 {
            return Err(AccessError::InvalidParameter(
                "staking_lock must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Events emitted by the access component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessEvent {
    TierCreated {
        tier: AccessTier,
    },
    TierUpdated {
        before: AccessTier,
        after: AccessTier,
    },
    TierActivationChanged {
        tier_id: TierId,
        active: bool,
    },
    SpecialAccessGranted {
        account: AccountId,
        bits: u32,
        permissions_after: u32,
        reason: String,
    },
    SpecialAccessRevoked {
        account: AccountId,
        bits: u32,
        permissions_after: u32,
        reason: String,
    },
    GatedActionRecorded {
        account: AccountId,
        size_cost: u64,
        actions_today: u64,
        storage_used: u64,
    },
    StorageReleased {
        account: AccountId,
        size: u64,
        storage_used: u64,
    },
    AccessStaked {
        account: AccountId,
        amount: Amount,
        total_staked: Amount,
        unlock_height: Height,
    },
    AccessUnstaked {
        account: AccountId,
        amount: Amount,
        reward: Amount,
    },
    AccessRewardsClaimed {
        account: AccountId,
        reward: Amount,
    },
    AccessRewardsFunded {
        funder: AccountId,
        amount: Amount,
        reserve_after: Amount,
    },
    AccessRewardRateUpdated {
        old_rate: Amount,
        new_rate: Amount,
    },
}
