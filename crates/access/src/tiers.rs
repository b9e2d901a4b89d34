//! The access-tier component.

use crate::errors::{AccessError, Result};
use crate::staking::AccessStaking;
use crate::types::*;
use lucid_types::{
    day_index, short_id, AccountId, Amount, AssetId, AuthContext, EventLog, Height, Role,
    StakeView, TierId, TokenLedger,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Tier ladder, usage counters, permission overrides and access staking.
#[derive(Debug, Clone)]
pub struct AccessTiers {
    asset: AssetId,
    tiers: BTreeMap<TierId, AccessTier>,
    next_tier_id: TierId,
    users: HashMap<AccountId, UserAccess>,
    staking: AccessStaking,
    events: EventLog<AccessEvent>,
}

impl AccessTiers {
    /// Build the component for `asset`, installing the base tier and any
    /// configured tiers.
    pub fn new(asset: AssetId, params: AccessParams) -> Result<Self> {
        params.validate()?;
        let mut tiers = BTreeMap::new();
        tiers.insert(
            BASE_TIER_ID,
            AccessTier::from_config(BASE_TIER_ID, params.base_tier),
        );
        let mut component = Self {
            asset,
            tiers,
            next_tier_id: BASE_TIER_ID + 1,
            users: HashMap::new(),
            staking: AccessStaking::new(asset, params.staking_reward_rate, params.staking_lock),
            events: EventLog::new(),
        };
        for config in params.tiers {
            component.check_unique_requirement(&config, None)?;
            let id = component.next_tier_id;
            component.tiers.insert(id, AccessTier::from_config(id, config));
            component.next_tier_id += 1;
        }
        Ok(component)
    }

    // ---------------------------------------------------------------------
    // Tier resolution
    // ---------------------------------------------------------------------

    /// Balance plus stake, and stake alone, for `account`.
    ///
    /// Stake counts both the main staking pool and the local access pool.
    pub fn position_of(
        &self,
        account: &AccountId,
        ledger: &dyn TokenLedger,
        stakes: &dyn StakeView,
    ) -> (Amount, Amount) {
        let staked = stakes
            .staked_amount(account)
            .saturating_add(self.staking.staked_of(account));
        let total = ledger.balance_of(&self.asset, account).saturating_add(staked);
        (total, staked)
    }

    /// Highest active tier the account qualifies for right now.
    pub fn get_user_tier(
        &self,
        account: &AccountId,
        ledger: &dyn TokenLedger,
        stakes: &dyn StakeView,
    ) -> TierId {
        let (total, staked) = self.position_of(account, ledger, stakes);
        self.tier_for(total, staked)
    }

    /// Resolve a tier for an explicit position.
    pub fn tier_for(&self, total: Amount, staked: Amount) -> TierId {
        self.tiers
            .values()
            .filter(|tier| tier.id == BASE_TIER_ID || tier.admits(total, staked))
            .max_by_key(|tier| (tier.required_balance, tier.required_staked, tier.id))
            .map(|tier| tier.id)
            .unwrap_or(BASE_TIER_ID)
    }

    // ---------------------------------------------------------------------
    // Gated actions
    // ---------------------------------------------------------------------

    /// Check whether an action costing `size_cost` bytes fits the account's
    /// quotas. Does not record anything.
    pub fn can_perform_gated_action(
        &self,
        account: &AccountId,
        size_cost: u64,
        now: Height,
        ledger: &dyn TokenLedger,
        stakes: &dyn StakeView,
    ) -> GateDecision {
        let tier_id = self.get_user_tier(account, ledger, stakes);
        let tier = match self.tiers.get(&tier_id) {
            Some(tier) => tier,
            None => return GateDecision::deny(tier_id, DenyReason::DailyLimitExceeded),
        };
        let usage = self.users.get(account).cloned().unwrap_or_default();
        let granted = usage.special_permissions | tier.special_permissions;

        if granted & permissions::UNLIMITED_ACTIONS == 0 {
            let used = usage.actions_on(day_index(now));
            if used >= tier.max_actions_per_day {
                return GateDecision::deny(tier_id, DenyReason::DailyLimitExceeded);
            }
        }
        if granted & permissions::PREMIUM_STORAGE == 0 {
            let needed = usage.storage_used.saturating_add(size_cost);
            if needed > tier.storage_quota {
                return GateDecision::deny(tier_id, DenyReason::StorageLimitExceeded);
            }
        }
        GateDecision::allow(tier_id)
    }

    /// Count one action and `size_cost` bytes against the account.
    ///
    /// Limits are not enforced here; callers check first.
    pub fn record_gated_action(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        size_cost: u64,
        now: Height,
    ) -> Result<()> {
        self.require(auth, Role::Recorder, "record_gated_action")?;
        let today = day_index(now);
        let mut usage = self.users.get(&account).cloned().unwrap_or_default();
        if usage.day != today {
            usage.day = today;
            usage.actions_today = 0;
        }
        usage.actions_today = usage
            .actions_today
            .checked_add(1)
            .ok_or(AccessError::Overflow("daily actions"))?;
        usage.total_actions = usage
            .total_actions
            .checked_add(1)
            .ok_or(AccessError::Overflow("total actions"))?;
        usage.storage_used = usage
            .storage_used
            .checked_add(size_cost)
            .ok_or(AccessError::Overflow("storage used"))?;

        debug!(
            target: "access",
            "action recorded for {}: {} today, {} bytes stored",
            short_id(&account),
            usage.actions_today,
            usage.storage_used
        );
        self.events.emit(
            now,
            AccessEvent::GatedActionRecorded {
                account,
                size_cost,
                actions_today: usage.actions_today,
                storage_used: usage.storage_used,
            },
        );
        self.users.insert(account, usage);
        Ok(())
    }

    /// Give back storage when content is removed.
    pub fn release_storage(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        size: u64,
        now: Height,
    ) -> Result<u64> {
        self.require(auth, Role::Recorder, "release_storage")?;
        let usage = self.users.entry(account).or_default();
        usage.storage_used = usage.storage_used.saturating_sub(size);
        let storage_used = usage.storage_used;

        self.events.emit(
            now,
            AccessEvent::StorageReleased {
                account,
                size,
                storage_used,
            },
        );
        Ok(storage_used)
    }

    /// Actions left today, `None` when the account is unlimited.
    pub fn remaining_actions(
        &self,
        account: &AccountId,
        now: Height,
        ledger: &dyn TokenLedger,
        stakes: &dyn StakeView,
    ) -> Option<u64> {
        let tier = self.tiers.get(&self.get_user_tier(account, ledger, stakes))?;
        let usage = self.users.get(account).cloned().unwrap_or_default();
        if (usage.special_permissions | tier.special_permissions) & permissions::UNLIMITED_ACTIONS
            != 0
        {
            return None;
        }
        Some(
            tier.max_actions_per_day
                .saturating_sub(usage.actions_on(day_index(now))),
        )
    }

    // ---------------------------------------------------------------------
    // Ladder administration
    // ---------------------------------------------------------------------

    pub fn create_tier(&mut self, auth: &AuthContext, config: TierConfig, now: Height) -> Result<TierId> {
        self.require(auth, Role::Governance, "create_tier")?;
        self.check_tier_change(None, &config)?;

        let id = self.next_tier_id;
        let tier = AccessTier::from_config(id, config);
        self.tiers.insert(id, tier.clone());
        self.next_tier_id += 1;

        info!(
            target: "access",
            "tier {} '{}' created: balance {}, staked {}",
            id,
            tier.name,
            tier.required_balance,
            tier.required_staked
        );
        self.events.emit(now, AccessEvent::TierCreated { tier });
        Ok(id)
    }

    pub fn update_tier(
        &mut self,
        auth: &AuthContext,
        tier_id: TierId,
        config: TierConfig,
        now: Height,
    ) -> Result<()> {
        self.require(auth, Role::Governance, "update_tier")?;
        self.check_tier_change(Some(tier_id), &config)?;
        let before = self
            .tiers
            .get(&tier_id)
            .cloned()
            .ok_or(AccessError::UnknownTier(tier_id))?;

        let mut after = AccessTier::from_config(tier_id, config);
        after.active = before.active;
        self.tiers.insert(tier_id, after.clone());

        info!(target: "access", "tier {} '{}' updated", tier_id, after.name);
        self.events
            .emit(now, AccessEvent::TierUpdated { before, after });
        Ok(())
    }

    /// Check `config` as a new tier (`tier_id` is `None`) or as the
    /// replacement of tier `tier_id`, without changing anything.
    pub fn check_tier_change(&self, tier_id: Option<TierId>, config: &TierConfig) -> Result<()> {
        config.validate()?;
        match tier_id {
            None if self.tiers.len() >= MAX_TIERS => {
                return Err(AccessError::TooManyTiers { max: MAX_TIERS });
            }
            None => {}
            Some(id) if !self.tiers.contains_key(&id) => return Err(AccessError::UnknownTier(id)),
            Some(id) => {
                if id == BASE_TIER_ID && (config.required_balance != 0 || config.required_staked != 0) {
                    return Err(AccessError::BaseTierImmutable);
                }
            }
        }
        self.check_unique_requirement(config, tier_id)
    }

    pub fn set_tier_active(
        &mut self,
        auth: &AuthContext,
        tier_id: TierId,
        active: bool,
        now: Height,
    ) -> Result<()> {
        self.require(auth, Role::Governance, "set_tier_active")?;
        if tier_id == BASE_TIER_ID && !active {
            return Err(AccessError::BaseTierImmutable);
        }
        let tier = self
            .tiers
            .get_mut(&tier_id)
            .ok_or(AccessError::UnknownTier(tier_id))?;
        tier.active = active;

        info!(target: "access", "tier {} active = {}", tier_id, active);
        self.events
            .emit(now, AccessEvent::TierActivationChanged { tier_id, active });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Special access
    // ---------------------------------------------------------------------

    pub fn grant_special_access(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        bits: u32,
        reason: &str,
        now: Height,
    ) -> Result<u32> {
        self.require(auth, Role::Governance, "grant_special_access")?;
        check_permission_change(bits, reason)?;
        let usage = self.users.entry(account).or_default();
        usage.special_permissions |= bits;
        let permissions_after = usage.special_permissions;

        info!(
            target: "access",
            "special access {:#x} granted to {}: {}",
            bits,
            short_id(&account),
            reason
        );
        self.events.emit(
            now,
            AccessEvent::SpecialAccessGranted {
                account,
                bits,
                permissions_after,
                reason: reason.to_string(),
            },
        );
        Ok(permissions_after)
    }

    pub fn revoke_special_access(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        bits: u32,
        reason: &str,
        now: Height,
    ) -> Result<u32> {
        self.require(auth, Role::Governance, "revoke_special_access")?;
        check_permission_change(bits, reason)?;
        let usage = self.users.entry(account).or_default();
        usage.special_permissions &= !bits;
        let permissions_after = usage.special_permissions;

        info!(
            target: "access",
            "special access {:#x} revoked from {}: {}",
            bits,
            short_id(&account),
            reason
        );
        self.events.emit(
            now,
            AccessEvent::SpecialAccessRevoked {
                account,
                bits,
                permissions_after,
                reason: reason.to_string(),
            },
        );
        Ok(permissions_after)
    }

    // ---------------------------------------------------------------------
    // Access staking
    // ---------------------------------------------------------------------

    pub fn stake_access(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        amount: Amount,
        now: Height,
    ) -> Result<Amount> {
        let (total_staked, unlock_height) = self.staking.stake(ledger, auth.caller, amount, now)?;

        info!(
            target: "access",
            "{} staked {} for access (total {}, unlocks at {})",
            short_id(&auth.caller),
            amount,
            total_staked,
            unlock_height
        );
        self.events.emit(
            now,
            AccessEvent::AccessStaked {
                account: auth.caller,
                amount,
                total_staked,
                unlock_height,
            },
        );
        Ok(total_staked)
    }

    pub fn unstake_access(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        now: Height,
    ) -> Result<(Amount, Amount)> {
        let (amount, reward) = self.staking.unstake(ledger, auth.caller, now)?;

        info!(
            target: "access",
            "{} withdrew access stake {} with reward {}",
            short_id(&auth.caller),
            amount,
            reward
        );
        self.events.emit(
            now,
            AccessEvent::AccessUnstaked {
                account: auth.caller,
                amount,
                reward,
            },
        );
        Ok((amount, reward))
    }

    pub fn claim_access_rewards(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        now: Height,
    ) -> Result<Amount> {
        let reward = self.staking.claim(ledger, auth.caller, now)?;
        self.events.emit(
            now,
            AccessEvent::AccessRewardsClaimed {
                account: auth.caller,
                reward,
            },
        );
        Ok(reward)
    }

    pub fn pending_access_rewards(&self, account: &AccountId, now: Height) -> Result<Amount> {
        self.staking.pending(account, now)
    }

    pub fn fund_access_rewards(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        amount: Amount,
        now: Height,
    ) -> Result<Amount> {
        let reserve_after = self.staking.fund(ledger, auth.caller, amount)?;
        self.events.emit(
            now,
            AccessEvent::AccessRewardsFunded {
                funder: auth.caller,
                amount,
                reserve_after,
            },
        );
        Ok(reserve_after)
    }

    pub fn set_access_reward_rate(
        &mut self,
        auth: &AuthContext,
        reward_rate: Amount,
        now: Height,
    ) -> Result<()> {
        self.require(auth, Role::Governance, "set_access_reward_rate")?;
        let old_rate = self.staking.set_reward_rate(reward_rate, now)?;

        info!(
            target: "access",
            "access reward rate changed {} -> {}",
            old_rate,
            reward_rate
        );
        self.events.emit(
            now,
            AccessEvent::AccessRewardRateUpdated {
                old_rate,
                new_rate: reward_rate,
            },
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn tier(&self, tier_id: TierId) -> Option<&AccessTier> {
        self.tiers.get(&tier_id)
    }

    /// Every tier, in id order.
    pub fn tiers(&self) -> impl Iterator<Item = &AccessTier> {
        self.tiers.values()
    }

    pub fn user_access(&self, account: &AccountId) -> UserAccess {
        self.users.get(account).cloned().unwrap_or_default()
    }

    pub fn special_permissions(&self, account: &AccountId) -> u32 {
        self.users
            .get(account)
            .map(|usage| usage.special_permissions)
            .unwrap_or(0)
    }

    pub fn access_staking(&self) -> &AccessStaking {
        &self.staking
    }

    pub fn asset(&self) -> AssetId {
        self.asset
    }

    pub fn events(&self) -> &EventLog<AccessEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog<AccessEvent> {
        &mut self.events
    }

    fn require(&self, auth: &AuthContext, role: Role, operation: &str) -> Result<()> {
        auth.require(role).map_err(|err| {
            warn!(target: "access", "rejected {}: {}", operation, err);
            AccessError::from(err)
        })
    }

    /// The ladder is totally ordered by required balance, so no two tiers
    /// may share one.
    fn check_unique_requirement(&self, config: &TierConfig, except: Option<TierId>) -> Result<()> {
        let clash = self.tiers.values().any(|tier| {
            Some(tier.id) != except && tier.required_balance == config.required_balance
        });
        if clash {
            return Err(AccessError::InvalidTier(format!(
                "a tier already requires balance {}",
                config.required_balance
            )));
        }
        Ok(())
    }
}

/// A permission grant or revocation needs known, non-empty bits and a reason.
pub fn check_permission_change(bits: u32, reason: &str) -> Result<()> {
    if bits == 0 || bits & !permissions::ALL != 0 {
        return Err(AccessError::InvalidPermission(bits));
    }
    if reason.trim().is_empty() {
        return Err(AccessError::MissingReason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_types::{account_id, asset_id, hours, Classify, ErrorKind, InMemoryLedger, NoStakes};

    fn governance() -> AuthContext {
        AuthContext::with_roles(account_id("governance"), &[Role::Governance])
    }

    fn recorder() -> AuthContext {
        AuthContext::with_roles(account_id("recorder"), &[Role::Recorder])
    }

    fn tier_config(name: &str, balance: Amount, staked: Amount, actions: u64, storage: u64) -> TierConfig {
        TierConfig {
            name: name.to_string(),
            required_balance: balance,
            required_staked: staked,
            max_actions_per_day: actions,
            storage_quota: storage,
            priority_multiplier: 10_000,
            special_permissions: 0,
        }
    }

    fn ladder() -> AccessTiers {
        let params = AccessParams {
            tiers: vec![
                tier_config("Silver", 1_000, 0, 50, 1_000),
                tier_config("Gold", 5_000, 2_000, 500, 10_000),
            ],
            ..Default::default()
        };
        AccessTiers::new(asset_id("LUCID"), params).unwrap()
    }

    #[test]
    fn test_tier_resolution_from_position() {
        let tiers = ladder();
        assert_eq!(tiers.tier_for(0, 0), 0);
        assert_eq!(tiers.tier_for(1_000, 0), 1);
        assert_eq!(tiers.tier_for(8_500, 2_500), 2);
        assert_eq!(tiers.tier_for(7_000, 1_000), 1);
    }

    #[test]
    fn test_inactive_tier_is_skipped() {
        let mut tiers = ladder();
        tiers.set_tier_active(&governance(), 2, false, 1).unwrap();
        assert_eq!(tiers.tier_for(8_500, 2_500), 1);
        let err = tiers.set_tier_active(&governance(), 0, false, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_daily_limit_and_reset() {
        let mut tiers = ladder();
        let ledger = InMemoryLedger::new();
        let alice = account_id("alice");
        for _ in 0..10 {
            let decision = tiers.can_perform_gated_action(&alice, 0, 5, &ledger, &NoStakes);
            assert!(decision.allowed);
            tiers.record_gated_action(&recorder(), alice, 0, 5).unwrap();
        }
        let decision = tiers.can_perform_gated_action(&alice, 0, 5, &ledger, &NoStakes);
        assert_eq!(decision.reason, Some(DenyReason::DailyLimitExceeded));
        assert_eq!(tiers.remaining_actions(&alice, 5, &ledger, &NoStakes), Some(0));

        // next day the counter starts over
        let tomorrow = lucid_types::days(1) + 5;
        assert!(tiers
            .can_perform_gated_action(&alice, 0, tomorrow, &ledger, &NoStakes)
            .allowed);
        assert_eq!(tiers.user_access(&alice).total_actions, 10);
    }

    #[test]
    fn test_storage_limit_and_premium_override() {
        let mut tiers = ladder();
        let ledger = InMemoryLedger::new();
        let alice = account_id("alice");
        let quota = TierConfig::basic().storage_quota;

        tiers.record_gated_action(&recorder(), alice, quota, 1).unwrap();
        let decision = tiers.can_perform_gated_action(&alice, 1, 1, &ledger, &NoStakes);
        assert_eq!(decision.reason, Some(DenyReason::StorageLimitExceeded));

        tiers
            .grant_special_access(&governance(), alice, permissions::PREMIUM_STORAGE, "partner", 2)
            .unwrap();
        assert!(tiers.can_perform_gated_action(&alice, 1, 2, &ledger, &NoStakes).allowed);

        tiers
            .revoke_special_access(&governance(), alice, permissions::PREMIUM_STORAGE, "expired", 3)
            .unwrap();
        assert!(!tiers.can_perform_gated_action(&alice, 1, 3, &ledger, &NoStakes).allowed);

        assert_eq!(tiers.release_storage(&recorder(), alice, quota, 4).unwrap(), 0);
        assert!(tiers.can_perform_gated_action(&alice, 1, 4, &ledger, &NoStakes).allowed);
    }

    #[test]
    fn test_unlimited_actions_override() {
        let mut tiers = ladder();
        let ledger = InMemoryLedger::new();
        let alice = account_id("alice");
        tiers
            .grant_special_access(&governance(), alice, permissions::UNLIMITED_ACTIONS, "ops", 0)
            .unwrap();
        for _ in 0..20 {
            tiers.record_gated_action(&recorder(), alice, 0, hours(1)).unwrap();
        }
        assert!(tiers
            .can_perform_gated_action(&alice, 0, hours(1), &ledger, &NoStakes)
            .allowed);
        assert_eq!(tiers.remaining_actions(&alice, hours(1), &ledger, &NoStakes), None);
    }

    #[test]
    fn test_special_access_validation() {
        let mut tiers = ladder();
        let alice = account_id("alice");
        assert!(matches!(
            tiers.grant_special_access(&governance(), alice, 1 << 9, "x", 0),
            Err(AccessError::InvalidPermission(_))
        ));
        assert!(matches!(
            tiers.grant_special_access(&governance(), alice, permissions::BETA_FEATURES, " ", 0),
            Err(AccessError::MissingReason)
        ));
        assert!(matches!(
            tiers.grant_special_access(&recorder(), alice, permissions::BETA_FEATURES, "x", 0),
            Err(AccessError::Unauthorized(_))
        ));
        assert_eq!(tiers.special_permissions(&alice), 0);
    }

    #[test]
    fn test_tier_bounds_enforced() {
        let mut tiers = ladder();
        let err = tiers
            .create_tier(&governance(), tier_config("Huge", 9_000, 0, MAX_DAILY_ACTIONS + 1, 0), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);

        let err = tiers
            .create_tier(&governance(), tier_config("Disk", 9_000, 0, 1, MAX_STORAGE + 1), 0)
            .unwrap_err();
        assert!(matches!(err, AccessError::StorageQuotaTooHigh { .. }));

        let err = tiers
            .create_tier(&governance(), tier_config("Dup", 1_000, 0, 1, 1), 0)
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidTier(_)));

        for i in 0..13 {
            tiers
                .create_tier(&governance(), tier_config("Extra", 10_000 + i, 0, 1, 1), 0)
                .unwrap();
        }
        assert_eq!(tiers.tiers().count(), MAX_TIERS);
        let err = tiers
            .create_tier(&governance(), tier_config("Overflow", 99_999, 0, 1, 1), 0)
            .unwrap_err();
        assert!(matches!(err, AccessError::TooManyTiers { .. }));
    }

    #[test]
    fn test_update_tier_keeps_base_requirements_zero() {
        let mut tiers = ladder();
        let err = tiers
            .update_tier(&governance(), 0, tier_config("Basic", 10, 0, 10, 10), 0)
            .unwrap_err();
        assert!(matches!(err, AccessError::BaseTierImmutable));

        tiers
            .update_tier(&governance(), 1, tier_config("Silver+", 1_500, 0, 75, 2_000), 1)
            .unwrap();
        let silver = tiers.tier(1).unwrap();
        assert_eq!(silver.name, "Silver+");
        assert_eq!(silver.max_actions_per_day, 75);
        assert!(matches!(
            tiers.events().last(),
            Some(AccessEvent::TierUpdated { .. })
        ));
    }

    #[test]
    fn test_access_stake_raises_tier() {
        let asset = asset_id("LUCID");
        let mut tiers = ladder();
        let alice = AuthContext::user(account_id("alice"));
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&asset, &alice.caller, 6_000).unwrap();
        ledger
            .approve(
                &asset,
                &alice.caller,
                &tiers.access_staking().custody_account(),
                Amount::MAX,
            )
            .unwrap();
        assert_eq!(tiers.get_user_tier(&alice.caller, &ledger, &NoStakes), 1);

        tiers.stake_access(&alice, &mut ledger, 2_000, 10).unwrap();
        assert_eq!(tiers.get_user_tier(&alice.caller, &ledger, &NoStakes), 2);

        let err = tiers.unstake_access(&alice, &mut ledger, 11).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }
}
