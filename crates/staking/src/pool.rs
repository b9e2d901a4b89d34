//! The staking component.
//!
//! Every mutating call follows the same shape: validate, compute the new
//! pool and stake state on copies, perform the ledger transfer, then commit.
//! A failed check or a refused transfer leaves the component untouched.

use crate::errors::{Result, StakingError};
use crate::types::*;
use lucid_types::{
    module_account_id, short_id, AccountId, Amount, AssetId, AuthContext, Checkpoints, EventLog,
    Height, Role, StakeId, StakeView, TokenLedger, BASE_MULTIPLIER,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Label of the custody account holding principal and reward reserves.
pub const STAKING_MODULE: &str = "staking";

/// Staking positions across one pool per supported asset.
#[derive(Debug, Clone)]
pub struct StakingPool {
    params: StakingParams,
    custody: AccountId,
    pools: BTreeMap<AssetId, Pool>,
    stakes: BTreeMap<StakeId, Stake>,
    owner_index: HashMap<AccountId, Vec<StakeId>>,
    bonus_balances: HashMap<(AccountId, AssetId), Amount>,
    positions: HashMap<AccountId, Checkpoints<VotingPosition>>,
    next_stake_id: StakeId,
    paused: bool,
    events: EventLog<StakingEvent>,
}

impl StakingPool {
    pub fn new(params: StakingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            custody: module_account_id(STAKING_MODULE),
            pools: BTreeMap::new(),
            stakes: BTreeMap::new(),
            owner_index: HashMap::new(),
            bonus_balances: HashMap::new(),
            positions: HashMap::new(),
            next_stake_id: 1,
            paused: false,
            events: EventLog::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    /// Open a pool for `asset`.
    pub fn create_pool(
        &mut self,
        auth: &AuthContext,
        asset: AssetId,
        reward_rate: Amount,
        min_lock: Height,
        max_lock: Height,
        now: Height,
    ) -> Result<()> {
        self.require_admin(auth, "create_pool")?;
        if self.pools.contains_key(&asset) {
            return Err(StakingError::PoolExists(short_id(&asset).to_string()));
        }
        validate_lock_bounds(min_lock, max_lock)?;

        self.pools.insert(
            asset,
            Pool {
                asset,
                total_staked: 0,
                total_stakers: 0,
                reward_rate,
                last_update_height: now,
                acc_reward_per_share: 0,
                min_lock,
                max_lock,
                reward_reserve: 0,
            },
        );
        info!(
            target: "staking",
            "pool created for {}: rate {}/height, lock [{}, {}]",
            short_id(&asset),
            reward_rate,
            min_lock,
            max_lock
        );
        self.events.emit(
            now,
            StakingEvent::PoolCreated {
                asset,
                reward_rate,
                min_lock,
                max_lock,
            },
        );
        Ok(())
    }

    /// Change the emission rate. Accrual up to `now` uses the old rate.
    pub fn set_reward_rate(
        &mut self,
        auth: &AuthContext,
        asset: AssetId,
        reward_rate: Amount,
        now: Height,
    ) -> Result<()> {
        self.require_admin(auth, "set_reward_rate")?;
        let mut pool = self.pool_of(&asset)?.accrued(now)?;
        let old_rate = pool.reward_rate;
        pool.reward_rate = reward_rate;
        self.pools.insert(asset, pool);

        info!(
            target: "staking",
            "reward rate for {} changed {} -> {}",
            short_id(&asset),
            old_rate,
            reward_rate
        );
        self.events.emit(
            now,
            StakingEvent::RewardRateUpdated {
                asset,
                old_rate,
                new_rate: reward_rate,
            },
        );
        Ok(())
    }

    /// Change the accepted lock range for new stakes and extensions.
    pub fn set_lock_bounds(
        &mut self,
        auth: &AuthContext,
        asset: AssetId,
        min_lock: Height,
        max_lock: Height,
        now: Height,
    ) -> Result<()> {
        self.require_admin(auth, "set_lock_bounds")?;
        validate_lock_bounds(min_lock, max_lock)?;
        let pool = self
            .pools
            .get_mut(&asset)
            .ok_or_else(|| StakingError::UnknownPool(short_id(&asset).to_string()))?;
        pool.min_lock = min_lock;
        pool.max_lock = max_lock;

        info!(
            target: "staking",
            "lock bounds for {} set to [{}, {}]",
            short_id(&asset),
            min_lock,
            max_lock
        );
        self.events.emit(
            now,
            StakingEvent::LockBoundsUpdated {
                asset,
                min_lock,
                max_lock,
            },
        );
        Ok(())
    }

    /// Replace the duration band table. Existing stakes keep their multiplier.
    pub fn update_multiplier_bands(
        &mut self,
        auth: &AuthContext,
        bands: Vec<MultiplierBand>,
        now: Height,
    ) -> Result<()> {
        self.require_admin(auth, "update_multiplier_bands")?;
        let bands = MultiplierBands::new(bands)?;
        self.params.bands = bands.clone();

        info!(
            target: "staking",
            "multiplier bands updated ({} bands)",
            bands.as_slice().len()
        );
        self.events.emit(
            now,
            StakingEvent::MultiplierBandsUpdated {
                bands: bands.as_slice().to_vec(),
            },
        );
        Ok(())
    }

    /// Move reward tokens from the caller into the pool's reward reserve.
    pub fn fund_rewards(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        asset: AssetId,
        amount: Amount,
        now: Height,
    ) -> Result<Amount> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount {
                amount,
                min: 1,
                max: Amount::MAX,
            });
        }
        let pool = self.pool_of(&asset)?;
        let reserve_after = pool
            .reward_reserve
            .checked_add(amount)
            .ok_or(StakingError::Overflow("reward reserve"))?;

        ledger.transfer_from(&asset, &self.custody, &auth.caller, &self.custody, amount)?;

        if let Some(pool) = self.pools.get_mut(&asset) {
            pool.reward_reserve = reserve_after;
        }
        info!(
            target: "staking",
            "{} funded {} rewards for {} (reserve {})",
            short_id(&auth.caller),
            amount,
            short_id(&asset),
            reserve_after
        );
        self.events.emit(
            now,
            StakingEvent::RewardsFunded {
                asset,
                funder: auth.caller,
                amount,
                reserve_after,
            },
        );
        Ok(reserve_after)
    }

    pub fn pause(&mut self, auth: &AuthContext, now: Height) -> Result<()> {
        if let Err(err) = auth.require(Role::Emergency) {
            warn!(target: "staking", "rejected pause: {}", err);
            return Err(err.into());
        }
        if !self.paused {
            self.paused = true;
            warn!(target: "staking", "staking paused by {}", short_id(&auth.caller));
            self.events.emit(now, StakingEvent::Paused { by: auth.caller });
        }
        Ok(())
    }

    pub fn unpause(&mut self, auth: &AuthContext, now: Height) -> Result<()> {
        if let Err(err) = auth.require(Role::Emergency) {
            warn!(target: "staking", "rejected unpause: {}", err);
            return Err(err.into());
        }
        if self.paused {
            self.paused = false;
            info!(target: "staking", "staking resumed by {}", short_id(&auth.caller));
            self.events.emit(now, StakingEvent::Unpaused { by: auth.caller });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Depositor operations
    // ---------------------------------------------------------------------

    /// Lock `amount` of `asset` for `duration` heights.
    pub fn stake(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        asset: AssetId,
        amount: Amount,
        duration: Height,
        now: Height,
    ) -> Result<StakeId> {
        self.ensure_running()?;
        let owner = auth.caller;
        let pool = self.pool_of(&asset)?;

        if amount < self.params.min_stake || amount > self.params.max_stake {
            return Err(StakingError::InvalidAmount {
                amount,
                min: self.params.min_stake,
                max: self.params.max_stake,
            });
        }
        if duration < pool.min_lock || duration > pool.max_lock {
            return Err(StakingError::InvalidDuration {
                duration,
                min: pool.min_lock,
                max: pool.max_lock,
            });
        }
        let aggregate = self
            .total_staked_by(&owner)
            .checked_add(amount)
            .ok_or(StakingError::Overflow("aggregate stake"))?;
        if aggregate > self.params.max_stake {
            return Err(StakingError::CapExceeded {
                total: aggregate,
                cap: self.params.max_stake,
            });
        }
        let end_height = now
            .checked_add(duration)
            .ok_or(StakingError::Overflow("lock end height"))?;

        let mut updated = pool.accrued(now)?;
        let total_staked_before = updated.total_staked;
        updated.total_staked = total_staked_before
            .checked_add(amount)
            .ok_or(StakingError::Overflow("pool total"))?;
        if !self.has_active_stake(&owner, &asset, None) {
            updated.total_stakers += 1;
        }
        let multiplier = self.params.bands.multiplier_for(duration);

        ledger.transfer_from(&asset, &self.custody, &owner, &self.custody, amount)?;

        let stake_id = self.next_stake_id;
        self.next_stake_id += 1;
        let total_staked_after = updated.total_staked;
        let reward_debt = updated.acc_reward_per_share;
        self.pools.insert(asset, updated);
        self.stakes.insert(
            stake_id,
            Stake {
                id: stake_id,
                owner,
                asset,
                principal: amount,
                lock_duration: duration,
                start_height: now,
                end_height,
                checkpoint_height: now,
                reward_debt,
                multiplier,
                active: true,
            },
        );
        self.owner_index.entry(owner).or_default().push(stake_id);
        self.record_position(owner, now);

        info!(
            target: "staking",
            "stake {} opened by {}: {} locked until {} at {}",
            stake_id,
            short_id(&owner),
            amount,
            end_height,
            lucid_types::format_multiplier(multiplier)
        );
        self.events.emit(
            now,
            StakingEvent::Staked {
                stake_id,
                owner,
                asset,
                amount,
                end_height,
                multiplier,
                total_staked_before,
                total_staked_after,
            },
        );
        Ok(stake_id)
    }

    /// Close an unlocked stake, returning principal plus settled rewards.
    pub fn unstake(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Payout> {
        self.ensure_running()?;
        let stake = self.owned_active_stake(auth, stake_id)?.clone();
        if now < stake.end_height {
            return Err(StakingError::StillLocked {
                stake_id,
                end_height: stake.end_height,
                now,
            });
        }

        let mut pool = self.pool_of(&stake.asset)?.accrued(now)?;
        let reward = stake.owed(&pool)?;
        let bonus = self.bonus_of(&stake.owner, &stake.asset);
        pool.reward_reserve = withdraw_reserve(&pool, reward, bonus)?;

        let total_staked_before = pool.total_staked;
        pool.total_staked = total_staked_before
            .checked_sub(stake.principal)
            .ok_or(StakingError::Overflow("pool total"))?;
        if !self.has_active_stake(&stake.owner, &stake.asset, Some(stake_id)) {
            pool.total_stakers = pool.total_stakers.saturating_sub(1);
        }
        let payout = Payout {
            principal: stake.principal,
            reward,
            bonus,
        };

        ledger.transfer(&stake.asset, &self.custody, &stake.owner, payout.total())?;

        let total_staked_after = pool.total_staked;
        self.commit_settlement(stake_id, &pool, now);
        if let Some(closed) = self.stakes.get_mut(&stake_id) {
            closed.active = false;
        }
        self.bonus_balances.remove(&(stake.owner, stake.asset));
        self.pools.insert(stake.asset, pool);
        self.record_position(stake.owner, now);

        info!(
            target: "staking",
            "stake {} closed by {}: principal {}, reward {}, bonus {}",
            stake_id,
            short_id(&stake.owner),
            payout.principal,
            payout.reward,
            payout.bonus
        );
        self.events.emit(
            now,
            StakingEvent::Unstaked {
                stake_id,
                owner: stake.owner,
                payout,
                total_staked_before,
                total_staked_after,
            },
        );
        Ok(payout)
    }

    /// Pay out accrued rewards (and any action bonus) without closing the stake.
    pub fn claim_rewards(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Amount> {
        self.ensure_running()?;
        let stake = self.owned_active_stake(auth, stake_id)?.clone();
        let (reward, bonus) = self.settle_and_pay(ledger, &stake, now)?;

        let paid = reward + bonus;
        debug!(
            target: "staking",
            "stake {} claimed {} (bonus {})",
            stake_id,
            reward,
            bonus
        );
        self.events.emit(
            now,
            StakingEvent::RewardsClaimed {
                stake_id,
                owner: stake.owner,
                reward,
                bonus,
            },
        );
        Ok(paid)
    }

    /// Push the lock end out by `additional` heights and re-band the multiplier
    /// for the new total duration. Pending rewards are paid first.
    pub fn extend_stake(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        stake_id: StakeId,
        additional: Height,
        now: Height,
    ) -> Result<u32> {
        self.ensure_running()?;
        let stake = self.owned_active_stake(auth, stake_id)?.clone();
        let pool = self.pool_of(&stake.asset)?;
        let new_end_height = stake
            .end_height
            .checked_add(additional)
            .ok_or(StakingError::Overflow("lock end height"))?;
        let new_duration = new_end_height - stake.start_height;
        if additional == 0 || new_duration > pool.max_lock {
            return Err(StakingError::InvalidDuration {
                duration: new_duration,
                min: stake.lock_duration + 1,
                max: pool.max_lock,
            });
        }
        let new_multiplier = self.params.bands.multiplier_for(new_duration);

        let (reward, bonus) = self.settle_and_pay(ledger, &stake, now)?;
        if let Some(extended) = self.stakes.get_mut(&stake_id) {
            extended.end_height = new_end_height;
            extended.lock_duration = new_duration;
            extended.multiplier = new_multiplier;
        }
        self.record_position(stake.owner, now);

        info!(
            target: "staking",
            "stake {} extended to {} ({} -> {})",
            stake_id,
            new_end_height,
            lucid_types::format_multiplier(stake.multiplier),
            lucid_types::format_multiplier(new_multiplier)
        );
        self.events.emit(
            now,
            StakingEvent::StakeExtended {
                stake_id,
                old_end_height: stake.end_height,
                new_end_height,
                old_multiplier: stake.multiplier,
                new_multiplier,
                reward_paid: reward + bonus,
            },
        );
        Ok(new_multiplier)
    }

    /// Fold accrued rewards into the stake's principal. No tokens leave custody.
    pub fn compound_rewards(
        &mut self,
        auth: &AuthContext,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Amount> {
        self.ensure_running()?;
        let stake = self.owned_active_stake(auth, stake_id)?.clone();
        let mut pool = self.pool_of(&stake.asset)?.accrued(now)?;
        let reward = stake.owed(&pool)?;
        let bonus = self.bonus_of(&stake.owner, &stake.asset);
        let gained = reward
            .checked_add(bonus)
            .ok_or(StakingError::Overflow("compounded reward"))?;

        let principal_after = stake
            .principal
            .checked_add(gained)
            .ok_or(StakingError::Overflow("principal"))?;
        let aggregate = self
            .total_staked_by(&stake.owner)
            .checked_add(gained)
            .ok_or(StakingError::Overflow("aggregate stake"))?;
        if principal_after > self.params.max_stake || aggregate > self.params.max_stake {
            return Err(StakingError::CapExceeded {
                total: aggregate,
                cap: self.params.max_stake,
            });
        }
        pool.reward_reserve = withdraw_reserve(&pool, reward, bonus)?;
        pool.total_staked = pool
            .total_staked
            .checked_add(gained)
            .ok_or(StakingError::Overflow("pool total"))?;

        self.commit_settlement(stake_id, &pool, now);
        if let Some(compounded) = self.stakes.get_mut(&stake_id) {
            compounded.principal = principal_after;
        }
        self.bonus_balances.remove(&(stake.owner, stake.asset));
        self.pools.insert(stake.asset, pool);
        self.record_position(stake.owner, now);

        info!(
            target: "staking",
            "stake {} compounded {}: principal {} -> {}",
            stake_id,
            gained,
            stake.principal,
            principal_after
        );
        self.events.emit(
            now,
            StakingEvent::RewardsCompounded {
                stake_id,
                reward: gained,
                principal_before: stake.principal,
                principal_after,
            },
        );
        Ok(gained)
    }

    /// Return principal immediately, forfeiting unclaimed rewards.
    /// Ignores the lock and the pause flag.
    pub fn emergency_withdraw(
        &mut self,
        auth: &AuthContext,
        ledger: &mut dyn TokenLedger,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Amount> {
        let stake = self.owned_active_stake(auth, stake_id)?.clone();
        let mut pool = self.pool_of(&stake.asset)?.accrued(now)?;
        let forfeited = stake.owed(&pool).unwrap_or(0);

        pool.total_staked = pool
            .total_staked
            .checked_sub(stake.principal)
            .ok_or(StakingError::Overflow("pool total"))?;
        if !self.has_active_stake(&stake.owner, &stake.asset, Some(stake_id)) {
            pool.total_stakers = pool.total_stakers.saturating_sub(1);
        }

        ledger.transfer(&stake.asset, &self.custody, &stake.owner, stake.principal)?;

        self.commit_settlement(stake_id, &pool, now);
        if let Some(closed) = self.stakes.get_mut(&stake_id) {
            closed.active = false;
        }
        self.pools.insert(stake.asset, pool);
        self.record_position(stake.owner, now);

        warn!(
            target: "staking",
            "stake {} emergency-withdrawn by {}: principal {}, forfeited {}",
            stake_id,
            short_id(&stake.owner),
            stake.principal,
            forfeited
        );
        self.events.emit(
            now,
            StakingEvent::EmergencyWithdrawn {
                stake_id,
                owner: stake.owner,
                principal: stake.principal,
                forfeited,
            },
        );
        Ok(stake.principal)
    }

    /// Credit the configured action bonus to `account` if it has an active
    /// stake. The bonus is paid with the account's next claim or unstake in
    /// the asset of its oldest active stake.
    pub fn on_participant_action(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        now: Height,
    ) -> Result<Amount> {
        if let Err(err) = auth.require(Role::Recorder) {
            warn!(target: "staking", "rejected participant action hook: {}", err);
            return Err(err.into());
        }
        let amount = self.params.action_bonus;
        if amount == 0 {
            return Ok(0);
        }
        let asset = match self.active_stakes_of(&account).next() {
            Some(stake) => stake.asset,
            None => return Ok(0),
        };

        let balance = self.bonus_balances.entry((account, asset)).or_insert(0);
        *balance = balance.saturating_add(amount);
        let balance = *balance;

        debug!(
            target: "staking",
            "action bonus {} credited to {} (balance {})",
            amount,
            short_id(&account),
            balance
        );
        self.events.emit(
            now,
            StakingEvent::ActionBonusCredited {
                account,
                asset,
                amount,
                balance,
            },
        );
        Ok(amount)
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Reward a stake would receive if settled at `now` (bonus excluded).
    pub fn pending_rewards(&self, stake_id: StakeId, now: Height) -> Result<Amount> {
        let stake = self
            .stakes
            .get(&stake_id)
            .ok_or(StakingError::StakeNotFound(stake_id))?;
        let pool = self.pool_of(&stake.asset)?.accrued(now)?;
        stake.owed(&pool)
    }

    pub fn pending_bonus(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.bonus_of(account, asset)
    }

    pub fn stake_info(&self, stake_id: StakeId) -> Option<&Stake> {
        self.stakes.get(&stake_id)
    }

    /// Every stake ever opened by `owner`, oldest first.
    pub fn stakes_of(&self, owner: &AccountId) -> Vec<&Stake> {
        self.owner_index
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.stakes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn pool(&self, asset: &AssetId) -> Option<&Pool> {
        self.pools.get(asset)
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Active principal owned by `owner` across all pools.
    pub fn total_staked_by(&self, owner: &AccountId) -> Amount {
        self.active_stakes_of(owner)
            .fold(0u128, |acc, stake| acc.saturating_add(stake.principal))
    }

    /// Principal-weighted mean multiplier over the owner's active stakes.
    pub fn voting_multiplier(&self, owner: &AccountId) -> u32 {
        let (weighted, principal) =
            self.active_stakes_of(owner)
                .fold((0u128, 0u128), |(weighted, principal), stake| {
                    (
                        weighted.saturating_add(
                            stake.principal.saturating_mul(stake.multiplier as u128),
                        ),
                        principal.saturating_add(stake.principal),
                    )
                });
        if principal == 0 {
            return BASE_MULTIPLIER;
        }
        (weighted / principal) as u32
    }

    /// Staked principal and multiplier of `owner` at the end of `height`.
    pub fn position_at(&self, owner: &AccountId, height: Height) -> VotingPosition {
        self.positions
            .get(owner)
            .and_then(|history| history.at(height))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    pub fn custody_account(&self) -> AccountId {
        self.custody
    }

    pub fn events(&self) -> &EventLog<StakingEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog<StakingEvent> {
        &mut self.events
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn require_admin(&self, auth: &AuthContext, operation: &str) -> Result<()> {
        auth.require_any(&[Role::Owner, Role::Governance])
            .map_err(|err| {
                warn!(target: "staking", "rejected {}: {}", operation, err);
                StakingError::from(err)
            })
    }

    fn ensure_running(&self) -> Result<()> {
        if self.paused {
            return Err(StakingError::Paused);
        }
        Ok(())
    }

    fn pool_of(&self, asset: &AssetId) -> Result<&Pool> {
        self.pools
            .get(asset)
            .ok_or_else(|| StakingError::UnknownPool(short_id(asset).to_string()))
    }

    fn owned_active_stake(&self, auth: &AuthContext, stake_id: StakeId) -> Result<&Stake> {
        let stake = self
            .stakes
            .get(&stake_id)
            .ok_or(StakingError::StakeNotFound(stake_id))?;
        if stake.owner != auth.caller {
            return Err(StakingError::NotOwner(stake_id));
        }
        if !stake.active {
            return Err(StakingError::NotActive(stake_id));
        }
        Ok(stake)
    }

    fn active_stakes_of<'a>(&'a self, owner: &AccountId) -> impl Iterator<Item = &'a Stake> + 'a {
        self.owner_index
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.stakes.get(id))
            .filter(|stake| stake.active)
    }

    fn has_active_stake(&self, owner: &AccountId, asset: &AssetId, except: Option<StakeId>) -> bool {
        self.active_stakes_of(owner)
            .any(|stake| stake.asset == *asset && Some(stake.id) != except)
    }

    fn bonus_of(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.bonus_balances
            .get(&(*account, *asset))
            .copied()
            .unwrap_or(0)
    }

    /// Settle a stake against the pool at `now` and transfer the reward.
    fn settle_and_pay(
        &mut self,
        ledger: &mut dyn TokenLedger,
        stake: &Stake,
        now: Height,
    ) -> Result<(Amount, Amount)> {
        let mut pool = self.pool_of(&stake.asset)?.accrued(now)?;
        let reward = stake.owed(&pool)?;
        let bonus = self.bonus_of(&stake.owner, &stake.asset);
        pool.reward_reserve = withdraw_reserve(&pool, reward, bonus)?;

        let paid = reward + bonus;
        if paid > 0 {
            ledger.transfer(&stake.asset, &self.custody, &stake.owner, paid)?;
        }

        self.commit_settlement(stake.id, &pool, now);
        self.bonus_balances.remove(&(stake.owner, stake.asset));
        self.pools.insert(stake.asset, pool);
        Ok((reward, bonus))
    }

    fn record_position(&mut self, owner: AccountId, now: Height) {
        let position = VotingPosition {
            staked: self.total_staked_by(&owner),
            multiplier: StakingPool::voting_multiplier(self, &owner),
        };
        self.positions.entry(owner).or_default().record(now, position);
    }

    fn commit_settlement(&mut self, stake_id: StakeId, pool: &Pool, now: Height) {
        if let Some(stake) = self.stakes.get_mut(&stake_id) {
            stake.reward_debt = pool.acc_reward_per_share;
            stake.checkpoint_height = now;
        }
    }
}

impl StakeView for StakingPool {
    fn staked_amount(&self, account: &AccountId) -> Amount {
        self.total_staked_by(account)
    }

    fn voting_multiplier(&self, account: &AccountId) -> u32 {
        StakingPool::voting_multiplier(self, account)
    }

    fn staked_amount_at(&self, account: &AccountId, height: Height) -> Amount {
        self.position_at(account, height).staked
    }

    fn voting_multiplier_at(&self, account: &AccountId, height: Height) -> u32 {
        self.position_at(account, height).multiplier
    }
}

fn validate_lock_bounds(min_lock: Height, max_lock: Height) -> Result<()> {
    if min_lock == 0 || min_lock > max_lock {
        return Err(StakingError::InvalidLockBounds {
            min: min_lock,
            max: max_lock,
        });
    }
    Ok(())
}

/// Reserve left after paying `reward + bonus`, or a state error if it cannot cover them.
fn withdraw_reserve(pool: &Pool, reward: Amount, bonus: Amount) -> Result<Amount> {
    let required = reward
        .checked_add(bonus)
        .ok_or(StakingError::Overflow("reward payout"))?;
    pool.reward_reserve
        .checked_sub(required)
        .ok_or(StakingError::InsufficientRewardReserve {
            required,
            available: pool.reward_reserve,
        })
}
