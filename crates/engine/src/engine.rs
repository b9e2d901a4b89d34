//! The engine context.
//!
//! Owns every component plus the host ledger and hands each call the
//! cross-component views it needs: staking positions to access tiers, the
//! distributor and voting power, the economic engine to the distributor.
//! Components never hold references to one another.
//!
//! Calls that move tokens or weigh votes first advance the ledger to the
//! call's height, so balance history lines up with proposal snapshots.

use crate::config::EngineConfig;
use crate::errors::{EngineError, Result};
use crate::executor::EngineExecutor;
use anyhow::Context;
use lucid_access::{AccessEvent, AccessTiers, DenyReason, GateDecision};
use lucid_economics::{EconomicEngine, EconomicEvent, EconomicSnapshot, NetworkMetrics};
use lucid_governance::{
    Governance, GovernanceEvent, LedgerVotingPower, Priority, ProposalCall, ProposalCategory,
    ProposalState, VoteSupport,
};
use lucid_staking::{Payout, StakingEvent, StakingPool};
use lucid_treasury::{DistributionResult, RewardDistributor, TreasuryEvent};
use lucid_types::{
    module_account_id, short_id, AccountId, Amount, AssetId, AuthContext, EventRecord, Height,
    InMemoryLedger, ProposalId, Role, StakeId, TierId, TokenLedger,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Label of the account the engine acts under while bootstrapping.
const BOOTSTRAP_MODULE: &str = "engine";

/// An event from any component, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    Staking(StakingEvent),
    Access(AccessEvent),
    Treasury(TreasuryEvent),
    Governance(GovernanceEvent),
    Economics(EconomicEvent),
}

/// Result of a recorded gated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub tier: TierId,
    /// Staking bonus credited for the action
    pub bonus: Amount,
}

pub struct Engine<L: TokenLedger = InMemoryLedger> {
    config: EngineConfig,
    ledger: L,
    staking_asset: AssetId,
    staking: StakingPool,
    access: AccessTiers,
    treasury: RewardDistributor,
    governance: Governance,
    economics: EconomicEngine,
}

impl<L: TokenLedger> Engine<L> {
    /// Build every component from `config` and open the main staking pool.
    pub fn new(config: EngineConfig, ledger: L) -> anyhow::Result<Self> {
        config.validate()?;

        let staking_asset = config.staking.asset_id();
        let mut staking =
            StakingPool::new(config.staking.params()).context("failed to build staking pool")?;
        let bootstrap = AuthContext::with_roles(module_account_id(BOOTSTRAP_MODULE), &[Role::Owner]);
        staking
            .create_pool(
                &bootstrap,
                staking_asset,
                config.staking.reward_rate,
                config.staking.min_lock,
                config.staking.max_lock,
                0,
            )
            .context("failed to open the main staking pool")?;

        let access = AccessTiers::new(config.access.asset_id(), config.access.params())
            .context("failed to build access tiers")?;
        let treasury = RewardDistributor::new(
            config.treasury.params(),
            config.treasury.owner_account(),
            config.treasury.treasury_account(),
        )
        .context("failed to build reward distributor")?;
        let governance =
            Governance::new(config.governance.clone()).context("failed to build governance")?;
        let economics = EconomicEngine::with_params(config.economics.clone())
            .context("failed to build economic engine")?;

        info!(
            target: "engine",
            "engine ready: staking asset {} ({}), {} access tiers",
            config.staking.asset,
            short_id(&staking_asset),
            access.tiers().count()
        );

        Ok(Self {
            config,
            ledger,
            staking_asset,
            staking,
            access,
            treasury,
            governance,
            economics,
        })
    }

    // ---------------------------------------------------------------------
    // Staking
    // ---------------------------------------------------------------------

    /// Lock `amount` of the main staking asset. The caller must have
    /// approved the staking custody account on the ledger.
    pub fn stake(
        &mut self,
        auth: &AuthContext,
        amount: Amount,
        duration: Height,
        now: Height,
    ) -> Result<StakeId> {
        self.ledger.advance_to(now);
        let id = self.staking.stake(
            auth,
            &mut self.ledger,
            self.staking_asset,
            amount,
            duration,
            now,
        )?;
        Ok(id)
    }

    pub fn unstake(&mut self, auth: &AuthContext, stake_id: StakeId, now: Height) -> Result<Payout> {
        self.ledger.advance_to(now);
        Ok(self.staking.unstake(auth, &mut self.ledger, stake_id, now)?)
    }

    pub fn claim_rewards(
        &mut self,
        auth: &AuthContext,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Amount> {
        self.ledger.advance_to(now);
        Ok(self
            .staking
            .claim_rewards(auth, &mut self.ledger, stake_id, now)?)
    }

    pub fn extend_stake(
        &mut self,
        auth: &AuthContext,
        stake_id: StakeId,
        additional: Height,
        now: Height,
    ) -> Result<u32> {
        self.ledger.advance_to(now);
        Ok(self
            .staking
            .extend_stake(auth, &mut self.ledger, stake_id, additional, now)?)
    }

    pub fn compound_rewards(
        &mut self,
        auth: &AuthContext,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Amount> {
        Ok(self.staking.compound_rewards(auth, stake_id, now)?)
    }

    pub fn emergency_withdraw(
        &mut self,
        auth: &AuthContext,
        stake_id: StakeId,
        now: Height,
    ) -> Result<Amount> {
        self.ledger.advance_to(now);
        Ok(self
            .staking
            .emergency_withdraw(auth, &mut self.ledger, stake_id, now)?)
    }

    /// Move `amount` of the main staking asset from the caller into the
    /// staking reward reserve.
    pub fn fund_staking_rewards(
        &mut self,
        auth: &AuthContext,
        amount: Amount,
        now: Height,
    ) -> Result<Amount> {
        self.ledger.advance_to(now);
        Ok(self
            .staking
            .fund_rewards(auth, &mut self.ledger, self.staking_asset, amount, now)?)
    }

    /// Pause staking deposits and governance together.
    pub fn emergency_pause(&mut self, auth: &AuthContext, now: Height) -> Result<()> {
        auth.require(Role::Emergency)
            .map_err(lucid_governance::GovernanceError::from)?;
        self.staking.pause(auth, now)?;
        self.governance.pause(auth, now)?;
        warn!(target: "engine", "emergency pause by {} at height {}", short_id(&auth.caller), now);
        Ok(())
    }

    pub fn emergency_unpause(&mut self, auth: &AuthContext, now: Height) -> Result<()> {
        auth.require(Role::Emergency)
            .map_err(lucid_governance::GovernanceError::from)?;
        self.staking.unpause(auth, now)?;
        self.governance.unpause(auth, now)?;
        info!(target: "engine", "emergency pause lifted at height {}", now);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------------

    pub fn tier_of(&self, account: &AccountId) -> TierId {
        self.access.get_user_tier(account, &self.ledger, &self.staking)
    }

    pub fn can_perform_action(&self, account: &AccountId, size_cost: u64, now: Height) -> GateDecision {
        self.access
            .can_perform_gated_action(account, size_cost, now, &self.ledger, &self.staking)
    }

    pub fn remaining_actions(&self, account: &AccountId, now: Height) -> Option<u64> {
        self.access
            .remaining_actions(account, now, &self.ledger, &self.staking)
    }

    /// Check the account's quotas, count the action and credit the staking
    /// action bonus. Nothing is recorded when the action is denied.
    pub fn record_action(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        size_cost: u64,
        now: Height,
    ) -> Result<ActionOutcome> {
        auth.require(Role::Recorder)
            .map_err(lucid_access::AccessError::from)?;
        let decision = self.can_perform_action(&account, size_cost, now);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or(DenyReason::DailyLimitExceeded);
            debug!(
                target: "engine",
                "action by {} denied at tier {}: {:?}",
                short_id(&account),
                decision.tier,
                reason
            );
            return Err(EngineError::ActionDenied {
                tier: decision.tier,
                reason,
            });
        }

        self.access.record_gated_action(auth, account, size_cost, now)?;
        let bonus = self.staking.on_participant_action(auth, account, now)?;
        Ok(ActionOutcome {
            tier: decision.tier,
            bonus,
        })
    }

    pub fn stake_access(&mut self, auth: &AuthContext, amount: Amount, now: Height) -> Result<Amount> {
        self.ledger.advance_to(now);
        Ok(self.access.stake_access(auth, &mut self.ledger, amount, now)?)
    }

    pub fn unstake_access(&mut self, auth: &AuthContext, now: Height) -> Result<(Amount, Amount)> {
        self.ledger.advance_to(now);
        Ok(self.access.unstake_access(auth, &mut self.ledger, now)?)
    }

    pub fn claim_access_rewards(&mut self, auth: &AuthContext, now: Height) -> Result<Amount> {
        self.ledger.advance_to(now);
        Ok(self.access.claim_access_rewards(auth, &mut self.ledger, now)?)
    }

    pub fn fund_access_rewards(
        &mut self,
        auth: &AuthContext,
        amount: Amount,
        now: Height,
    ) -> Result<Amount> {
        self.ledger.advance_to(now);
        Ok(self
            .access
            .fund_access_rewards(auth, &mut self.ledger, amount, now)?)
    }

    // ---------------------------------------------------------------------
    // Rewards
    // ---------------------------------------------------------------------

    /// Oracle report for a registered participant, weighted by the economic
    /// engine and the participant's stake.
    pub fn update_performance(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        scores: [u32; 3],
        success_count: u64,
        total_count: u64,
        now: Height,
    ) -> Result<u128> {
        Ok(self.treasury.update_performance(
            auth,
            account,
            scores,
            success_count,
            total_count,
            &self.economics,
            &self.staking,
            now,
        )?)
    }

    /// Split the distributor's balance of `asset`. Anyone may trigger it.
    pub fn distribute(&mut self, asset: AssetId, now: Height) -> Result<DistributionResult> {
        self.ledger.advance_to(now);
        Ok(self
            .treasury
            .distribute(&mut self.ledger, &self.economics, asset, now)?)
    }

    // ---------------------------------------------------------------------
    // Economics
    // ---------------------------------------------------------------------

    /// Oracle telemetry. Total staked is taken from the main staking pool,
    /// and a zero circulating supply from the ledger.
    pub fn update_network_metrics(
        &mut self,
        auth: &AuthContext,
        mut metrics: NetworkMetrics,
        now: Height,
    ) -> Result<EconomicSnapshot> {
        metrics.total_staked = self
            .staking
            .pool(&self.staking_asset)
            .map(|pool| pool.total_staked)
            .unwrap_or(0);
        if metrics.circulating_supply == 0 {
            metrics.circulating_supply = self.ledger.total_supply(&self.staking_asset);
        }
        Ok(self.economics.update_network_metrics(auth, metrics, now)?)
    }

    pub fn update_market_conditions(
        &mut self,
        auth: &AuthContext,
        prices: &[Amount],
        volumes: &[Amount],
        now: Height,
    ) -> Result<EconomicSnapshot> {
        Ok(self
            .economics
            .update_market_conditions(auth, prices, volumes, now)?)
    }

    // ---------------------------------------------------------------------
    // Governance
    // ---------------------------------------------------------------------

    /// Current voting power of `account`: balance plus stake in the main
    /// staking asset, scaled by the account's staking multiplier. Ballots
    /// use the same measure at the proposal's snapshot height.
    pub fn voting_power(&self, account: &AccountId) -> Result<Amount> {
        let source = LedgerVotingPower::new(&self.ledger, self.staking_asset, &self.staking);
        Ok(lucid_governance::voting_power(&source, account, Height::MAX)?)
    }

    pub fn propose(
        &mut self,
        auth: &AuthContext,
        calls: Vec<ProposalCall>,
        description: &str,
        category: ProposalCategory,
        priority: Priority,
        now: Height,
    ) -> Result<ProposalId> {
        self.ledger.advance_to(now);
        let source = LedgerVotingPower::new(&self.ledger, self.staking_asset, &self.staking);
        Ok(self
            .governance
            .propose(auth, &source, calls, description, category, priority, now)?)
    }

    pub fn propose_emergency(
        &mut self,
        auth: &AuthContext,
        calls: Vec<ProposalCall>,
        description: &str,
        now: Height,
    ) -> Result<ProposalId> {
        self.ledger.advance_to(now);
        let source = LedgerVotingPower::new(&self.ledger, self.staking_asset, &self.staking);
        Ok(self
            .governance
            .propose_emergency(auth, &source, calls, description, now)?)
    }

    pub fn cast_vote(
        &mut self,
        auth: &AuthContext,
        id: ProposalId,
        support: VoteSupport,
        now: Height,
    ) -> Result<Amount> {
        self.ledger.advance_to(now);
        let source = LedgerVotingPower::new(&self.ledger, self.staking_asset, &self.staking);
        Ok(self.governance.cast_vote(auth, &source, id, support, now)?)
    }

    pub fn cast_vote_with_reason(
        &mut self,
        auth: &AuthContext,
        id: ProposalId,
        support: VoteSupport,
        reason: &str,
        now: Height,
    ) -> Result<Amount> {
        self.ledger.advance_to(now);
        let source = LedgerVotingPower::new(&self.ledger, self.staking_asset, &self.staking);
        Ok(self
            .governance
            .cast_vote_with_reason(auth, &source, id, support, reason, now)?)
    }

    pub fn queue(&mut self, id: ProposalId, now: Height) -> Result<Height> {
        Ok(self.governance.queue(id, now)?)
    }

    /// Execute a queued proposal against the engine's components.
    pub fn execute(&mut self, id: ProposalId, now: Height) -> Result<()> {
        self.ledger.advance_to(now);
        let mut executor = EngineExecutor::new(
            &mut self.staking,
            &mut self.access,
            &mut self.treasury,
            &mut self.economics,
            &mut self.ledger,
        );
        self.governance.execute(id, &mut executor, now)?;
        Ok(())
    }

    pub fn cancel(&mut self, auth: &AuthContext, id: ProposalId, now: Height) -> Result<()> {
        Ok(self.governance.cancel(auth, id, now)?)
    }

    pub fn proposal_state(&self, id: ProposalId, now: Height) -> Result<ProposalState> {
        Ok(self.governance.state(id, now)?)
    }

    // ---------------------------------------------------------------------
    // Events and accessors
    // ---------------------------------------------------------------------

    /// Take the buffered events of every component, ordered by height.
    pub fn drain_events(&mut self) -> Vec<EventRecord<EngineEvent>> {
        let mut records = Vec::new();
        records.extend(wrap(self.economics.events_mut().drain(), EngineEvent::Economics));
        records.extend(wrap(self.staking.events_mut().drain(), EngineEvent::Staking));
        records.extend(wrap(self.access.events_mut().drain(), EngineEvent::Access));
        records.extend(wrap(self.treasury.events_mut().drain(), EngineEvent::Treasury));
        records.extend(wrap(self.governance.events_mut().drain(), EngineEvent::Governance));
        records.sort_by_key(|record| record.height);
        records
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn staking_asset(&self) -> AssetId {
        self.staking_asset
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn staking(&self) -> &StakingPool {
        &self.staking
    }

    pub fn staking_mut(&mut self) -> &mut StakingPool {
        &mut self.staking
    }

    pub fn access(&self) -> &AccessTiers {
        &self.access
    }

    pub fn access_mut(&mut self) -> &mut AccessTiers {
        &mut self.access
    }

    pub fn treasury(&self) -> &RewardDistributor {
        &self.treasury
    }

    pub fn treasury_mut(&mut self) -> &mut RewardDistributor {
        &mut self.treasury
    }

    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    pub fn economics(&self) -> &EconomicEngine {
        &self.economics
    }
}

fn wrap<E>(
    records: Vec<EventRecord<E>>,
    into: fn(E) -> EngineEvent,
) -> impl Iterator<Item = EventRecord<EngineEvent>> {
    records.into_iter().map(move |record| EventRecord {
        height: record.height,
        event: into(record.event),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_types::{account_id, asset_id, days, Classify, ErrorKind};

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), InMemoryLedger::new()).unwrap()
    }

    fn recorder() -> AuthContext {
        AuthContext::with_roles(account_id("recorder"), &[Role::Recorder])
    }

    #[test]
    fn test_new_opens_main_pool() {
        let engine = engine();
        let pool = engine.staking().pool(&asset_id("LUCID")).unwrap();
        assert_eq!(pool.reward_rate, 100);
        assert_eq!(pool.total_staked, 0);
        assert_eq!(engine.staking_asset(), asset_id("LUCID"));
    }

    #[test]
    fn test_invalid_config_refused() {
        let mut config = EngineConfig::default();
        config.treasury.shares.owner_bps = 0;
        assert!(Engine::new(config, InMemoryLedger::new()).is_err());
    }

    #[test]
    fn test_record_action_enforces_daily_quota() {
        let mut engine = engine();
        let alice = account_id("alice");

        for _ in 0..10 {
            let outcome = engine.record_action(&recorder(), alice, 0, 100).unwrap();
            assert_eq!(outcome.tier, 0);
            assert_eq!(outcome.bonus, 0);
        }
        let err = engine.record_action(&recorder(), alice, 0, 100).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ActionDenied {
                reason: DenyReason::DailyLimitExceeded,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert_eq!(engine.remaining_actions(&alice, 100), Some(0));

        // next day resets the counter
        assert!(engine.record_action(&recorder(), alice, 0, 100 + days(1)).is_ok());
    }

    #[test]
    fn test_record_action_requires_recorder() {
        let mut engine = engine();
        let alice = account_id("alice");
        let err = engine
            .record_action(&AuthContext::user(alice), alice, 0, 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(engine.access().user_access(&alice).total_actions, 0);
    }

    #[test]
    fn test_network_metrics_use_pool_totals() {
        let mut engine = engine();
        let asset = engine.staking_asset();
        let alice = account_id("alice");
        let custody = engine.staking().custody_account();
        engine.ledger_mut().mint(&asset, &alice, 10_000).unwrap();
        engine
            .ledger_mut()
            .approve(&asset, &alice, &custody, 5_000)
            .unwrap();
        engine
            .stake(&AuthContext::user(alice), 5_000, days(30), 10)
            .unwrap();

        let oracle = AuthContext::with_roles(account_id("oracle"), &[Role::Oracle]);
        let metrics = NetworkMetrics {
            total_staked: 1,
            ..NetworkMetrics::default()
        };
        engine.update_network_metrics(&oracle, metrics, 20).unwrap();
        assert_eq!(engine.economics().network_metrics().total_staked, 5_000);
        assert_eq!(engine.economics().network_metrics().circulating_supply, 10_000);
    }

    #[test]
    fn test_drain_events_orders_by_height() {
        let mut engine = engine();
        let alice = account_id("alice");
        engine.record_action(&recorder(), alice, 0, 50).unwrap();
        let oracle = AuthContext::with_roles(account_id("oracle"), &[Role::Oracle]);
        engine
            .update_network_metrics(&oracle, NetworkMetrics::default(), 10)
            .unwrap();

        let events = engine.drain_events();
        assert!(events.windows(2).all(|pair| pair[0].height <= pair[1].height));
        assert!(events
            .iter()
            .any(|record| matches!(record.event, EngineEvent::Access(_))));
        assert!(engine.drain_events().is_empty());
    }
}
