//! Reward Distributor
//!
//! Holds incoming revenue in a module account and periodically splits it:
//! 1. burn, at the economic engine's current optimal rate
//! 2. owner, treasury and reward shares of what remains
//! 3. the reward share, across eligible participants by points
//!
//! Rounding dust and any reward share nobody qualifies for go to the
//! treasury, so the whole balance always leaves the distributor.
//!
//! The split is planned in full before the ledger is touched. Transfers go
//! out first and the burn last; if the ledger refuses a step, the transfers
//! already made are sent back and the distributor records nothing.

use crate::errors::{Result, TreasuryError};
use crate::participants::*;
use lucid_economics::EconomicEngine;
use lucid_types::{
    apply_bps, days, module_account_id, mul_div, short_id, AccountId, Amount, AssetId,
    AuthContext, EventLog, Height, LedgerError, Role, StakeView, TokenLedger, BPS_SCALE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Label of the distributor's custody account.
pub const DISTRIBUTOR_MODULE: &str = "distributor";

// =============================================================================
// PARAMETERS
// =============================================================================

/// Revenue split in basis points; must sum to 10_000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shares {
    pub owner_bps: u32,
    pub treasury_bps: u32,
    pub reward_bps: u32,
}

impl Default for Shares {
    fn default() -> Self {
        Self {
            owner_bps: 1_000,
            treasury_bps: 2_000,
            reward_bps: 7_000,
        }
    }
}

impl Shares {
    pub fn validate(&self) -> Result<()> {
        let sum = self.owner_bps as u64 + self.treasury_bps as u64 + self.reward_bps as u64;
        if sum != BPS_SCALE as u64 {
            return Err(TreasuryError::InvalidShares { sum });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryParams {
    pub shares: Shares,
    /// Points required to share in the reward pool
    #[serde(with = "lucid_types::serde_amount")]
    pub min_performance_score: u128,
    /// Heights without an update after which a record decays
    pub rebalance_period: Height,
    pub score_decay_bps: u32,
    pub points_decay_bps: u32,
}

impl Default for TreasuryParams {
    fn default() -> Self {
        Self {
            shares: Shares::default(),
            min_performance_score: MIN_PERFORMANCE_SCORE,
            rebalance_period: days(7),
            score_decay_bps: 1_000,
            points_decay_bps: 2_000,
        }
    }
}

impl TreasuryParams {
    pub fn validate(&self) -> Result<()> {
        self.shares.validate()?;
        if self.rebalance_period == 0 {
            return Err(TreasuryError::InvalidParameter(
                "rebalance_period must be positive".into(),
            ));
        }
        if self.score_decay_bps > BPS_SCALE || self.points_decay_bps > BPS_SCALE {
            return Err(TreasuryError::InvalidParameter(
                "decay rates cannot exceed 10,000 basis points".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// DISTRIBUTION RESULT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPayout {
    pub account: AccountId,
    pub points: u128,
    pub amount: Amount,
}

/// Outcome of one distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub asset: AssetId,
    pub height: Height,
    /// Distributor balance at distribution time
    pub balance: Amount,
    pub burn_rate_bps: u32,
    pub burn_amount: Amount,
    pub owner_amount: Amount,
    /// Treasury share plus dust and unallocated rewards
    pub treasury_amount: Amount,
    /// Sum of participant payouts
    pub reward_amount: Amount,
    pub payouts: Vec<ParticipantPayout>,
}

impl DistributionResult {
    pub fn accounted(&self) -> Amount {
        self.burn_amount
            .saturating_add(self.owner_amount)
            .saturating_add(self.treasury_amount)
            .saturating_add(self.reward_amount)
    }
}

/// Events emitted by the distributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreasuryEvent {
    ParticipantRegistered {
        account: AccountId,
    },
    ParticipantRemoved {
        account: AccountId,
    },
    PerformanceUpdated {
        account: AccountId,
        scores: [u32; 3],
        multiplier: u32,
        points_before: u128,
        points_after: u128,
    },
    Distributed {
        result: DistributionResult,
    },
    Rebalanced {
        decayed: Vec<AccountId>,
    },
    SharesUpdated {
        before: Shares,
        after: Shares,
    },
    RecipientsUpdated {
        owner: AccountId,
        treasury: AccountId,
    },
}

// =============================================================================
// DISTRIBUTOR
// =============================================================================

#[derive(Debug, Clone)]
pub struct RewardDistributor {
    params: TreasuryParams,
    custody: AccountId,
    owner_account: AccountId,
    treasury_account: AccountId,
    participants: BTreeMap<AccountId, Participant>,
    last_distribution: Option<DistributionResult>,
    total_distributed: Amount,
    total_burned: Amount,
    events: EventLog<TreasuryEvent>,
}

impl RewardDistributor {
    pub fn new(
        params: TreasuryParams,
        owner_account: AccountId,
        treasury_account: AccountId,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            custody: module_account_id(DISTRIBUTOR_MODULE),
            owner_account,
            treasury_account,
            participants: BTreeMap::new(),
            last_distribution: None,
            total_distributed: 0,
            total_burned: 0,
            events: EventLog::new(),
        })
    }

    /// Register a participant with neutral scores. Registering twice is a no-op.
    pub fn register_participant(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        now: Height,
    ) -> Result<bool> {
        self.require(auth, &[Role::Owner], "register_participant")?;
        if self.participants.contains_key(&account) {
            return Ok(false);
        }
        self.participants
            .insert(account, Participant::neutral(account, now));

        info!(target: "treasury", "participant {} registered", short_id(&account));
        self.events
            .emit(now, TreasuryEvent::ParticipantRegistered { account });
        Ok(true)
    }

    pub fn remove_participant(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        now: Height,
    ) -> Result<()> {
        self.require(auth, &[Role::Owner], "remove_participant")?;
        if self.participants.remove(&account).is_none() {
            return Err(TreasuryError::UnknownParticipant(
                short_id(&account).to_string(),
            ));
        }

        info!(target: "treasury", "participant {} removed", short_id(&account));
        self.events
            .emit(now, TreasuryEvent::ParticipantRemoved { account });
        Ok(())
    }

    /// Store a performance report and recompute the participant's points.
    #[allow(clippy::too_many_arguments)]
    pub fn update_performance(
        &mut self,
        auth: &AuthContext,
        account: AccountId,
        scores: [u32; 3],
        success_count: u64,
        total_count: u64,
        economics: &EconomicEngine,
        stakes: &dyn StakeView,
        now: Height,
    ) -> Result<u128> {
        self.require(auth, &[Role::Oracle], "update_performance")?;
        validate_report(&scores, success_count, total_count)?;
        let participant = self
            .participants
            .get_mut(&account)
            .ok_or_else(|| TreasuryError::UnknownParticipant(short_id(&account).to_string()))?;

        let multiplier =
            economics.calculate_reward_multiplier(scores, stakes.staked_amount(&account));
        let points_before = participant.reward_points;
        let points_after = reward_points(&scores, success_count, total_count, multiplier);

        participant.scores = scores;
        participant.success_count = success_count;
        participant.total_count = total_count;
        participant.multiplier = multiplier;
        participant.reward_points = points_after;
        participant.last_updated = now;

        debug!(
            target: "treasury",
            "performance of {} updated: points {} -> {} at {}",
            short_id(&account),
            points_before,
            points_after,
            lucid_types::format_multiplier(multiplier)
        );
        self.events.emit(
            now,
            TreasuryEvent::PerformanceUpdated {
                account,
                scores,
                multiplier,
                points_before,
                points_after,
            },
        );
        Ok(points_after)
    }

    /// Split the distributor's whole balance of `asset`.
    pub fn distribute(
        &mut self,
        ledger: &mut dyn TokenLedger,
        economics: &EconomicEngine,
        asset: AssetId,
        now: Height,
    ) -> Result<DistributionResult> {
        let balance = ledger.balance_of(&asset, &self.custody);
        if balance == 0 {
            return Err(TreasuryError::NothingToDistribute);
        }

        // Stale records decay before they can claim a share
        let mut participants = self.participants.clone();
        let decayed = decay_stale(&mut participants, &self.params, now);

        let burn_rate_bps = economics.calculate_optimal_burn_rate();
        let burn_amount = apply_bps(balance, burn_rate_bps);
        let remaining = balance - burn_amount;

        let shares = self.params.shares;
        let owner_amount = apply_bps(remaining, shares.owner_bps);
        let treasury_share = apply_bps(remaining, shares.treasury_bps);
        let reward_pool = apply_bps(remaining, shares.reward_bps);
        let dust = remaining - owner_amount - treasury_share - reward_pool;

        let eligibility =
            assess_eligibility(participants.values(), self.params.min_performance_score);
        let mut payouts = Vec::with_capacity(eligibility.eligible.len());
        let mut reward_amount: Amount = 0;
        if eligibility.total_points > 0 {
            for (account, points) in &eligibility.eligible {
                let amount = mul_div(reward_pool, *points, eligibility.total_points)
                    .ok_or(TreasuryError::Overflow("participant payout"))?;
                if amount > 0 {
                    reward_amount += amount;
                    payouts.push(ParticipantPayout {
                        account: *account,
                        points: *points,
                        amount,
                    });
                }
            }
        }
        let unallocated = reward_pool - reward_amount;
        let treasury_amount = treasury_share + dust + unallocated;

        let mut plan = vec![
            (self.owner_account, owner_amount),
            (self.treasury_account, treasury_amount),
        ];
        plan.extend(payouts.iter().map(|payout| (payout.account, payout.amount)));
        plan.retain(|(_, amount)| *amount > 0);
        debug_assert_eq!(
            plan.iter().map(|(_, amount)| amount).sum::<Amount>() + burn_amount,
            balance
        );
        if let Err(err) = self.settle(ledger, &asset, &plan, burn_amount) {
            warn!(
                target: "treasury",
                "distribution of {} refused by the ledger: {}",
                short_id(&asset),
                err
            );
            return Err(err.into());
        }
        for payout in &payouts {
            if let Some(participant) = participants.get_mut(&payout.account) {
                participant.total_earned = participant.total_earned.saturating_add(payout.amount);
            }
        }

        let result = DistributionResult {
            asset,
            height: now,
            balance,
            burn_rate_bps,
            burn_amount,
            owner_amount,
            treasury_amount,
            reward_amount,
            payouts,
        };
        self.participants = participants;
        self.total_burned = self.total_burned.saturating_add(burn_amount);
        self.total_distributed = self
            .total_distributed
            .saturating_add(balance - burn_amount);
        self.last_distribution = Some(result.clone());

        if !decayed.is_empty() {
            self.events.emit(now, TreasuryEvent::Rebalanced { decayed });
        }
        info!(
            target: "treasury",
            "distributed {} of {}: burned {} ({} bps), owner {}, treasury {}, rewards {} across {} participants",
            balance,
            short_id(&asset),
            burn_amount,
            burn_rate_bps,
            owner_amount,
            treasury_amount,
            reward_amount,
            result.payouts.len()
        );
        self.events.emit(
            now,
            TreasuryEvent::Distributed {
                result: result.clone(),
            },
        );
        Ok(result)
    }

    /// Move `plan` out of custody, then burn `burn_amount`. On a refusal the
    /// transfers already made are returned to custody.
    fn settle(
        &self,
        ledger: &mut dyn TokenLedger,
        asset: &AssetId,
        plan: &[(AccountId, Amount)],
        burn_amount: Amount,
    ) -> std::result::Result<(), LedgerError> {
        let mut sent = 0;
        let mut outcome = Ok(());
        for (to, amount) in plan {
            outcome = ledger.transfer(asset, &self.custody, to, *amount);
            if outcome.is_err() {
                break;
            }
            sent += 1;
        }
        if outcome.is_ok() && burn_amount > 0 {
            outcome = ledger.burn(asset, &self.custody, burn_amount);
        }
        if outcome.is_err() {
            for (to, amount) in plan[..sent].iter().rev() {
                if let Err(undo) = ledger.transfer(asset, to, &self.custody, *amount) {
                    error!(
                        target: "treasury",
                        "could not return {} of {} from {}: {}",
                        amount,
                        short_id(asset),
                        short_id(to),
                        undo
                    );
                }
            }
        }
        outcome
    }

    /// Decay every participant not updated within the rebalance period.
    pub fn force_rebalance(&mut self, auth: &AuthContext, now: Height) -> Result<usize> {
        self.require(auth, &[Role::Owner], "force_rebalance")?;
        let decayed = decay_stale(&mut self.participants, &self.params, now);
        let count = decayed.len();

        info!(target: "treasury", "rebalance decayed {} participants", count);
        self.events.emit(now, TreasuryEvent::Rebalanced { decayed });
        Ok(count)
    }

    pub fn update_shares(&mut self, auth: &AuthContext, shares: Shares, now: Height) -> Result<()> {
        self.require(auth, &[Role::Owner, Role::Governance], "update_shares")?;
        shares.validate()?;
        let before = self.params.shares;
        self.params.shares = shares;

        info!(
            target: "treasury",
            "shares updated: owner {} / treasury {} / rewards {}",
            shares.owner_bps,
            shares.treasury_bps,
            shares.reward_bps
        );
        self.events.emit(
            now,
            TreasuryEvent::SharesUpdated {
                before,
                after: shares,
            },
        );
        Ok(())
    }

    pub fn set_recipients(
        &mut self,
        auth: &AuthContext,
        owner: AccountId,
        treasury: AccountId,
        now: Height,
    ) -> Result<()> {
        self.require(auth, &[Role::Owner], "set_recipients")?;
        self.owner_account = owner;
        self.treasury_account = treasury;
        self.events
            .emit(now, TreasuryEvent::RecipientsUpdated { owner, treasury });
        Ok(())
    }

    pub fn participant(&self, account: &AccountId) -> Option<&Participant> {
        self.participants.get(account)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn eligible_participants(&self) -> Vec<AccountId> {
        assess_eligibility(self.participants.values(), self.params.min_performance_score)
            .eligible
            .into_iter()
            .map(|(account, _)| account)
            .collect()
    }

    pub fn last_distribution(&self) -> Option<&DistributionResult> {
        self.last_distribution.as_ref()
    }

    pub fn total_distributed(&self) -> Amount {
        self.total_distributed
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    pub fn shares(&self) -> Shares {
        self.params.shares
    }

    pub fn custody_account(&self) -> AccountId {
        self.custody
    }

    pub fn recipients(&self) -> (AccountId, AccountId) {
        (self.owner_account, self.treasury_account)
    }

    pub fn events(&self) -> &EventLog<TreasuryEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog<TreasuryEvent> {
        &mut self.events
    }

    fn require(&self, auth: &AuthContext, roles: &[Role], operation: &str) -> Result<()> {
        auth.require_any(roles).map_err(|err| {
            warn!(target: "treasury", "rejected {}: {}", operation, err);
            TreasuryError::from(err)
        })
    }
}

fn decay_stale(
    participants: &mut BTreeMap<AccountId, Participant>,
    params: &TreasuryParams,
    now: Height,
) -> Vec<AccountId> {
    let mut decayed = Vec::new();
    for participant in participants.values_mut() {
        if participant.is_stale(now, params.rebalance_period) {
            participant.decay(params.score_decay_bps, params.points_decay_bps, now);
            decayed.push(participant.account);
        }
    }
    if !decayed.is_empty() {
        debug!(target: "treasury", "decayed {} stale participants", decayed.len());
    }
    decayed
}
