//! Proposal lifecycle.
//!
//! `Pending -> Active -> (Defeated | Succeeded) -> Queued -> Executed`, with
//! `Canceled` reachable before execution and `Expired` reachable from
//! `Queued` once the priority deadline passes. State is derived from the
//! stored proposal and the current height on every read; nothing advances
//! in the background.

use crate::errors::{GovernanceError, Result};
use crate::parameters::*;
use crate::timelock::TimelockExecutor;
use crate::types::*;
use crate::voting::{voting_power, VotingPowerSource};
use lucid_types::{
    apply_bps, short_id, AccountId, Amount, AuthContext, EventLog, Height, ProposalId, Role,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Proposal registry and state machine.
#[derive(Debug, Clone)]
pub struct Governance {
    params: GovernanceParams,
    proposals: BTreeMap<ProposalId, Proposal>,
    receipts: HashMap<(ProposalId, AccountId), Receipt>,
    latest_proposal: HashMap<AccountId, ProposalId>,
    next_id: ProposalId,
    paused: bool,
    events: EventLog<GovernanceEvent>,
}

impl Governance {
    pub fn new(params: GovernanceParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            proposals: BTreeMap::new(),
            receipts: HashMap::new(),
            latest_proposal: HashMap::new(),
            next_id: 1,
            paused: false,
            events: EventLog::new(),
        })
    }

    /// Submit a proposal. Voting opens after the voting delay.
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &mut self,
        auth: &AuthContext,
        power: &dyn VotingPowerSource,
        calls: Vec<ProposalCall>,
        description: &str,
        category: ProposalCategory,
        priority: Priority,
        now: Height,
    ) -> Result<ProposalId> {
        self.ensure_not_paused()?;
        if priority == Priority::Emergency || category == ProposalCategory::Emergency {
            return Err(GovernanceError::InvalidProposal(
                "emergency proposals require the emergency path".into(),
            ));
        }
        check_shape(&calls, description)?;

        let proposer_power = voting_power(power, &auth.caller, now)?;
        if proposer_power < self.params.proposal_threshold {
            return Err(GovernanceError::BelowProposalThreshold {
                power: proposer_power,
                threshold: self.params.proposal_threshold,
            });
        }
        if let Some(previous) = self.latest_proposal.get(&auth.caller) {
            if let Some(proposal) = self.proposals.get(previous) {
                if proposal.state_at(now).is_live() {
                    return Err(GovernanceError::LiveProposalExists(*previous));
                }
            }
        }

        let start_height = now
            .checked_add(self.params.voting_delay)
            .ok_or(GovernanceError::Overflow("start height"))?;
        let end_height = start_height
            .checked_add(self.params.voting_period)
            .ok_or(GovernanceError::Overflow("end height"))?;
        let id = self.insert(
            auth.caller,
            calls,
            description,
            category,
            priority,
            (start_height, end_height),
            apply_bps(power.total_voting_supply(now), self.params.quorum_bps),
            false,
            now,
        );
        self.latest_proposal.insert(auth.caller, id);
        Ok(id)
    }

    /// Emergency shortcut: votes open immediately for the emergency voting
    /// period, the proposal threshold does not apply and the minimum timelock
    /// is used when queued.
    pub fn propose_emergency(
        &mut self,
        auth: &AuthContext,
        power: &dyn VotingPowerSource,
        calls: Vec<ProposalCall>,
        description: &str,
        now: Height,
    ) -> Result<ProposalId> {
        self.require(auth, Role::Emergency, "propose_emergency")?;
        self.ensure_not_paused()?;
        check_shape(&calls, description)?;

        let end_height = now
            .checked_add(self.params.emergency_voting_period)
            .ok_or(GovernanceError::Overflow("end height"))?;
        let id = self.insert(
            auth.caller,
            calls,
            description,
            ProposalCategory::Emergency,
            Priority::Emergency,
            (now, end_height),
            apply_bps(power.total_voting_supply(now), self.params.quorum_bps),
            true,
            now,
        );
        warn!(target: "governance", "emergency proposal {} opened by {}", id, short_id(&auth.caller));
        Ok(id)
    }

    pub fn cast_vote(
        &mut self,
        auth: &AuthContext,
        power: &dyn VotingPowerSource,
        id: ProposalId,
        support: VoteSupport,
        now: Height,
    ) -> Result<Amount> {
        self.cast(auth, power, id, support, None, now)
    }

    pub fn cast_vote_with_reason(
        &mut self,
        auth: &AuthContext,
        power: &dyn VotingPowerSource,
        id: ProposalId,
        support: VoteSupport,
        reason: &str,
        now: Height,
    ) -> Result<Amount> {
        self.cast(auth, power, id, support, Some(reason.to_string()), now)
    }

    fn cast(
        &mut self,
        auth: &AuthContext,
        power: &dyn VotingPowerSource,
        id: ProposalId,
        support: VoteSupport,
        reason: Option<String>,
        now: Height,
    ) -> Result<Amount> {
        self.ensure_not_paused()?;
        let proposal = self.get(id)?;
        expect_state(proposal, now, ProposalState::Active, "Active")?;
        if self.receipts.contains_key(&(id, auth.caller)) {
            return Err(GovernanceError::AlreadyVoted(id));
        }
        let weight = voting_power(power, &auth.caller, proposal.snapshot_height())?;
        if weight == 0 {
            return Err(GovernanceError::NoVotingPower);
        }

        let mut updated = proposal.clone();
        let tally = match support {
            VoteSupport::For => &mut updated.for_votes,
            VoteSupport::Against => &mut updated.against_votes,
            VoteSupport::Abstain => &mut updated.abstain_votes,
        };
        *tally = tally
            .checked_add(weight)
            .ok_or(GovernanceError::Overflow("vote tally"))?;

        self.proposals.insert(id, updated);
        self.receipts.insert(
            (id, auth.caller),
            Receipt {
                support,
                weight,
                reason: reason.clone(),
                cast_at: now,
            },
        );

        debug!(
            target: "governance",
            "{} voted {:?} on proposal {} with weight {}",
            short_id(&auth.caller),
            support,
            id,
            weight
        );
        self.events.emit(
            now,
            GovernanceEvent::VoteCast {
                id,
                voter: auth.caller,
                support,
                weight,
                reason,
            },
        );
        Ok(weight)
    }

    /// Queue a succeeded proposal behind the timelock. Returns the eta.
    pub fn queue(&mut self, id: ProposalId, now: Height) -> Result<Height> {
        self.ensure_not_paused()?;
        let proposal = self.get(id)?;
        expect_state(proposal, now, ProposalState::Succeeded, "Succeeded")?;

        let delay = if proposal.emergency {
            MIN_TIMELOCK_DELAY
        } else {
            self.params
                .timelock_delay
                .clamp(MIN_TIMELOCK_DELAY, MAX_TIMELOCK_DELAY)
        };
        let eta = now
            .checked_add(delay)
            .ok_or(GovernanceError::Overflow("eta"))?;
        let deadline = eta
            .checked_add(self.params.priority_windows.window(proposal.priority))
            .ok_or(GovernanceError::Overflow("deadline"))?;

        let mut updated = proposal.clone();
        updated.eta = Some(eta);
        updated.deadline = Some(deadline);
        self.proposals.insert(id, updated);

        info!(
            target: "governance",
            "proposal {} queued: executable from {} until {}",
            id,
            eta,
            deadline
        );
        self.events
            .emit(now, GovernanceEvent::ProposalQueued { id, eta, deadline });
        Ok(eta)
    }

    /// Execute a queued proposal whose timelock has elapsed.
    ///
    /// Every call is validated before any is staged. Calls addressed to
    /// governance itself update the governance parameters; all other calls
    /// go to `executor`. Nothing takes effect unless every call succeeds, and
    /// a failed execution leaves the proposal queued.
    pub fn execute(
        &mut self,
        id: ProposalId,
        executor: &mut dyn TimelockExecutor,
        now: Height,
    ) -> Result<()> {
        self.ensure_not_paused()?;
        let proposal = self.get(id)?;
        expect_state(proposal, now, ProposalState::Queued, "Queued")?;
        let eta = proposal.eta.unwrap_or(Height::MAX);
        if now < eta {
            return Err(GovernanceError::Timelocked { eta, now });
        }
        let calls = proposal.calls.clone();

        for (index, call) in calls.iter().enumerate() {
            let checked = if call.target == GOVERNANCE_TARGET {
                decode_parameter_call(call).map(|_| ())
            } else {
                executor.validate_call(call)
            };
            checked.map_err(|err| {
                warn!(target: "governance", "proposal {} call {} rejected: {:#}", id, index, err);
                GovernanceError::CallRejected {
                    index,
                    reason: format!("{:#}", err),
                }
            })?;
        }

        let mut parameters = None;
        for (index, call) in calls.iter().enumerate() {
            let staged = if call.target == GOVERNANCE_TARGET {
                decode_parameter_call(call).map(|params| parameters = Some(params))
            } else {
                executor.execute_call(call, now)
            };
            if let Err(err) = staged {
                executor.rollback();
                warn!(target: "governance", "proposal {} call {} failed: {:#}", id, index, err);
                return Err(GovernanceError::CallFailed {
                    index,
                    reason: format!("{:#}", err),
                });
            }
            debug!(target: "governance", "proposal {} staged {}", id, call.selector());
        }
        executor.commit(now).map_err(|err| {
            executor.rollback();
            warn!(target: "governance", "proposal {} commit failed: {:#}", id, err);
            GovernanceError::CallFailed {
                index: calls.len(),
                reason: format!("{:#}", err),
            }
        })?;
        if let Some(params) = parameters {
            self.apply_parameters(params, now);
        }

        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.executed = true;
        }
        info!(target: "governance", "proposal {} executed ({} calls)", id, calls.len());
        self.events.emit(
            now,
            GovernanceEvent::ProposalExecuted {
                id,
                calls: calls.len(),
            },
        );
        Ok(())
    }

    /// Cancel a proposal that has not been executed. Allowed for the
    /// proposer and the emergency role, also while paused.
    pub fn cancel(&mut self, auth: &AuthContext, id: ProposalId, now: Height) -> Result<()> {
        let proposal = self.get(id)?;
        if proposal.proposer != auth.caller && !auth.has(Role::Emergency) {
            warn!(
                target: "governance",
                "rejected cancel of proposal {} by {}",
                id,
                short_id(&auth.caller)
            );
            return Err(GovernanceError::NotProposer(id));
        }
        let state = proposal.state_at(now);
        if matches!(
            state,
            ProposalState::Executed | ProposalState::Canceled | ProposalState::Expired
        ) {
            return Err(GovernanceError::InvalidState {
                id,
                state,
                expected: "not yet executed",
            });
        }

        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.canceled = true;
        }
        info!(target: "governance", "proposal {} canceled by {}", id, short_id(&auth.caller));
        self.events.emit(
            now,
            GovernanceEvent::ProposalCanceled {
                id,
                by: auth.caller,
            },
        );
        Ok(())
    }

    /// Halt proposing, voting, queueing and execution. Idempotent.
    pub fn pause(&mut self, auth: &AuthContext, now: Height) -> Result<bool> {
        self.require(auth, Role::Emergency, "pause")?;
        if self.paused {
            return Ok(false);
        }
        self.paused = true;
        warn!(target: "governance", "governance paused by {}", short_id(&auth.caller));
        self.events
            .emit(now, GovernanceEvent::Paused { by: auth.caller });
        Ok(true)
    }

    pub fn unpause(&mut self, auth: &AuthContext, now: Height) -> Result<bool> {
        self.require(auth, Role::Emergency, "unpause")?;
        if !self.paused {
            return Ok(false);
        }
        self.paused = false;
        info!(target: "governance", "governance unpaused by {}", short_id(&auth.caller));
        self.events
            .emit(now, GovernanceEvent::Unpaused { by: auth.caller });
        Ok(true)
    }

    pub fn state(&self, id: ProposalId, now: Height) -> Result<ProposalState> {
        Ok(self.get(id)?.state_at(now))
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn receipt(&self, id: ProposalId, voter: &AccountId) -> Option<&Receipt> {
        self.receipts.get(&(id, *voter))
    }

    pub fn has_voted(&self, id: ProposalId, voter: &AccountId) -> bool {
        self.receipts.contains_key(&(id, *voter))
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn events(&self) -> &EventLog<GovernanceEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog<GovernanceEvent> {
        &mut self.events
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        proposer: AccountId,
        calls: Vec<ProposalCall>,
        description: &str,
        category: ProposalCategory,
        priority: Priority,
        (start_height, end_height): (Height, Height),
        quorum_votes: Amount,
        emergency: bool,
        now: Height,
    ) -> ProposalId {
        let id = self.next_id;
        self.next_id += 1;
        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                calls,
                description: description.to_string(),
                category,
                priority,
                created_at: now,
                start_height,
                end_height,
                quorum_votes,
                for_votes: 0,
                against_votes: 0,
                abstain_votes: 0,
                eta: None,
                deadline: None,
                emergency,
                canceled: false,
                executed: false,
            },
        );

        info!(
            target: "governance",
            "proposal {} created by {}: {:?}/{:?}, voting {}..={}, quorum {}",
            id,
            short_id(&proposer),
            category,
            priority,
            start_height,
            end_height,
            quorum_votes
        );
        self.events.emit(
            now,
            GovernanceEvent::ProposalCreated {
                id,
                proposer,
                category,
                priority,
                start_height,
                end_height,
                quorum_votes,
                emergency,
            },
        );
        id
    }

    fn apply_parameters(&mut self, params: GovernanceParams, now: Height) {
        let before = std::mem::replace(&mut self.params, params.clone());
        info!(
            target: "governance",
            "governance parameters updated: delay {} -> {}, period {} -> {}, threshold {} -> {}, quorum {} -> {} bps",
            before.voting_delay,
            params.voting_delay,
            before.voting_period,
            params.voting_period,
            before.proposal_threshold,
            params.proposal_threshold,
            before.quorum_bps,
            params.quorum_bps
        );
        self.events.emit(
            now,
            GovernanceEvent::ParametersUpdated {
                before,
                after: params,
            },
        );
    }

    fn get(&self, id: ProposalId) -> Result<&Proposal> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(GovernanceError::Paused);
        }
        Ok(())
    }

    fn require(&self, auth: &AuthContext, role: Role, operation: &str) -> Result<()> {
        auth.require(role).map_err(|err| {
            warn!(target: "governance", "rejected {}: {}", operation, err);
            GovernanceError::from(err)
        })
    }
}

fn check_shape(calls: &[ProposalCall], description: &str) -> Result<()> {
    if calls.is_empty() {
        return Err(GovernanceError::InvalidProposal(
            "a proposal needs at least one call".into(),
        ));
    }
    if calls.len() > MAX_PROPOSAL_CALLS {
        return Err(GovernanceError::TooManyCalls {
            count: calls.len(),
            max: MAX_PROPOSAL_CALLS,
        });
    }
    if description.trim().is_empty() {
        return Err(GovernanceError::InvalidProposal(
            "description must not be empty".into(),
        ));
    }
    Ok(())
}

fn expect_state(
    proposal: &Proposal,
    now: Height,
    expected: ProposalState,
    label: &'static str,
) -> Result<()> {
    let state = proposal.state_at(now);
    if state != expected {
        return Err(GovernanceError::InvalidState {
            id: proposal.id,
            state,
            expected: label,
        });
    }
    Ok(())
}

/// Decode and bound-check an `updateGovernanceParameters` call.
fn decode_parameter_call(call: &ProposalCall) -> anyhow::Result<GovernanceParams> {
    if call.function != UPDATE_PARAMETERS {
        anyhow::bail!("unknown governance function {}", call.function);
    }
    if call.value != 0 {
        anyhow::bail!("parameter updates cannot carry value");
    }
    let params: GovernanceParams = serde_json::from_slice(&call.calldata)?;
    params.validate()?;
    Ok(params)
}
