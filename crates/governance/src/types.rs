//! Type definitions for the Governance module

use lucid_types::{AccountId, Amount, Height, ProposalId};
use serde::{Deserialize, Serialize};

/// Target name under which governance applies calls to itself
pub const GOVERNANCE_TARGET: &str = "governance";

/// Function name of the self-governed parameter update
pub const UPDATE_PARAMETERS: &str = "updateGovernanceParameters";

/// Lifecycle state of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Waiting for the voting delay to pass
    Pending,
    /// Accepting votes
    Active,
    /// Canceled before execution
    Canceled,
    /// Voting ended without majority or quorum
    Defeated,
    /// Voting passed, not yet queued
    Succeeded,
    /// Waiting for the timelock or for execution
    Queued,
    /// Queued but not executed before the deadline
    Expired,
    /// All calls applied
    Executed,
}

impl ProposalState {
    /// Pending or Active.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

/// Urgency; decides how long a queued proposal stays executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Emergency,
    Critical,
    High,
    Medium,
    Low,
}

/// Area a proposal touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalCategory {
    /// Economic engine parameters
    Economic,
    /// Staking pools and multiplier bands
    Staking,
    /// Access tier ladder and special permissions
    Access,
    /// Distributor shares and spending
    Treasury,
    /// Governance's own parameters
    Governance,
    /// Emergency action
    Emergency,
    General,
}

/// Vote choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteSupport {
    Against,
    For,
    Abstain,
}

/// One target call carried by a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalCall {
    /// Component the call is addressed to
    pub target: String,
    /// Operation name on the target
    pub function: String,
    /// Token amount attached to the call
    pub value: Amount,
    /// JSON-encoded arguments
    pub calldata: Vec<u8>,
}

impl ProposalCall {
    /// Build a call whose arguments are JSON-encoded from `args`.
    pub fn json<T: Serialize>(
        target: &str,
        function: &str,
        args: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            target: target.to_string(),
            function: function.to_string(),
            value: 0,
            calldata: serde_json::to_vec(args)?,
        })
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// `target.function`, used in logs and dispatch.
    pub fn selector(&self) -> String {
        format!("{}.{}", self.target, self.function)
    }
}

/// Governance proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub calls: Vec<ProposalCall>,
    pub description: String,
    pub category: ProposalCategory,
    pub priority: Priority,
    pub created_at: Height,
    /// First height at which votes are accepted
    pub start_height: Height,
    /// Last height at which votes are accepted
    pub end_height: Height,
    /// For-votes required, fixed at creation
    pub quorum_votes: Amount,
    pub for_votes: Amount,
    pub against_votes: Amount,
    pub abstain_votes: Amount,
    /// Earliest execution height, set when queued
    pub eta: Option<Height>,
    /// Last execution height, set when queued
    pub deadline: Option<Height>,
    pub emergency: bool,
    pub canceled: bool,
    pub executed: bool,
}

impl Proposal {
    /// Height ballots are weighed at: the end of the height before voting opens.
    pub fn snapshot_height(&self) -> Height {
        self.start_height.saturating_sub(1)
    }

    /// Majority and quorum both met.
    pub fn passed(&self) -> bool {
        self.for_votes > self.against_votes && self.for_votes >= self.quorum_votes
    }

    /// State at height `now`, derived from the stored fields.
    pub fn state_at(&self, now: Height) -> ProposalState {
        if self.canceled {
            return ProposalState::Canceled;
        }
        if self.executed {
            return ProposalState::Executed;
        }
        if now < self.start_height {
            return ProposalState::Pending;
        }
        if now <= self.end_height {
            return ProposalState::Active;
        }
        if !self.passed() {
            return ProposalState::Defeated;
        }
        match self.deadline {
            None => ProposalState::Succeeded,
            Some(deadline) if now > deadline => ProposalState::Expired,
            Some(_) => ProposalState::Queued,
        }
    }

    pub fn total_votes(&self) -> Amount {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }
}

/// A voter's ballot on one proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub support: VoteSupport,
    pub weight: Amount,
    pub reason: Option<String>,
    pub cast_at: Height,
}

/// Events emitted by governance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    ProposalCreated {
        id: ProposalId,
        proposer: AccountId,
        category: ProposalCategory,
        priority: Priority,
        start_height: Height,
        end_height: Height,
        quorum_votes: Amount,
        emergency: bool,
    },
    VoteCast {
        id: ProposalId,
        voter: AccountId,
        support: VoteSupport,
        weight: Amount,
        reason: Option<String>,
    },
    ProposalQueued {
        id: ProposalId,
        eta: Height,
        deadline: Height,
    },
    ProposalExecuted {
        id: ProposalId,
        calls: usize,
    },
    ProposalCanceled {
        id: ProposalId,
        by: AccountId,
    },
    ParametersUpdated {
        before: crate::parameters::GovernanceParams,
        after: crate::parameters::GovernanceParams,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },
}
