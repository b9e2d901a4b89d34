//! Error types for the Governance module

use crate::types::ProposalState;
use lucid_types::{Amount, Classify, ErrorKind, Height, MissingRole, ProposalId};
use thiserror::Error;

/// Errors that can occur in the Governance module
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Caller lacks the required role
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] MissingRole),

    /// Only the proposer or the emergency role may cancel
    #[error("only the proposer or the emergency role may cancel proposal {0}")]
    NotProposer(ProposalId),

    /// Proposal not found
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    /// Malformed proposal
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// Too many target calls in one proposal
    #[error("proposal carries {count} calls, maximum is {max}")]
    TooManyCalls { count: usize, max: usize },

    /// Proposer below the proposal threshold
    #[error("voting power {power} is below the proposal threshold {threshold}")]
    BelowProposalThreshold { power: Amount, threshold: Amount },

    /// Proposer already has a pending or active proposal
    #[error("proposer already has live proposal {0}")]
    LiveProposalExists(ProposalId),

    /// Operation not allowed in the proposal's current state
    #[error("proposal {id} is {state:?}, expected {expected}")]
    InvalidState {
        id: ProposalId,
        state: ProposalState,
        expected: &'static str,
    },

    /// Account already voted on the proposal
    #[error("account already voted on proposal {0}")]
    AlreadyVoted(ProposalId),

    /// Account has no voting power
    #[error("account has no voting power")]
    NoVotingPower,

    /// Timelock has not elapsed
    #[error("proposal is timelocked until height {eta} (now {now})")]
    Timelocked { eta: Height, now: Height },

    /// Governance is paused
    #[error("governance is paused")]
    Paused,

    /// Parameter outside its bounds
    #[error("invalid governance parameter: {0}")]
    InvalidParameter(String),

    /// A call failed validation; nothing was applied
    #[error("call {index} rejected: {reason}")]
    CallRejected { index: usize, reason: String },

    /// A call failed while executing
    #[error("call {index} failed: {reason}")]
    CallFailed { index: usize, reason: String },

    /// Arithmetic overflow
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl Classify for GovernanceError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) | Self::NotProposer(_) => ErrorKind::Authorization,
            Self::ProposalNotFound(_)
            | Self::InvalidProposal(_)
            | Self::BelowProposalThreshold { .. }
            | Self::NoVotingPower
            | Self::CallRejected { .. } => ErrorKind::Validation,
            Self::LiveProposalExists(_)
            | Self::InvalidState { .. }
            | Self::AlreadyVoted(_)
            | Self::Timelocked { .. }
            | Self::Paused
            | Self::CallFailed { .. } => ErrorKind::State,
            Self::TooManyCalls { .. } | Self::Overflow(_) => ErrorKind::Capacity,
            Self::InvalidParameter(_) => ErrorKind::Configuration,
        }
    }
}

/// Result type for Governance operations
pub type Result<T> = std::result::Result<T, GovernanceError>;
