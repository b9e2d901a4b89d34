use lucid_types::{Classify, ErrorKind, LedgerError, MissingRole};
use thiserror::Error;

/// Errors raised by the reward distributor.
#[derive(Debug, Error)]
pub enum TreasuryError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] MissingRole),

    #[error("participant {0} is not registered")]
    UnknownParticipant(String),

    #[error("sub-score {index} is {value}, maximum is {max}")]
    InvalidScore { index: usize, value: u32, max: u32 },

    #[error("invalid task counts: {success} successes out of {total}")]
    InvalidCounts { success: u64, total: u64 },

    #[error("shares must sum to 10000 basis points, got {sum}")]
    InvalidShares { sum: u64 },

    #[error("nothing to distribute")]
    NothingToDistribute,

    #[error("invalid treasury parameter: {0}")]
    InvalidParameter(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl Classify for TreasuryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::UnknownParticipant(_)
            | Self::InvalidScore { .. }
            | Self::InvalidCounts { .. }
            | Self::NothingToDistribute => ErrorKind::Validation,
            Self::InvalidShares { .. } | Self::InvalidParameter(_) => ErrorKind::Configuration,
            Self::Overflow(_) => ErrorKind::Capacity,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

pub type Result<T> = std::result::Result<T, TreasuryError>;
