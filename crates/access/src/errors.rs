use lucid_types::{Amount, Classify, ErrorKind, Height, LedgerError, MissingRole, TierId};
use thiserror::Error;

/// Errors raised by the access-tier component.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] MissingRole),

    #[error("tier {0} not found")]
    UnknownTier(TierId),

    #[error("tier limit reached: at most {max} tiers")]
    TooManyTiers { max: usize },

    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("max actions per day {value} exceeds {max}")]
    ActionLimitTooHigh { value: u64, max: u64 },

    #[error("storage quota {value} exceeds {max}")]
    StorageQuotaTooHigh { value: u64, max: u64 },

    #[error("the base tier cannot be deactivated or given requirements")]
    BaseTierImmutable,

    #[error("unknown permission bits {0:#x}")]
    InvalidPermission(u32),

    #[error("a reason is required for special access changes")]
    MissingReason,

    #[error("invalid amount {0}")]
    InvalidAmount(Amount),

    #[error("account has no access stake")]
    NoAccessStake,

    #[error("access stake locked until height {unlock_height} (now {now})")]
    StillLocked { unlock_height: Height, now: Height },

    #[error("reward reserve too small: required {required}, available {available}")]
    InsufficientRewardReserve { required: Amount, available: Amount },

    #[error("invalid access parameter: {0}")]
    InvalidParameter(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl Classify for AccessError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::UnknownTier(_)
            | Self::InvalidTier(_)
            | Self::InvalidPermission(_)
            | Self::MissingReason
            | Self::InvalidAmount(_) => ErrorKind::Validation,
            Self::TooManyTiers { .. }
            | Self::ActionLimitTooHigh { .. }
            | Self::StorageQuotaTooHigh { .. }
            | Self::Overflow(_) => ErrorKind::Capacity,
            Self::BaseTierImmutable
            | Self::NoAccessStake
            | Self::StillLocked { .. }
            | Self::InsufficientRewardReserve { .. } => ErrorKind::State,
            Self::InvalidParameter(_) => ErrorKind::Configuration,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
