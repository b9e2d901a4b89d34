use lucid_types::{Amount, Classify, ErrorKind, Height, LedgerError, MissingRole, StakeId};
use thiserror::Error;

/// Errors raised by the staking component.
#[derive(Debug, Error)]
pub enum StakingError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] MissingRole),

    #[error("caller does not own stake {0}")]
    NotOwner(StakeId),

    #[error("invalid amount {amount}: must be within [{min}, {max}]")]
    InvalidAmount {
        amount: Amount,
        min: Amount,
        max: Amount,
    },

    #[error("invalid lock duration {duration}: must be within [{min}, {max}]")]
    InvalidDuration {
        duration: Height,
        min: Height,
        max: Height,
    },

    #[error("stake cap exceeded: {total} would exceed {cap}")]
    CapExceeded { total: Amount, cap: Amount },

    #[error("no pool for asset {0}")]
    UnknownPool(String),

    #[error("pool already exists for asset {0}")]
    PoolExists(String),

    #[error("stake {0} not found")]
    StakeNotFound(StakeId),

    #[error("stake {0} is not active")]
    NotActive(StakeId),

    #[error("stake {stake_id} is locked until height {end_height} (now {now})")]
    StillLocked {
        stake_id: StakeId,
        end_height: Height,
        now: Height,
    },

    #[error("staking is paused")]
    Paused,

    #[error("reward reserve too small: required {required}, available {available}")]
    InsufficientRewardReserve { required: Amount, available: Amount },

    #[error("invalid multiplier bands: {0}")]
    InvalidBands(String),

    #[error("invalid lock bounds [{min}, {max}]")]
    InvalidLockBounds { min: Height, max: Height },

    #[error("invalid staking parameter: {0}")]
    InvalidParameter(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl Classify for StakingError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) | Self::NotOwner(_) => ErrorKind::Authorization,
            Self::InvalidAmount { .. }
            | Self::InvalidDuration { .. }
            | Self::UnknownPool(_)
            | Self::StakeNotFound(_) => ErrorKind::Validation,
            Self::CapExceeded { .. } | Self::Overflow(_) => ErrorKind::Capacity,
            Self::PoolExists(_)
            | Self::NotActive(_)
            | Self::StillLocked { .. }
            | Self::Paused
            | Self::InsufficientRewardReserve { .. } => ErrorKind::State,
            Self::InvalidBands(_) | Self::InvalidLockBounds { .. } | Self::InvalidParameter(_) => {
                ErrorKind::Configuration
            }
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

pub type Result<T> = std::result::Result<T, StakingError>;
