use lucid_access::{AccessError, DenyReason};
use lucid_economics::EconomicsError;
use lucid_governance::GovernanceError;
use lucid_staking::StakingError;
use lucid_treasury::TreasuryError;
use lucid_types::{Classify, ErrorKind, TierId};
use thiserror::Error;

/// Failure of an engine operation, tagged with the component that raised it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("staking: {0}")]
    Staking(#[from] StakingError),

    #[error("access: {0}")]
    Access(#[from] AccessError),

    #[error("treasury: {0}")]
    Treasury(#[from] TreasuryError),

    #[error("governance: {0}")]
    Governance(#[from] GovernanceError),

    #[error("economics: {0}")]
    Economics(#[from] EconomicsError),

    #[error("gated action denied at tier {tier}: {reason:?}")]
    ActionDenied { tier: TierId, reason: DenyReason },
}

impl Classify for EngineError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Staking(err) => err.kind(),
            Self::Access(err) => err.kind(),
            Self::Treasury(err) => err.kind(),
            Self::Governance(err) => err.kind(),
            Self::Economics(err) => err.kind(),
            Self::ActionDenied { .. } => ErrorKind::Capacity,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
