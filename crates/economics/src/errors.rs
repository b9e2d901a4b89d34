use lucid_types::{Classify, ErrorKind, MissingRole};
use thiserror::Error;

/// Errors that can occur while updating telemetry or economic parameters.
#[derive(Debug, Error)]
pub enum EconomicsError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] MissingRole),

    #[error("invalid network metrics: {0}")]
    InvalidMetrics(&'static str),

    #[error("invalid market data: {0}")]
    InvalidMarketData(&'static str),

    #[error("invalid economics parameter: {0}")]
    InvalidParameter(String),
}

impl Classify for EconomicsError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::InvalidMetrics(_) | Self::InvalidMarketData(_) => ErrorKind::Validation,
            Self::InvalidParameter(_) => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, EconomicsError>;
