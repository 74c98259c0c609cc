//! Errors returned by the oracle engine.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use twap_oracle_types::FailureKind;

/// Error types for oracle operations.
///
/// Every variant is a recoverable, caller-visible outcome.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    /// Fewer observations than required.
    #[error("not enough data: need {required} observations, have {available}")]
    NotEnoughData {
        /// Number of observations required.
        required: usize,
        /// Number of observations available.
        available: usize,
    },

    /// The newest observation is older than the allowed age.
    #[error("data too old: newest observation at {newest}, now {now}, max age {max_age}")]
    DataTooOld {
        newest: DateTime<Utc>,
        now: DateTime<Utc>,
        max_age: Duration,
    },

    /// Observations do not span enough time to resist manipulation.
    #[error("data period too short: observations span {span}, need at least {min_duration}")]
    DataPeriodTooShort { span: Duration, min_duration: Duration },

    /// A zero or negative price was fed.
    #[error("invalid price {price} at {timestamp}: prices must be positive")]
    InvalidPrice {
        timestamp: DateTime<Utc>,
        price: Decimal,
    },

    /// Decimal arithmetic overflowed.
    #[error("arithmetic overflow while computing price")]
    ArithmeticOverflow,

    /// Pool reserves were zero or out of decimal range.
    #[error("invalid reserves in sync event at block {block_number}")]
    InvalidReserves { block_number: u64 },
}

impl OracleError {
    /// The wire-level failure kind for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            OracleError::NotEnoughData { .. } => FailureKind::NotEnoughData,
            OracleError::DataTooOld { .. } => FailureKind::DataTooOld,
            OracleError::DataPeriodTooShort { .. } => FailureKind::DataPeriodTooShort,
            OracleError::InvalidPrice { .. } => FailureKind::InvalidPrice,
            OracleError::ArithmeticOverflow => FailureKind::ArithmeticOverflow,
            OracleError::InvalidReserves { .. } => FailureKind::InvalidReserves,
        }
    }
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
