//! Value and wire-format types for the TWAP oracle.
//!
//! These types are shared by the oracle engine and by every consumer of the
//! broadcast feed, so they carry no behaviour beyond construction and serde.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single timestamped price sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// When the price was observed (block timestamp for on-chain sources)
    pub timestamp: DateTime<Utc>,

    /// Quote-per-base price, always positive once accepted by an oracle
    pub price: Decimal,

    /// Originating block, diagnostics only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl Observation {
    /// Create an observation without chain provenance.
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            timestamp,
            price,
            block_number: None,
        }
    }

    /// Create an observation tagged with the block it was read from.
    pub fn with_block(timestamp: DateTime<Utc>, price: Decimal, block_number: u64) -> Self {
        Self {
            timestamp,
            price,
            block_number: Some(block_number),
        }
    }
}

/// Why the oracle refused to produce a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Fewer observations than the configured minimum
    NotEnoughData,

    /// Newest observation is older than the allowed age
    DataTooOld,

    /// Observations span too short a period to resist manipulation
    DataPeriodTooShort,

    /// A fed price was zero or negative
    InvalidPrice,

    /// Decimal arithmetic overflowed while weighting
    ArithmeticOverflow,

    /// Pool reserves could not be turned into a price
    InvalidReserves,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotEnoughData => "not_enough_data",
            FailureKind::DataTooOld => "data_too_old",
            FailureKind::DataPeriodTooShort => "data_period_too_short",
            FailureKind::InvalidPrice => "invalid_price",
            FailureKind::ArithmeticOverflow => "arithmetic_overflow",
            FailureKind::InvalidReserves => "invalid_reserves",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An accepted oracle price together with the evidence it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReport {
    /// The weighted price
    pub price: Decimal,

    /// The `now` the validation policy was evaluated against
    pub computed_at: DateTime<Utc>,

    /// Oldest buffered observation
    pub oldest: Observation,

    /// Newest buffered observation
    pub newest: Observation,

    /// Number of buffered observations
    pub entries: usize,

    /// Seconds between oldest and newest observation
    pub span_secs: i64,
}

/// Events emitted by the oracle service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleEvent {
    /// A new observation was accepted into the buffer
    Observation(Observation),

    /// The oracle produced a price
    Price(PriceReport),

    /// The oracle refused to produce a price
    Rejected { kind: FailureKind, message: String },

    /// An ingestion or service error occurred
    Error { message: String },
}
