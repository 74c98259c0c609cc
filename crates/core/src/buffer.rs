//! Ordered observation buffer.
//!
//! Observations arrive in whatever order the ingestion adapter discovers
//! them. The buffer keys them by timestamp so the oldest and newest entries
//! and the ascending iteration never depend on feed order.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use twap_oracle_types::Observation;

use crate::error::{OracleError, Result};

/// Timestamp-ordered store of observations.
///
/// At most one observation is kept per timestamp; a later insert at the same
/// timestamp replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct ObservationBuffer {
    entries: BTreeMap<DateTime<Utc>, Observation>,
}

impl ObservationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation, returning the one it replaced (if any).
    pub fn insert(&mut self, observation: Observation) -> Option<Observation> {
        let replaced = self.entries.insert(observation.timestamp, observation);

        if let Some(old) = &replaced {
            debug!(
                "Replaced observation at {}: {} -> {}",
                observation.timestamp, old.price, observation.price
            );
        }

        replaced
    }

    /// Observation with the smallest timestamp.
    pub fn oldest(&self) -> Result<&Observation> {
        self.entries
            .values()
            .next()
            .ok_or(OracleError::NotEnoughData {
                required: 1,
                available: 0,
            })
    }

    /// Observation with the largest timestamp.
    pub fn newest(&self) -> Result<&Observation> {
        self.entries
            .values()
            .next_back()
            .ok_or(OracleError::NotEnoughData {
                required: 1,
                available: 0,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time between the oldest and newest observation.
    pub fn duration_span(&self) -> Result<Duration> {
        if self.entries.len() < 2 {
            return Err(OracleError::NotEnoughData {
                required: 2,
                available: self.entries.len(),
            });
        }

        Ok(self.newest()?.timestamp - self.oldest()?.timestamp)
    }

    /// Observations in ascending timestamp order.
    ///
    /// The iterator is `Clone`, so it can be restarted without touching the buffer.
    pub fn iter(&self) -> impl Iterator<Item = &Observation> + Clone + DoubleEndedIterator + '_ {
        self.entries.values()
    }

    /// Adjacent `(earlier, later)` pairs in ascending timestamp order.
    pub fn windows(&self) -> impl Iterator<Item = (&Observation, &Observation)> + '_ {
        self.entries.values().zip(self.entries.values().skip(1))
    }

    /// Drop every observation strictly older than `cutoff`.
    ///
    /// Returns the number of observations removed.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let original_len = self.entries.len();
        self.entries = self.entries.split_off(&cutoff);
        original_len - self.entries.len()
    }
}
