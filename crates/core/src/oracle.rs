//! Price oracle facade.
//!
//! Composes the ordered buffer, the validation policy and a pluggable price
//! algorithm. One oracle tracks one asset pair.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use twap_oracle_types::{Observation, PriceReport};

use crate::algorithm::PriceAlgorithm;
use crate::buffer::ObservationBuffer;
use crate::error::{OracleError, Result};
use crate::policy::{self, MaxAge, OracleConfig};

/// Stateful oracle for a single asset pair.
pub struct PriceOracle {
    algorithm: Box<dyn PriceAlgorithm>,
    buffer: ObservationBuffer,
    config: OracleConfig,
}

impl PriceOracle {
    /// Disables the freshness check; use for historical data.
    pub const ANY_AGE: MaxAge = MaxAge::Any;

    /// Create an oracle with the default thresholds.
    pub fn new(algorithm: impl PriceAlgorithm + 'static) -> Self {
        Self::with_config(algorithm, OracleConfig::default())
    }

    /// Create an oracle with explicit thresholds.
    pub fn with_config(algorithm: impl PriceAlgorithm + 'static, config: OracleConfig) -> Self {
        Self {
            algorithm: Box::new(algorithm),
            buffer: ObservationBuffer::new(),
            config,
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Add one price sample.
    ///
    /// Fails only for non-positive prices; the validation policy is never
    /// evaluated at feed time.
    pub fn feed(&mut self, timestamp: DateTime<Utc>, price: Decimal, block_number: Option<u64>) -> Result<()> {
        self.feed_observation(Observation {
            timestamp,
            price,
            block_number,
        })
    }

    /// Add a prebuilt observation.
    pub fn feed_observation(&mut self, observation: Observation) -> Result<()> {
        if observation.price <= Decimal::ZERO {
            return Err(OracleError::InvalidPrice {
                timestamp: observation.timestamp,
                price: observation.price,
            });
        }

        debug!(
            "Observation fed: {} at {} (block {:?})",
            observation.price, observation.timestamp, observation.block_number
        );
        self.buffer.insert(observation);
        Ok(())
    }

    /// Add many `(timestamp, price)` samples, in any order.
    ///
    /// Stops at the first non-positive price; samples before it stay buffered.
    pub fn feed_batch<I>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = (DateTime<Utc>, Decimal)>,
    {
        for (timestamp, price) in samples {
            self.feed(timestamp, price, None)?;
        }
        Ok(())
    }

    /// Validate the buffer against `now` and compute the price.
    ///
    /// Does not mutate the oracle, so repeated calls with the same `now`
    /// return the same result.
    pub fn calculate_price(&self, now: DateTime<Utc>) -> Result<Decimal> {
        policy::validate(&self.buffer, &self.config, now)?;
        self.algorithm.calculate(&self.buffer)
    }

    /// Like [`calculate_price`](Self::calculate_price), with the evidence behind the price.
    pub fn report(&self, now: DateTime<Utc>) -> Result<PriceReport> {
        let price = self.calculate_price(now)?;
        let span = self.buffer.duration_span()?;

        Ok(PriceReport {
            price,
            computed_at: now,
            oldest: *self.buffer.oldest()?,
            newest: *self.buffer.newest()?,
            entries: self.buffer.len(),
            span_secs: span.num_seconds(),
        })
    }

    pub fn oldest(&self) -> Result<Observation> {
        self.buffer.oldest().copied()
    }

    pub fn newest(&self) -> Result<Observation> {
        self.buffer.newest().copied()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Time between the oldest and newest buffered observation.
    pub fn buffer_duration(&self) -> Result<Duration> {
        self.buffer.duration_span()
    }

    /// Buffered observations in ascending timestamp order.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> + Clone + '_ {
        self.buffer.iter()
    }

    /// Explicitly evict observations older than `cutoff`.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let pruned = self.buffer.prune_before(cutoff);
        if pruned > 0 {
            debug!("Pruned {} observations older than {}", pruned, cutoff);
        }
        pruned
    }
}

impl std::fmt::Debug for PriceOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceOracle")
            .field("entries", &self.buffer.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{arithmetic_mean_price, time_weighted_average_price};
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let mut oracle = PriceOracle::new(time_weighted_average_price);

        assert!(matches!(
            oracle.feed(day(1), Decimal::ZERO, None),
            Err(OracleError::InvalidPrice { .. })
        ));
        assert!(matches!(
            oracle.feed(day(1), Decimal::from(-5), None),
            Err(OracleError::InvalidPrice { .. })
        ));
        assert_eq!(oracle.buffer_size(), 0);
    }

    #[test]
    fn test_feed_batch_stops_at_invalid_price() {
        let mut oracle = PriceOracle::new(time_weighted_average_price);
        let result = oracle.feed_batch(vec![
            (day(1), Decimal::from(100)),
            (day(2), Decimal::ZERO),
            (day(3), Decimal::from(120)),
        ]);

        assert!(result.is_err());
        assert_eq!(oracle.buffer_size(), 1);
    }

    #[test]
    fn test_report_carries_evidence() {
        let mut oracle = PriceOracle::with_config(
            time_weighted_average_price,
            OracleConfig {
                max_age: PriceOracle::ANY_AGE,
                ..OracleConfig::default()
            },
        );
        oracle.feed(day(2), Decimal::from(150), Some(2)).unwrap();
        oracle.feed(day(1), Decimal::from(100), Some(1)).unwrap();

        let report = oracle.report(day(3)).unwrap();

        assert_eq!(report.price, Decimal::from(100));
        assert_eq!(report.entries, 2);
        assert_eq!(report.span_secs, 86_400);
        assert_eq!(report.oldest.block_number, Some(1));
        assert_eq!(report.newest.block_number, Some(2));
        assert_eq!(report.computed_at, day(3));
    }

    #[test]
    fn test_swapping_algorithm_keeps_validation() {
        let mut oracle = PriceOracle::new(arithmetic_mean_price);
        oracle.feed(day(1), Decimal::from(100), None).unwrap();

        assert!(matches!(
            oracle.calculate_price(day(1)),
            Err(OracleError::NotEnoughData { required: 2, available: 1 })
        ));
    }

    #[test]
    fn test_prune_is_explicit() {
        let mut oracle = PriceOracle::new(time_weighted_average_price);
        for d in 1..=4 {
            oracle.feed(day(d), Decimal::from(100), None).unwrap();
        }

        assert_eq!(oracle.buffer_size(), 4);
        assert_eq!(oracle.prune_before(day(3)), 2);
        assert_eq!(oracle.oldest().unwrap().timestamp, day(3));
    }
}
