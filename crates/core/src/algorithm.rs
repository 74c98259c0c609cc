//! Price algorithms.
//!
//! An algorithm turns a validated, timestamp-ordered buffer into one price.
//! The default is a step-function TWAP:
//!
//! ```text
//! TWAP = sum(price_i * duration_i) / sum(duration_i)
//! ```
//!
//! Where `duration_i` is the time from observation `i` to observation `i + 1`,
//! and `price_i` is held for that whole interval (no interpolation).

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::error;

use crate::buffer::ObservationBuffer;
use crate::error::{OracleError, Result};

/// Anything that can compute a price from ordered observations.
///
/// Implemented for every `Fn(&ObservationBuffer) -> Result<Decimal>`, so plain
/// functions such as [`time_weighted_average_price`] and closures can be
/// handed to an oracle directly.
pub trait PriceAlgorithm: Send + Sync {
    fn calculate(&self, observations: &ObservationBuffer) -> Result<Decimal>;
}

impl<F> PriceAlgorithm for F
where
    F: Fn(&ObservationBuffer) -> Result<Decimal> + Send + Sync,
{
    fn calculate(&self, observations: &ObservationBuffer) -> Result<Decimal> {
        self(observations)
    }
}

/// Interval length in seconds with millisecond resolution.
fn weight(duration: Duration) -> Decimal {
    Decimal::new(duration.num_milliseconds(), 3)
}

/// Step-weighted time-weighted average price.
///
/// # Errors
///
/// - [`OracleError::NotEnoughData`] if fewer than two observations are buffered
///   or they all share one instant; the validation policy should have
///   rejected such a buffer already.
/// - [`OracleError::ArithmeticOverflow`] if the weighted sum leaves decimal range.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rust_decimal::Decimal;
/// use twap_oracle_core::{time_weighted_average_price, ObservationBuffer, Observation};
///
/// // 100 for one hour, then 200 for three hours
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let mut buffer = ObservationBuffer::new();
/// buffer.insert(Observation::new(t0, Decimal::from(100)));
/// buffer.insert(Observation::new(t0 + chrono::Duration::hours(1), Decimal::from(200)));
/// buffer.insert(Observation::new(t0 + chrono::Duration::hours(4), Decimal::from(999)));
///
/// assert_eq!(time_weighted_average_price(&buffer).unwrap(), Decimal::from(175));
/// ```
pub fn time_weighted_average_price(observations: &ObservationBuffer) -> Result<Decimal> {
    let mut weighted_sum = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for (current, next) in observations.windows() {
        let w = weight(next.timestamp - current.timestamp);
        let contribution = current
            .price
            .checked_mul(w)
            .ok_or(OracleError::ArithmeticOverflow)?;

        weighted_sum = weighted_sum
            .checked_add(contribution)
            .ok_or(OracleError::ArithmeticOverflow)?;
        total_weight = total_weight
            .checked_add(w)
            .ok_or(OracleError::ArithmeticOverflow)?;
    }

    if total_weight.is_zero() {
        error!(
            "TWAP requested over {} observation(s) with no elapsed time; validation should have rejected this",
            observations.len()
        );
        return Err(OracleError::NotEnoughData {
            required: 2,
            available: observations.len(),
        });
    }

    weighted_sum
        .checked_div(total_weight)
        .ok_or(OracleError::ArithmeticOverflow)
}

/// Unweighted mean of every buffered price.
///
/// Ignores timing entirely, so it is only manipulation-resistant when the
/// observations are sampled at a regular interval.
pub fn arithmetic_mean_price(observations: &ObservationBuffer) -> Result<Decimal> {
    if observations.is_empty() {
        return Err(OracleError::NotEnoughData {
            required: 1,
            available: 0,
        });
    }

    let sum = observations
        .iter()
        .try_fold(Decimal::ZERO, |acc, o| acc.checked_add(o.price))
        .ok_or(OracleError::ArithmeticOverflow)?;

    sum.checked_div(Decimal::from(observations.len()))
        .ok_or(OracleError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::str::FromStr;
    use twap_oracle_types::Observation;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
    }

    fn buffer(points: &[(i64, &str)]) -> ObservationBuffer {
        let mut buffer = ObservationBuffer::new();
        for &(secs, price) in points {
            buffer.insert(Observation::new(
                t0() + Duration::seconds(secs),
                Decimal::from_str(price).unwrap(),
            ));
        }
        buffer
    }

    #[test]
    fn test_constant_price() {
        let b = buffer(&[(0, "100"), (1000, "100"), (2000, "100")]);
        assert_eq!(time_weighted_average_price(&b).unwrap(), Decimal::from(100));
    }

    #[test]
    fn test_unequal_durations() {
        // 100 for 3000s, then 200 for 1000s => (100*3000 + 200*1000) / 4000 = 125
        let b = buffer(&[(0, "100"), (3000, "200"), (4000, "200")]);
        assert_eq!(time_weighted_average_price(&b).unwrap(), Decimal::from(125));
    }

    #[test]
    fn test_last_price_carries_no_weight() {
        let b = buffer(&[(0, "10"), (60, "1000000")]);
        assert_eq!(time_weighted_average_price(&b).unwrap(), Decimal::from(10));
    }

    #[test]
    fn test_daily_series() {
        // 100 for a day, then 150 for a day
        let day = 24 * 60 * 60;
        let b = buffer(&[(0, "100"), (day, "150"), (2 * day, "120")]);
        assert_eq!(time_weighted_average_price(&b).unwrap(), Decimal::from(125));
    }

    #[test]
    fn test_sub_second_intervals() {
        let mut b = ObservationBuffer::new();
        b.insert(Observation::new(t0(), Decimal::from(10)));
        b.insert(Observation::new(t0() + Duration::milliseconds(250), Decimal::from(20)));
        b.insert(Observation::new(t0() + Duration::milliseconds(1000), Decimal::from(20)));

        // 10 for 0.25s, 20 for 0.75s
        assert_eq!(time_weighted_average_price(&b).unwrap(), Decimal::from_str("17.5").unwrap());
    }

    #[test]
    fn test_single_observation_is_not_enough() {
        let b = buffer(&[(0, "100")]);
        assert_eq!(
            time_weighted_average_price(&b),
            Err(OracleError::NotEnoughData { required: 2, available: 1 })
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let b = buffer(&[(0, "79228162514264337593543950335"), (10, "1")]);
        assert_eq!(time_weighted_average_price(&b), Err(OracleError::ArithmeticOverflow));
    }

    #[test]
    fn test_arithmetic_mean() {
        let b = buffer(&[(0, "100"), (86_400, "150"), (172_800, "120")]);
        let mean = arithmetic_mean_price(&b).unwrap();
        let expected = Decimal::from_str("123.3333333333333333333333333").unwrap();

        assert!((mean - expected).abs() < Decimal::new(1, 20));
    }

    #[test]
    fn test_arithmetic_mean_empty() {
        assert!(matches!(
            arithmetic_mean_price(&ObservationBuffer::new()),
            Err(OracleError::NotEnoughData { .. })
        ));
    }

    #[test]
    fn test_closure_as_algorithm() {
        let newest_only = |b: &ObservationBuffer| b.newest().map(|o| o.price);
        let b = buffer(&[(0, "1"), (10, "2")]);

        assert_eq!(newest_only.calculate(&b).unwrap(), Decimal::from(2));
    }
}
