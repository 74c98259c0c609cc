//! Validation policy applied before a price is trusted.
//!
//! The checks run in a fixed order and the first failure wins:
//!
//! 1. sufficiency: enough observations are buffered
//! 2. freshness: the newest observation is recent relative to `now`
//! 3. window length: the observations cover a long enough period
//!
//! Each check is a pure function of the buffer and its threshold, and `now`
//! is always passed in by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};

use crate::buffer::ObservationBuffer;
use crate::error::{OracleError, Result};

/// Default minimum number of observations.
pub const DEFAULT_MIN_ENTRIES: usize = 2;

/// Default maximum age of the newest observation in seconds (1 hour).
pub const DEFAULT_MAX_AGE_SECS: i64 = 60 * 60;

/// Default minimum span between oldest and newest observation in seconds (5 minutes).
pub const DEFAULT_MIN_DURATION_SECS: i64 = 5 * 60;

/// How old the newest observation may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "MaxAgeRepr")]
pub enum MaxAge {
    /// Freshness is not checked (historical replays).
    Any,

    /// `now - newest` must not exceed this duration.
    Within(Duration),
}

impl Default for MaxAge {
    fn default() -> Self {
        MaxAge::Within(Duration::seconds(DEFAULT_MAX_AGE_SECS))
    }
}

impl std::fmt::Display for MaxAge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaxAge::Any => write!(f, "any"),
            MaxAge::Within(age) => write!(f, "{}s", age.num_seconds()),
        }
    }
}

/// Config form of [`MaxAge`]: seconds, or the keyword `"any"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaxAgeRepr {
    Secs(i64),
    Keyword(String),
}

impl TryFrom<MaxAgeRepr> for MaxAge {
    type Error = String;

    fn try_from(repr: MaxAgeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            MaxAgeRepr::Secs(secs) => duration_from_secs_checked(secs).map(MaxAge::Within),
            MaxAgeRepr::Keyword(word) if word.eq_ignore_ascii_case("any") => Ok(MaxAge::Any),
            MaxAgeRepr::Keyword(word) => Err(format!("max_age must be seconds or \"any\", got {word:?}")),
        }
    }
}

/// Thresholds fixed for the lifetime of one oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Minimum number of buffered observations.
    pub min_entries: usize,

    /// Maximum age of the newest observation.
    pub max_age: MaxAge,

    /// Minimum span between the oldest and newest observation.
    #[serde(rename = "min_duration_secs", deserialize_with = "duration_from_secs")]
    pub min_duration: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            min_entries: DEFAULT_MIN_ENTRIES,
            max_age: MaxAge::default(),
            min_duration: Duration::seconds(DEFAULT_MIN_DURATION_SECS),
        }
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = i64::deserialize(deserializer)?;
    duration_from_secs_checked(secs).map_err(serde::de::Error::custom)
}

/// Seconds to a duration, rejecting negative and out-of-range values.
pub fn duration_from_secs_checked(secs: i64) -> std::result::Result<Duration, String> {
    if secs < 0 {
        return Err(format!("duration must not be negative, got {secs}"));
    }
    Duration::try_seconds(secs).ok_or_else(|| format!("duration of {secs}s is out of range"))
}

/// Fail with `NotEnoughData` unless at least `min_entries` observations are buffered.
pub fn check_sufficiency(buffer: &ObservationBuffer, min_entries: usize) -> Result<()> {
    if buffer.len() < min_entries {
        return Err(OracleError::NotEnoughData {
            required: min_entries,
            available: buffer.len(),
        });
    }
    Ok(())
}

/// Fail with `DataTooOld` if the newest observation is older than `max_age` at `now`.
pub fn check_freshness(buffer: &ObservationBuffer, max_age: MaxAge, now: DateTime<Utc>) -> Result<()> {
    let MaxAge::Within(max_age) = max_age else {
        return Ok(());
    };

    let newest = buffer.newest()?.timestamp;
    if now - newest > max_age {
        return Err(OracleError::DataTooOld {
            newest,
            now,
            max_age,
        });
    }
    Ok(())
}

/// Fail with `DataPeriodTooShort` if the buffered observations span less than `min_duration`.
pub fn check_window(buffer: &ObservationBuffer, min_duration: Duration) -> Result<()> {
    let span = buffer.duration_span()?;
    if span < min_duration {
        return Err(OracleError::DataPeriodTooShort { span, min_duration });
    }
    Ok(())
}

/// Run all checks in order.
pub fn validate(buffer: &ObservationBuffer, config: &OracleConfig, now: DateTime<Utc>) -> Result<()> {
    check_sufficiency(buffer, config.min_entries)?;
    check_freshness(buffer, config.max_age, now)?;
    check_window(buffer, config.min_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use twap_oracle_types::Observation;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 2, 1, 18, 40).unwrap()
    }

    fn buffer_at(offsets_secs: &[i64]) -> ObservationBuffer {
        let mut buffer = ObservationBuffer::new();
        for &offset in offsets_secs {
            buffer.insert(Observation::new(t0() + Duration::seconds(offset), Decimal::ONE));
        }
        buffer
    }

    #[test]
    fn test_sufficiency() {
        let buffer = buffer_at(&[0, 60]);

        assert!(check_sufficiency(&buffer, 2).is_ok());
        assert_eq!(
            check_sufficiency(&buffer, 3),
            Err(OracleError::NotEnoughData { required: 3, available: 2 })
        );
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let buffer = buffer_at(&[0, 300]);
        let newest = t0() + Duration::seconds(300);
        let max_age = MaxAge::Within(Duration::seconds(60));

        assert!(check_freshness(&buffer, max_age, newest + Duration::seconds(60)).is_ok());
        assert!(matches!(
            check_freshness(&buffer, max_age, newest + Duration::seconds(61)),
            Err(OracleError::DataTooOld { .. })
        ));
    }

    #[test]
    fn test_freshness_accepts_future_data() {
        let buffer = buffer_at(&[0, 300]);
        let max_age = MaxAge::Within(Duration::seconds(1));

        assert!(check_freshness(&buffer, max_age, t0()).is_ok());
    }

    #[test]
    fn test_any_age_skips_freshness() {
        let buffer = buffer_at(&[0, 300]);
        let far_future = t0() + Duration::days(3650);

        assert!(check_freshness(&buffer, MaxAge::Any, far_future).is_ok());
    }

    #[test]
    fn test_window_length() {
        let buffer = buffer_at(&[0, 300]);

        assert!(check_window(&buffer, Duration::seconds(300)).is_ok());
        assert_eq!(
            check_window(&buffer, Duration::seconds(301)),
            Err(OracleError::DataPeriodTooShort {
                span: Duration::seconds(300),
                min_duration: Duration::seconds(301),
            })
        );
    }

    #[test]
    fn test_window_needs_two_entries() {
        let buffer = buffer_at(&[0]);

        assert!(matches!(
            check_window(&buffer, Duration::zero()),
            Err(OracleError::NotEnoughData { required: 2, available: 1 })
        ));
    }

    #[test]
    fn test_freshness_checked_before_window() {
        // Stale and too short at the same time
        let buffer = buffer_at(&[0, 1]);
        let config = OracleConfig {
            min_entries: 1,
            max_age: MaxAge::Within(Duration::days(1)),
            min_duration: Duration::days(1),
        };

        let result = validate(&buffer, &config, t0() + Duration::days(2));
        assert!(matches!(result, Err(OracleError::DataTooOld { .. })));
    }

    #[test]
    fn test_config_defaults() {
        let config = OracleConfig::default();

        assert_eq!(config.min_entries, 2);
        assert_eq!(config.max_age, MaxAge::Within(Duration::hours(1)));
        assert_eq!(config.min_duration, Duration::minutes(5));
    }

    #[test]
    fn test_config_from_json() {
        let config: OracleConfig =
            serde_json::from_str(r#"{"min_entries": 8, "max_age": "any", "min_duration_secs": 3600}"#).unwrap();

        assert_eq!(config.min_entries, 8);
        assert_eq!(config.max_age, MaxAge::Any);
        assert_eq!(config.min_duration, Duration::hours(1));

        let partial: OracleConfig = serde_json::from_str(r#"{"max_age": 86400}"#).unwrap();
        assert_eq!(partial.min_entries, DEFAULT_MIN_ENTRIES);
        assert_eq!(partial.max_age, MaxAge::Within(Duration::days(1)));
    }

    #[test]
    fn test_config_rejects_bad_max_age() {
        assert!(serde_json::from_str::<OracleConfig>(r#"{"max_age": "forever"}"#).is_err());
        assert!(serde_json::from_str::<OracleConfig>(r#"{"max_age": -5}"#).is_err());
    }

    #[test]
    fn test_config_rejects_out_of_range_durations() {
        let huge = i64::MAX;

        let err = serde_json::from_str::<OracleConfig>(&format!(r#"{{"min_duration_secs": {huge}}}"#)).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let err = serde_json::from_str::<OracleConfig>(&format!(r#"{{"max_age": {huge}}}"#)).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn test_duration_from_secs_checked() {
        assert_eq!(duration_from_secs_checked(90), Ok(Duration::seconds(90)));
        assert!(duration_from_secs_checked(-1).is_err());
        assert!(duration_from_secs_checked(i64::MAX / 1000 + 1).is_err());
    }
}
