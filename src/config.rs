//! Service configuration read from `ORACLE_*` environment variables.

use std::time::Duration as StdDuration;

use anyhow::{bail, Context};
use chrono::Duration;
use twap_oracle_core::policy::duration_from_secs_checked;
use twap_oracle_core::{MaxAge, OracleConfig, PairDetails};

/// Default WebSocket bind address (0.0.0.0 for Docker/production).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8083";

/// Default token decimals for both sides of the pair.
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

/// Everything the service needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// WebSocket server address
    pub bind_addr: String,

    /// Thresholds for the oracle
    pub oracle: OracleConfig,

    /// Decimals and quote direction for `sync` records
    pub pair: PairDetails,

    /// How often the oracle is queried and the result broadcast
    pub query_interval: StdDuration,

    /// Observations older than `now - retention` are evicted; `None` keeps everything
    pub retention: Option<Duration>,
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = OracleConfig::default();

        let max_age = match lookup("ORACLE_MAX_AGE_SECS") {
            Some(v) if v.trim().eq_ignore_ascii_case("any") => MaxAge::Any,
            Some(v) => MaxAge::Within(parse_duration_secs("ORACLE_MAX_AGE_SECS", &v)?),
            None => defaults.max_age,
        };

        let oracle = OracleConfig {
            min_entries: parse_or("ORACLE_MIN_ENTRIES", &lookup, defaults.min_entries)?,
            max_age,
            min_duration: match lookup("ORACLE_MIN_DURATION_SECS") {
                Some(v) => parse_duration_secs("ORACLE_MIN_DURATION_SECS", &v)?,
                None => defaults.min_duration,
            },
        };

        let mut pair = PairDetails::new(
            parse_or("ORACLE_TOKEN0_DECIMALS", &lookup, DEFAULT_TOKEN_DECIMALS)?,
            parse_or("ORACLE_TOKEN1_DECIMALS", &lookup, DEFAULT_TOKEN_DECIMALS)?,
        );
        if parse_or("ORACLE_REVERSE_TOKEN_ORDER", &lookup, false)? {
            pair = pair.reversed();
        }

        let interval_secs: u64 = parse_or("ORACLE_QUERY_INTERVAL_SECS", &lookup, 1)?;
        if interval_secs == 0 {
            bail!("ORACLE_QUERY_INTERVAL_SECS must be at least 1");
        }

        let retention = lookup("ORACLE_RETENTION_SECS")
            .map(|v| parse_duration_secs("ORACLE_RETENTION_SECS", &v))
            .transpose()?;

        Ok(Self {
            bind_addr: lookup("ORACLE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            oracle,
            pair,
            query_interval: StdDuration::from_secs(interval_secs),
            retention,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        None => Ok(default),
    }
}

fn parse_duration_secs(key: &str, value: &str) -> anyhow::Result<Duration> {
    let secs: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))?;
    match duration_from_secs_checked(secs) {
        Ok(duration) => Ok(duration),
        Err(reason) => bail!("{key}: {reason}"),
    }
}
