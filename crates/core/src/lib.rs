//! # twap-oracle-core
//!
//! Manipulation-resistant time-weighted average price engine.
//!
//! The oracle buffers timestamped price observations in any arrival order
//! and only answers a price query when the evidence is sufficient, fresh and
//! spans a long enough window. Everything here is synchronous: the caller
//! supplies `now`, and no clock, network or storage is touched.
//!
//! ## Modules
//!
//! - [`buffer`] — timestamp-ordered observation buffer
//! - [`policy`] — sufficiency, freshness and window-length checks
//! - [`algorithm`] — pluggable price algorithms (TWAP, arithmetic mean)
//! - [`oracle`] — the [`PriceOracle`] facade
//! - [`uniswap_v2`] — pricing decoded `Sync` reserve updates
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use rust_decimal::Decimal;
//! use twap_oracle_core::{time_weighted_average_price, OracleError, PriceOracle};
//!
//! let mut oracle = PriceOracle::new(time_weighted_average_price);
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
//!
//! oracle.feed(t0, Decimal::from(100), None).unwrap();
//! assert!(matches!(
//!     oracle.calculate_price(t0),
//!     Err(OracleError::NotEnoughData { .. })
//! ));
//!
//! oracle.feed(t0 + chrono::Duration::minutes(10), Decimal::from(102), None).unwrap();
//! let now = t0 + chrono::Duration::minutes(11);
//! assert_eq!(oracle.calculate_price(now).unwrap(), Decimal::from(100));
//! ```

pub mod algorithm;
pub mod buffer;
pub mod error;
pub mod oracle;
pub mod policy;
pub mod uniswap_v2;

pub use algorithm::{arithmetic_mean_price, time_weighted_average_price, PriceAlgorithm};
pub use buffer::ObservationBuffer;
pub use error::{OracleError, Result};
pub use oracle::PriceOracle;
pub use policy::{MaxAge, OracleConfig};
pub use twap_oracle_types::{FailureKind, Observation, PriceReport};
pub use uniswap_v2::{feed_sync_events, PairDetails, SyncEvent};
