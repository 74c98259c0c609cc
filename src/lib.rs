//! TWAP Oracle Service
//!
//! This crate computes manipulation-resistant time-weighted average prices
//! from DEX observations and broadcasts them to WebSocket clients.
//!
//! # Features
//!
//! - **Ordered buffering** of observations fed in any order
//! - **Validation** of sample count, freshness and window length before a price is trusted
//! - **Pluggable algorithms**: step-weighted TWAP by default
//! - **Uniswap v2 `Sync` reserves** as an observation source
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::{broadcast, RwLock};
//! use twap_oracle::{run_ingest, run_query_loop, time_weighted_average_price, PriceOracle, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::from_env()?;
//!     let oracle = Arc::new(RwLock::new(PriceOracle::with_config(
//!         time_weighted_average_price,
//!         config.oracle,
//!     )));
//!     let (tx, _rx) = broadcast::channel(256);
//!
//!     tokio::spawn(run_query_loop(oracle.clone(), config.clone(), tx.clone()));
//!
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     run_ingest(stdin, oracle, config.pair, tx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod ingest;
pub mod server;

pub use config::ServiceConfig;
pub use ingest::{parse_line, query_once, run_ingest, run_query_loop, IngestRecord};
pub use server::run_server;
pub use twap_oracle_core::{
    arithmetic_mean_price, feed_sync_events, time_weighted_average_price, MaxAge, ObservationBuffer,
    OracleConfig, OracleError, PairDetails, PriceAlgorithm, PriceOracle, SyncEvent,
};
pub use twap_oracle_types::{FailureKind, Observation, OracleEvent, PriceReport};
