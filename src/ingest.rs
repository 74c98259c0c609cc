//! JSON-lines ingestion and the periodic query loop.
//!
//! Each input line is one record:
//!
//! ```text
//! {"type":"observation","timestamp":"2022-01-02T01:18:40Z","price":"1000.5","block_number":14000000}
//! {"type":"sync","block_number":14000001,"timestamp":"2022-01-02T01:18:43Z","reserve0":"...","reserve1":"..."}
//! ```
//!
//! The oracle is shared as `Arc<RwLock<PriceOracle>>`: one feed holds the
//! write lock, one complete query holds the read lock.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::{Observation, OracleEvent, PairDetails, PriceOracle, SyncEvent};

/// One line of ingestion input.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestRecord {
    /// A price that was already computed upstream
    Observation(Observation),

    /// Raw pool reserves from a decoded `Sync` event
    Sync(SyncEvent),
}

impl IngestRecord {
    pub fn into_observation(self, pair: &PairDetails) -> anyhow::Result<Observation> {
        match self {
            IngestRecord::Observation(obs) => Ok(obs),
            IngestRecord::Sync(event) => Ok(event.to_observation(pair)?),
        }
    }
}

/// Parse one input line into an observation.
pub fn parse_line(line: &str, pair: &PairDetails) -> anyhow::Result<Observation> {
    let record: IngestRecord = serde_json::from_str(line).context("malformed ingestion record")?;
    record.into_observation(pair)
}

/// Feed every line of `reader` into the oracle until EOF.
///
/// Malformed lines and rejected prices are logged, broadcast as
/// [`OracleEvent::Error`], and skipped. Returns the number of observations fed.
pub async fn run_ingest<R>(
    reader: R,
    oracle: Arc<RwLock<PriceOracle>>,
    pair: PairDetails,
    event_tx: broadcast::Sender<OracleEvent>,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut fed = 0;
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let observation = match parse_line(&line, &pair) {
            Ok(obs) => obs,
            Err(e) => {
                warn!("Skipping line {}: {:#}", line_no, e);
                let _ = event_tx.send(OracleEvent::Error {
                    message: format!("line {line_no}: {e:#}"),
                });
                continue;
            }
        };

        let result = oracle.write().await.feed_observation(observation);
        match result {
            Ok(()) => {
                fed += 1;
                let _ = event_tx.send(OracleEvent::Observation(observation));
            }
            Err(e) => {
                warn!("Rejected observation on line {}: {}", line_no, e);
                let _ = event_tx.send(OracleEvent::Error {
                    message: format!("line {line_no}: {e}"),
                });
            }
        }
    }

    info!("Ingestion finished: {} observations fed from {} lines", fed, line_no);
    Ok(fed)
}

/// Run one complete query against the oracle.
pub async fn query_once(oracle: &RwLock<PriceOracle>, now: DateTime<Utc>) -> OracleEvent {
    match oracle.read().await.report(now) {
        Ok(report) => OracleEvent::Price(report),
        Err(e) => OracleEvent::Rejected {
            kind: e.kind(),
            message: e.to_string(),
        },
    }
}

/// Oldest timestamp kept under `retention`, or `None` if it falls before
/// the representable date range (nothing can be that old).
pub fn retention_cutoff(now: DateTime<Utc>, retention: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(retention)
}

/// Query the oracle on every tick and broadcast the outcome.
///
/// Logs only when the oracle switches between answering and refusing, or
/// when the refusal reason changes.
pub async fn run_query_loop(
    oracle: Arc<RwLock<PriceOracle>>,
    config: ServiceConfig,
    event_tx: broadcast::Sender<OracleEvent>,
) {
    let mut interval = tokio::time::interval(config.query_interval);
    let mut last_failure = None;
    let mut was_ready = false;

    loop {
        interval.tick().await;
        let now = Utc::now();

        if let Some(cutoff) = config.retention.and_then(|r| retention_cutoff(now, r)) {
            let pruned = oracle.write().await.prune_before(cutoff);
            if pruned > 0 {
                debug!("Evicted {} observations outside the retention window", pruned);
            }
        }

        let event = query_once(&oracle, now).await;
        match &event {
            OracleEvent::Price(report) => {
                if !was_ready {
                    info!(
                        "Oracle ready: price {} from {} observations over {}s",
                        report.price, report.entries, report.span_secs
                    );
                }
                was_ready = true;
                last_failure = None;
            }
            OracleEvent::Rejected { kind, message } => {
                if was_ready || last_failure != Some(*kind) {
                    warn!("Oracle refused price: {}", message);
                }
                was_ready = false;
                last_failure = Some(*kind);
            }
            OracleEvent::Observation(_) | OracleEvent::Error { .. } => {}
        }

        let _ = event_tx.send(event);
    }
}
