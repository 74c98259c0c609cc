//! TWAP Oracle Service
//!
//! Reads observations as JSON lines on stdin, keeps a validated TWAP and
//! broadcasts prices and rejections over WebSocket.
//!
//! # Usage
//!
//! ```bash
//! ORACLE_MAX_AGE_SECS=any cargo run < observations.jsonl
//! ```

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};

use twap_oracle::{
    run_ingest, run_query_loop, run_server, time_weighted_average_price, OracleEvent, PriceOracle,
    ServiceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let config = ServiceConfig::from_env()?;

    info!("Starting TWAP Oracle Service");
    info!(
        "Policy: min_entries={}, max_age={}, min_duration={}s, query every {:?}",
        config.oracle.min_entries,
        config.oracle.max_age,
        config.oracle.min_duration.num_seconds(),
        config.query_interval
    );

    let oracle = Arc::new(RwLock::new(PriceOracle::with_config(
        time_weighted_average_price,
        config.oracle,
    )));

    // Broadcast channel for oracle events (to WebSocket clients)
    let (event_tx, _) = broadcast::channel::<OracleEvent>(256);

    // Start WebSocket server
    let server_rx = event_tx.subscribe();
    let addr = config.bind_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_server(&addr, server_rx).await {
            error!("WebSocket server error: {:#}", e);
        }
    });

    // Start the periodic query task
    tokio::spawn(run_query_loop(oracle.clone(), config.clone(), event_tx.clone()));

    // Ingest until stdin closes, then keep serving the last state
    let stdin = BufReader::new(tokio::io::stdin());
    let fed = run_ingest(stdin, oracle.clone(), config.pair, event_tx).await?;
    info!("Input closed after {} observations; serving until interrupted", fed);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down with {} observations buffered", oracle.read().await.buffer_size());

    Ok(())
}
