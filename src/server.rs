//! WebSocket server broadcasting oracle events to subscribers.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::OracleEvent;

/// Accept WebSocket clients and push every oracle event to them as JSON.
///
/// Only returns if the listener cannot be bound.
pub async fn run_server(addr: &str, event_rx: broadcast::Receiver<OracleEvent>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Oracle WebSocket server listening on {}", addr);

    // Serialize each event once and fan the JSON out to every client
    let (json_tx, _) = broadcast::channel::<String>(256);
    tokio::spawn(forward_as_json(event_rx, json_tx.clone()));

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let client_rx = json_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, peer_addr, client_rx).await {
                debug!("Client {} error: {}", peer_addr, e);
            }
        });
    }
}

async fn forward_as_json(mut event_rx: broadcast::Receiver<OracleEvent>, json_tx: broadcast::Sender<String>) {
    loop {
        match event_rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => {
                    // No subscribers is not an error
                    let _ = json_tx.send(json);
                }
                Err(e) => error!("Failed to serialize oracle event: {}", e),
            },
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event forwarder lagged, {} events dropped", skipped);
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    peer_addr: SocketAddr,
    mut json_rx: broadcast::Receiver<String>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    info!("Client {} subscribed", peer_addr);

    loop {
        tokio::select! {
            json = json_rx.recv() => {
                match json {
                    Ok(json) => ws_sender.send(Message::Text(json)).await?,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Client {} lagged, {} events dropped", peer_addr, skipped);
                    }
                }
            }

            // Clients only ever close; anything else is ignored
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
        }
    }

    info!("Client {} disconnected", peer_addr);
    Ok(())
}
