use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::DashboardEvent;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Forwards every snapshot published after this client connected. A lagged
/// client skips stale snapshots; a failed send drops only this client.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before entering the loop so nothing published after the
    // upgrade is missed.
    let mut rx = state.bus.subscribe();
    let (mut ws_tx, mut ws_rx) = socket.split();

    state.metrics.connected_clients().inc();
    info!("dashboard client connected");

    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                let snapshot = match snapshot {
                    Ok(s) => s,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "client lagged, skipping stale snapshots");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let event = DashboardEvent::OffersUpdate {
                    offers: snapshot.offers,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(t) => t,
                    Err(err) => {
                        warn!(error = %err, "snapshot serialization failed");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Inbound frames are ignored; the stream is one-way.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.metrics.connected_clients().dec();
    info!("dashboard client disconnected");
}
