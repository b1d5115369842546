//! WebSocket sessions for the relay server.
//!
//! Every binary frame in either direction is an encoded update. A client first
//! receives the full state as a `state` update, then every update applied to
//! the document (and the full state again if it falls behind). Text frames
//! from a client are editor transactions in JSON.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chrono::Utc;
use crdt_richtext::Transaction;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::server::routes::AppState;

/// WebSocket connection handler for collaborative editing
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, state))
}

/// WebSocket session manager
pub struct WebSocketSession {
    state: AppState,
    session_id: String,
}

impl WebSocketSession {
    /// Create a new WebSocket session
    pub fn new(state: AppState, session_id: String) -> Self {
        Self { state, session_id }
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(self, socket: WebSocket) {
        info!("WebSocket session {} established", self.session_id);

        let (mut sender, mut receiver) = socket.split();
        let mut updates = self.state.updates.subscribe();

        let initial = match self.state.state_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode initial state for {}: {}", self.session_id, e);
                return;
            }
        };
        if sender.send(Message::Binary(initial)).await.is_err() {
            error!("Failed to send initial state to {}", self.session_id);
            return;
        }

        loop {
            tokio::select! {
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Binary(bytes))) => self.handle_update(bytes).await,
                    Some(Ok(Message::Text(text))) => self.handle_transaction(&text).await,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket session {} closed by client", self.session_id);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", self.session_id, e);
                        break;
                    }
                },
                outgoing = updates.recv() => {
                    let frame = match outgoing {
                        Ok(bytes) => bytes,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Session {} lagged by {} updates, resending state", self.session_id, skipped);
                            match self.state.state_frame().await {
                                Ok(frame) => frame,
                                Err(e) => {
                                    error!("Failed to encode state for {}: {}", self.session_id, e);
                                    break;
                                }
                            }
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if sender.send(Message::Binary(frame)).await.is_err() {
                        warn!("Failed to forward update to {}", self.session_id);
                        break;
                    }
                }
            }
        }

        info!("WebSocket session {} ended", self.session_id);
    }

    async fn handle_update(&self, bytes: Vec<u8>) {
        if let Err(e) = self.state.apply_remote(bytes).await {
            warn!("Rejected update from {}: {}", self.session_id, e);
        }
    }

    async fn handle_transaction(&self, text: &str) {
        match serde_json::from_str::<Transaction>(text) {
            Ok(transaction) => {
                let mut document = self.state.document.lock().await;
                document.apply_transaction(&transaction);
            }
            // Don't break connection for parse errors
            Err(e) => warn!("Failed to parse transaction from {}: {}", self.session_id, e),
        }
    }
}

/// Generate a unique session ID
pub fn generate_session_id() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    format!("session_{}_{}", Utc::now().timestamp_millis(), n)
}

/// Create and handle a new WebSocket session
pub async fn handle_websocket_connection(socket: WebSocket, state: AppState) {
    let session_id = generate_session_id();
    WebSocketSession::new(state, session_id).handle(socket).await;
}
