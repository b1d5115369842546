//! Route handlers for the relay server.
//!
//! This module contains the HTTP handlers, the shared relay state and the
//! broadcast-backed replicated log.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
};
use crdt_richtext::{Document, DocumentTree, ReplicatedLog, Transaction};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

use crate::server::websocket::ws_handler;

/// Capacity of the update fan-out channel.
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub document: String,
}

/// The document being served plus the channel its updates fan out on.
pub struct Relay {
    pub document: Mutex<Document>,
    pub updates: broadcast::Sender<Vec<u8>>,
}

/// Shared application state
pub type AppState = Arc<Relay>;

impl Relay {
    /// Wraps `document`, wiring its local updates into the fan-out channel.
    pub fn new(document: Document) -> AppState {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let document = document.with_log(BroadcastLog::new(updates.clone()));
        Arc::new(Relay {
            document: Mutex::new(document),
            updates,
        })
    }

    /// Projects the document, running a bootstrap the projection scheduled.
    ///
    /// The fetch runs on the blocking pool without holding the document lock.
    /// Loaded state reaches connected sockets through the document's log.
    pub async fn project(&self) -> DocumentTree {
        let (tree, fetch) = {
            let document = self.document.lock().await;
            (document.project(), document.take_scheduled_bootstrap())
        };
        let Some(fetch) = fetch else {
            return tree;
        };

        info!("Fetching initial state for '{}'", fetch.document_id());
        let fetched = tokio::task::spawn_blocking(move || fetch.fetch()).await;

        let mut document = self.document.lock().await;
        match fetched {
            Ok(Ok(snapshot)) => {
                document.complete_bootstrap(snapshot);
            }
            Ok(Err(err)) => warn!("Bootstrap fetch failed: {}", err),
            Err(err) => warn!("Bootstrap task failed: {}", err),
        }
        document.project()
    }

    /// Full state framed as an update, as sent to sockets.
    pub async fn state_frame(&self) -> Result<Vec<u8>, String> {
        let document = self.document.lock().await;
        document.encode_state_update().map_err(|err| err.to_string())
    }

    /// Applies remote update bytes and relays them to every socket.
    pub async fn apply_remote(&self, bytes: Vec<u8>) -> Result<(), String> {
        let result = {
            let mut document = self.document.lock().await;
            document.apply_remote_update(&bytes)
        };
        result.map_err(|err| err.to_string())?;
        // No subscribers is not an error
        let _ = self.updates.send(bytes);
        Ok(())
    }
}

/// A replicated log that fans updates out to every connected socket.
pub struct BroadcastLog {
    sender: broadcast::Sender<Vec<u8>>,
}

impl BroadcastLog {
    pub fn new(sender: broadcast::Sender<Vec<u8>>) -> Self {
        BroadcastLog { sender }
    }
}

impl ReplicatedLog for BroadcastLog {
    fn append(&mut self, update: &[u8]) {
        let _ = self.sender.send(update.to_vec());
    }
}

/// Basic health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let document = state.document.lock().await.document_id().to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        document,
    })
}

/// Current projection of the document
pub async fn get_document(State(state): State<AppState>) -> Json<DocumentTree> {
    Json(state.project().await)
}

/// Applies an editor transaction and returns the new projection
pub async fn post_transaction(
    State(state): State<AppState>,
    Json(transaction): Json<Transaction>,
) -> Json<DocumentTree> {
    info!("Applying transaction with {} steps", transaction.steps.len());
    {
        let mut document = state.document.lock().await;
        document.apply_transaction(&transaction);
    }
    Json(state.project().await)
}

/// Encoded full state
pub async fn get_state(
    State(state): State<AppState>,
) -> Result<Vec<u8>, (StatusCode, String)> {
    let document = state.document.lock().await;
    document
        .encode_state()
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

/// Applies one remote update
pub async fn post_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .apply_remote(body.to_vec())
        .await
        .map(|()| StatusCode::ACCEPTED)
        .map_err(|err| (StatusCode::BAD_REQUEST, err))
}

/// Creates and configures the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/doc", get(get_document))
        .route("/transactions", axum::routing::post(post_transaction))
        .route("/state", get(get_state))
        .route("/updates", axum::routing::post(post_update))
        .route("/ws", get(ws_handler))
        .with_state(state)
}
