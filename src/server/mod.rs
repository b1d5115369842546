//! Relay server hosting one shared document.
//!
//! This module contains the Axum service that exposes a document's mutation
//! surface, projection and state over HTTP, and relays updates between
//! WebSocket clients.

pub mod routes;
pub mod websocket;

// Re-export main server functionality
pub use routes::{AppState, BroadcastLog, Relay, create_router};
