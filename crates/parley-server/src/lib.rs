//! Parley gateway server library logic.
//!
//! The gateway terminates client WebSockets, relays voice to the
//! recognition service, speaks replies through the synthesis service,
//! and keeps the shared conversation transcript consistent across all
//! connected clients.

pub mod config;
pub mod registry;
pub mod replies;
pub mod session;

use axum::{routing::get, Extension, Json, Router};
use parley_history::HistoryLog;
use registry::SessionRegistry;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all sessions.
///
/// The registry and transcript are the only state shared between
/// sessions; both live here and are injected at construction rather
/// than sitting in globals, so their lifecycle is the gateway's own.
pub struct AppState {
    /// Live client sessions, the broadcast fan-out set.
    pub registry: SessionRegistry,
    /// The shared conversation transcript.
    pub history: Arc<HistoryLog>,
    /// Directory holding the backend service sockets.
    pub socket_dir: PathBuf,
    /// Delay before a dropped service link is re-established.
    pub reconnect_delay: Duration,
    /// Polling interval of the reply loop.
    pub reply_interval: Duration,
    /// Output-length hint for generation calls.
    pub max_new_tokens: u32,
}

impl AppState {
    pub fn new(config: &config::Config, history: Arc<HistoryLog>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            history,
            socket_dir: config.services.socket_dir.clone(),
            reconnect_delay: config.services.reconnect_delay(),
            reply_interval: config.reply.interval(),
            max_new_tokens: config.reply.max_new_tokens,
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(session::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(state))
}
