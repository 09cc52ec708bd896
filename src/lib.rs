//! Sketchroom server - real-time shared drawing rooms

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod room;
pub mod router;
pub mod websocket;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::router::RouterHandle;

/// Application state shared across handlers
pub struct AppState {
    pub router: RouterHandle,
}

impl AppState {
    /// Start the router task. Must be called inside a tokio runtime.
    pub fn new(grace_period: Duration) -> Arc<Self> {
        Arc::new(Self {
            router: RouterHandle::spawn(grace_period),
        })
    }
}

/// Build the HTTP/WebSocket application
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/rooms/:room_id", get(api::get_room))
        .route("/ws", get(websocket::handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
