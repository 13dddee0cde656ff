//! HTTP API for the player service

mod health;
mod playback;
mod sse;

pub use health::{health_check, HealthResponse};
pub use playback::{get_state, get_track_view, pause, play, stop, toggle, PlayRequest};
pub use sse::event_stream;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Playback control and state
pub fn playback_routes() -> Router<AppState> {
    Router::new()
        .route("/playback/play", post(play))
        .route("/playback/pause", post(pause))
        .route("/playback/stop", post(stop))
        .route("/playback/toggle", post(toggle))
        .route("/playback/state", get(get_state))
        .route("/playback/state/:song_id", get(get_track_view))
}

/// `GET /events` (SSE)
pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}

/// `GET /health`
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
