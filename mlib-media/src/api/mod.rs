//! HTTP API for the media server

mod audio;
mod health;

pub use audio::{stream_audio, STREAM_CHUNK_SIZE};
pub use health::{health_check, HealthResponse};

use crate::AppState;
use axum::{routing::get, Router};

/// `GET /audio/:song_id` (HEAD is answered by the same route)
pub fn audio_routes() -> Router<AppState> {
    Router::new().route("/audio/:song_id", get(stream_audio))
}

/// `GET /health`
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
