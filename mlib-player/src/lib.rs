//! # Mirai Library Player (mlib-player)
//!
//! Process-wide playback coordination: one session at a time, driven by
//! any number of control surfaces over HTTP, with state published as
//! snapshots and events.

use axum::Router;
use reqwest::Url;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod coordinator;
pub mod error;
pub mod transport;

pub use coordinator::PlaybackCoordinator;
pub use error::{PlayerError, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: PlaybackCoordinator,
    /// Media server base URL used when a play request names only a song id
    pub media_base_url: Arc<Url>,
}

impl AppState {
    /// Fails with `Config` unless `media_base_url` is an absolute http(s) URL
    pub fn new(coordinator: PlaybackCoordinator, media_base_url: &str) -> Result<Self> {
        let url = Url::parse(media_base_url).map_err(|e| {
            PlayerError::Config(format!("Invalid media base URL '{}': {}", media_base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(PlayerError::Config(format!(
                "Media base URL must be http or https: {}",
                media_base_url
            )));
        }

        Ok(Self {
            coordinator,
            media_base_url: Arc::new(url),
        })
    }

    /// `<media_base_url>/audio/<song_id>`, with `song_id` percent-encoded
    /// as a single path segment
    pub fn audio_url(&self, song_id: &str) -> String {
        let mut url = (*self.media_base_url).clone();
        // Checked in `new`: an http(s) base always has path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("audio").push(song_id);
        }
        url.into()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::playback_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
