//! Playback control handlers
//!
//! Every control call answers with the session snapshot after the
//! transition. Load and playback failures show up as `state: "error"`,
//! not as HTTP errors.

use crate::error::{PlayerError, Result};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use mlib_common::events::{SessionSnapshot, TrackView};
use serde::Deserialize;
use tracing::info;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub song_id: String,
    /// Explicit source; defaults to the media server's `/audio/{song_id}`
    #[serde(default)]
    pub url: Option<String>,
}

impl PlayRequest {
    fn into_source(self, state: &AppState) -> Result<(String, String)> {
        if self.song_id.trim().is_empty() {
            return Err(PlayerError::InvalidRequest("song_id must not be empty".into()));
        }
        let url = match self.url {
            Some(url) => url,
            None => state.audio_url(&self.song_id),
        };
        Ok((self.song_id, url))
    }
}

// ============================================================================
// Control Endpoints
// ============================================================================

/// POST /playback/play
pub async fn play(
    State(state): State<AppState>,
    Json(request): Json<PlayRequest>,
) -> Result<Json<SessionSnapshot>> {
    let (song_id, url) = request.into_source(&state)?;
    info!("Play request: {} ({})", song_id, url);
    Ok(Json(state.coordinator.play(song_id, url).await?))
}

/// POST /playback/toggle
pub async fn toggle(
    State(state): State<AppState>,
    Json(request): Json<PlayRequest>,
) -> Result<Json<SessionSnapshot>> {
    let (song_id, url) = request.into_source(&state)?;
    info!("Toggle request: {}", song_id);
    Ok(Json(state.coordinator.toggle(song_id, url).await?))
}

/// POST /playback/pause
pub async fn pause(State(state): State<AppState>) -> Result<Json<SessionSnapshot>> {
    info!("Pause request");
    Ok(Json(state.coordinator.pause().await?))
}

/// POST /playback/stop
pub async fn stop(State(state): State<AppState>) -> Result<Json<SessionSnapshot>> {
    info!("Stop request");
    Ok(Json(state.coordinator.stop().await?))
}

// ============================================================================
// State Endpoints
// ============================================================================

/// GET /playback/state
pub async fn get_state(State(state): State<AppState>) -> Result<Json<SessionSnapshot>> {
    if state.coordinator.is_closed() {
        return Err(PlayerError::CoordinatorClosed);
    }
    Ok(Json(state.coordinator.snapshot()))
}

/// GET /playback/state/:song_id
pub async fn get_track_view(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
) -> Result<Json<TrackView>> {
    if state.coordinator.is_closed() {
        return Err(PlayerError::CoordinatorClosed);
    }
    Ok(Json(state.coordinator.view_for(&song_id)))
}
