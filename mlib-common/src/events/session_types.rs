//! Playback session types shared by the player service and its clients

use serde::{Deserialize, Serialize};

/// Coordinator state for the (single) playback session
///
/// `Idle` means no session exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Immutable view of the process-wide playback session
///
/// Published by the coordinator after every transition. `generation`
/// increases each time a new session begins, so readers can tell two
/// sessions for the same source apart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionSnapshot {
    pub generation: u64,
    /// Song id (or URL) the session was started for
    pub identity: Option<String>,
    pub source_url: Option<String>,
    pub state: PlaybackState,
    pub playing: bool,
    pub loading: bool,
    pub has_error: bool,
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
}

impl SessionSnapshot {
    /// Snapshot with no session
    pub fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    /// True when the session belongs to `identity`
    pub fn is_for(&self, identity: &str) -> bool {
        self.identity.as_deref() == Some(identity)
    }

    /// Render state for the control surface of one track
    ///
    /// Surfaces other than the session owner always see `Idle`.
    pub fn view_for(&self, identity: &str) -> TrackView {
        if !self.is_for(identity) {
            return TrackView::idle(identity);
        }
        TrackView {
            identity: identity.to_string(),
            state: self.state,
            playing: self.playing,
            loading: self.loading,
            has_error: self.has_error,
            position_seconds: self.position_seconds,
        }
    }
}

/// Per-track render state derived from a `SessionSnapshot`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackView {
    pub identity: String,
    pub state: PlaybackState,
    pub playing: bool,
    pub loading: bool,
    pub has_error: bool,
    pub position_seconds: f64,
}

impl TrackView {
    fn idle(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            state: PlaybackState::Idle,
            playing: false,
            loading: false,
            has_error: false,
            position_seconds: 0.0,
        }
    }
}
