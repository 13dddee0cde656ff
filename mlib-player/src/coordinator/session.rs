//! The single playback session record
//!
//! Only the coordinator task holds a `PlaybackSession`; everyone else sees
//! a `SessionSnapshot`.

use crate::transport::TransportHandle;
use mlib_common::events::{PlaybackState, SessionSnapshot};

#[derive(Debug)]
pub(crate) struct PlaybackSession {
    pub generation: u64,
    pub identity: String,
    pub source_url: String,
    pub state: PlaybackState,
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    /// `None` once released (after a failure) or if the transport never opened
    pub transport: Option<TransportHandle>,
}

impl PlaybackSession {
    pub fn loading(generation: u64, identity: String, source_url: String) -> Self {
        Self {
            generation,
            identity,
            source_url,
            state: PlaybackState::Loading,
            position_seconds: 0.0,
            duration_seconds: None,
            transport: None,
        }
    }

    /// Same identity and same source
    pub fn matches(&self, identity: &str, source_url: &str) -> bool {
        self.identity == identity && self.source_url == source_url
    }

    /// Release the transport, if still held
    pub fn release_transport(&mut self) {
        if let Some(mut handle) = self.transport.take() {
            handle.release();
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            identity: Some(self.identity.clone()),
            source_url: Some(self.source_url.clone()),
            state: self.state,
            playing: self.state == PlaybackState::Playing,
            loading: self.state == PlaybackState::Loading,
            has_error: self.state == PlaybackState::Error,
            position_seconds: self.position_seconds,
            duration_seconds: self.duration_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_flags_follow_state() {
        let mut session = PlaybackSession::loading(2, "a".into(), "http://m/audio/a".into());

        let snapshot = session.snapshot();
        assert!(snapshot.loading && !snapshot.playing && !snapshot.has_error);
        assert_eq!(snapshot.generation, 2);
        assert!(snapshot.is_for("a"));

        session.state = PlaybackState::Error;
        let snapshot = session.snapshot();
        assert!(snapshot.has_error && !snapshot.loading);
    }

    #[test]
    fn test_matches_requires_identity_and_url() {
        let session = PlaybackSession::loading(1, "a".into(), "u1".into());
        assert!(session.matches("a", "u1"));
        assert!(!session.matches("a", "u2"));
        assert!(!session.matches("b", "u1"));
    }
}
