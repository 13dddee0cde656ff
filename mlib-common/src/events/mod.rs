//! Event types for the playback service
//!
//! Provides the `PlayerEvent` definitions and the `EventBus` that carries
//! them from the coordinator to every subscribed control surface.

mod session_types;

pub use session_types::{PlaybackState, SessionSnapshot, TrackView};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback events
///
/// Broadcast via `EventBus` and serialized for SSE transmission. Every
/// variant carries the session `generation` it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Session state changed
    StateChanged {
        generation: u64,
        identity: Option<String>,
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// Position update while playing
    ///
    /// Not emitted for superseded sessions.
    Progress {
        generation: u64,
        identity: String,
        position_seconds: f64,
        duration_seconds: Option<f64>,
        timestamp: DateTime<Utc>,
    },

    /// Active session replaced by a `play` for a different source
    Superseded {
        generation: u64,
        identity: String,
        by_identity: String,
        timestamp: DateTime<Utc>,
    },

    /// Media reached its end; the session returned to idle
    Ended {
        generation: u64,
        identity: String,
        timestamp: DateTime<Utc>,
    },

    /// Load or playback failure (never emitted for aborted loads)
    Failed {
        generation: u64,
        identity: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Variant name, used as the SSE `event:` field
    pub fn event_name(&self) -> &'static str {
        match self {
            PlayerEvent::StateChanged { .. } => "StateChanged",
            PlayerEvent::Progress { .. } => "Progress",
            PlayerEvent::Superseded { .. } => "Superseded",
            PlayerEvent::Ended { .. } => "Ended",
            PlayerEvent::Failed { .. } => "Failed",
        }
    }

    /// Generation of the session the event belongs to
    pub fn generation(&self) -> u64 {
        match self {
            PlayerEvent::StateChanged { generation, .. }
            | PlayerEvent::Progress { generation, .. }
            | PlayerEvent::Superseded { generation, .. }
            | PlayerEvent::Ended { generation, .. }
            | PlayerEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// One-to-many event distribution (tokio broadcast)
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// the coordinator.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use mlib_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// let mut rx = event_bus.subscribe();
    /// assert!(rx.try_recv().is_err());
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ended(generation: u64) -> PlayerEvent {
        PlayerEvent::Ended {
            generation,
            identity: "song-a".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        bus.emit_lossy(ended(1));

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit_lossy(ended(7));

        for rx in [&mut first, &mut second] {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.generation(), 7);
            assert_eq!(received.event_name(), "Ended");
        }
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = PlayerEvent::StateChanged {
            generation: 2,
            identity: Some("song-a".to_string()),
            old_state: PlaybackState::Loading,
            new_state: PlaybackState::Playing,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StateChanged");
        assert_eq!(json["new_state"], "playing");
    }
}
