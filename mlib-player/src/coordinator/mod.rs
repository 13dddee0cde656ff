//! Playback coordinator
//!
//! Guarantees at most one playback session process-wide. The session lives
//! inside a single tokio task; `PlaybackCoordinator` is the cloneable
//! handle control surfaces use to send commands and read state.
//!
//! State machine:
//!
//! ```text
//! Idle -> Loading -> Playing <-> Paused -> Idle
//!           any active state -> Error -> Idle (next play/stop)
//! ```

mod actor;
mod session;

use crate::error::{PlayerError, Result};
use crate::transport::TransportFactory;
use actor::{Command, CoordinatorActor};
use mlib_common::events::{EventBus, PlayerEvent, SessionSnapshot, TrackView};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Handle to the coordinator task
#[derive(Clone)]
pub struct PlaybackCoordinator {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionSnapshot>,
    events: Arc<EventBus>,
}

impl PlaybackCoordinator {
    /// Spawn the coordinator task on the current tokio runtime
    pub fn spawn(factory: Arc<dyn TransportFactory>, event_capacity: usize) -> Self {
        let events = Arc::new(EventBus::new(event_capacity));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionSnapshot::default());

        let actor = CoordinatorActor::new(factory, signal_tx, state_tx, Arc::clone(&events));
        tokio::spawn(actor.run(command_rx, signal_rx));

        Self {
            commands: command_tx,
            state_rx,
            events,
        }
    }

    /// Play `source_url` as the session for `identity`
    ///
    /// Supersedes any session for another source. For the same source,
    /// a paused session resumes in place, a loading or playing one is left
    /// alone, and an errored one is retried. Returns once the transition is
    /// applied; readiness is reported later through state and events.
    pub async fn play(
        &self,
        identity: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Result<SessionSnapshot> {
        let (identity, source_url) = validate(identity.into(), source_url.into())?;
        self.request(|reply| Command::Play {
            identity,
            source_url,
            reply,
        })
        .await
    }

    /// Pause if this source is playing, otherwise `play`
    pub async fn toggle(
        &self,
        identity: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Result<SessionSnapshot> {
        let (identity, source_url) = validate(identity.into(), source_url.into())?;
        self.request(|reply| Command::Toggle {
            identity,
            source_url,
            reply,
        })
        .await
    }

    /// Pause the playing session (no-op in any other state)
    pub async fn pause(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// End the current session and return to `Idle`
    pub async fn stop(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Stop the session and end the coordinator task
    ///
    /// Later requests fail with `CoordinatorClosed`.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| PlayerError::CoordinatorClosed)?;
        rx.await.map_err(|_| PlayerError::CoordinatorClosed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_rx.borrow().clone()
    }

    /// Render state for one track's control surface
    pub fn view_for(&self, identity: &str) -> TrackView {
        self.state_rx.borrow().view_for(identity)
    }

    /// Watch every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_rx.clone()
    }

    /// Subscribe to coordinator events
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<F>(&self, build: F) -> Result<SessionSnapshot>
    where
        F: FnOnce(oneshot::Sender<SessionSnapshot>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| PlayerError::CoordinatorClosed)?;
        rx.await.map_err(|_| PlayerError::CoordinatorClosed)
    }
}

fn validate(identity: String, source_url: String) -> Result<(String, String)> {
    if identity.trim().is_empty() {
        return Err(PlayerError::InvalidRequest("identity must not be empty".into()));
    }
    if source_url.trim().is_empty() {
        return Err(PlayerError::InvalidRequest("source url must not be empty".into()));
    }
    Ok((identity, source_url))
}
