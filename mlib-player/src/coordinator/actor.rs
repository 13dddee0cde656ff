//! Coordinator task
//!
//! Owns the session record and the live transport. Commands and transport
//! signals are handled one at a time on this task, so every transition is
//! serialized. Signals carry the generation of the session that opened the
//! transport; a signal from any other generation is discarded.

use super::session::PlaybackSession;
use crate::error::PlayerError;
use crate::transport::{
    SignalEnvelope, TransportFactory, TransportHandle, TransportListener, TransportSignal,
};
use chrono::Utc;
use mlib_common::events::{EventBus, PlaybackState, PlayerEvent, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

pub(crate) enum Command {
    Play {
        identity: String,
        source_url: String,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Toggle {
        identity: String,
        source_url: String,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Pause {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// How a session left the stage
enum Teardown {
    Superseded { by: String },
    Stopped,
    Ended,
}

pub(crate) struct CoordinatorActor {
    factory: Arc<dyn TransportFactory>,
    session: Option<PlaybackSession>,
    /// Generation of the most recently started session
    generation: u64,
    signal_tx: mpsc::UnboundedSender<SignalEnvelope>,
    state_tx: watch::Sender<SessionSnapshot>,
    events: Arc<EventBus>,
}

impl CoordinatorActor {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        signal_tx: mpsc::UnboundedSender<SignalEnvelope>,
        state_tx: watch::Sender<SessionSnapshot>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            factory,
            session: None,
            generation: 0,
            signal_tx,
            state_tx,
            events,
        }
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut signals: mpsc::UnboundedReceiver<SignalEnvelope>,
    ) {
        info!("Playback coordinator started");

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(envelope) = signals.recv() => self.handle_signal(envelope),
            }
        }

        if let Some(mut session) = self.session.take() {
            session.release_transport();
        }
        info!("Playback coordinator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play {
                identity,
                source_url,
                reply,
            } => {
                self.play(identity, source_url);
                let _ = reply.send(self.snapshot());
            }
            Command::Toggle {
                identity,
                source_url,
                reply,
            } => {
                let playing_this = self.session.as_ref().is_some_and(|session| {
                    session.matches(&identity, &source_url)
                        && session.state == PlaybackState::Playing
                });
                if playing_this {
                    self.pause();
                } else {
                    self.play(identity, source_url);
                }
                let _ = reply.send(self.snapshot());
            }
            Command::Pause { reply } => {
                self.pause();
                let _ = reply.send(self.snapshot());
            }
            Command::Stop { reply } => {
                self.stop();
                let _ = reply.send(self.snapshot());
            }
            // Handled by the run loop
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    fn play(&mut self, identity: String, source_url: String) {
        let same_source_state = self
            .session
            .as_ref()
            .filter(|session| session.matches(&identity, &source_url))
            .map(|session| session.state);

        match same_source_state {
            Some(PlaybackState::Paused) => return self.resume(),
            Some(PlaybackState::Loading) | Some(PlaybackState::Playing) => {
                debug!("play({}) ignored: already {:?}", identity, same_source_state);
                return;
            }
            // Error (or no matching session): start over
            _ => {}
        }

        if let Some(previous) = self.session.take() {
            let teardown = if same_source_state.is_some() {
                // Retrying the errored session for this same source
                Teardown::Stopped
            } else {
                info!(
                    "Generation {}: {} superseded by {}",
                    previous.generation, previous.identity, identity
                );
                Teardown::Superseded {
                    by: identity.clone(),
                }
            };
            self.end_session(previous, teardown);
        }

        self.start_session(identity, source_url);
    }

    fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            debug!("pause() ignored: no session");
            return;
        };
        if session.state != PlaybackState::Playing {
            debug!("pause() ignored in state {}", session.state);
            return;
        }

        if let Some(handle) = session.transport.as_mut() {
            handle.pause();
        }
        session.state = PlaybackState::Paused;
        debug!(
            "Generation {}: paused at {:.2}s",
            session.generation, session.position_seconds
        );

        let (generation, identity) = (session.generation, session.identity.clone());
        self.emit_state_change(generation, Some(identity), PlaybackState::Playing, PlaybackState::Paused);
        self.publish();
    }

    fn resume(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let resumed = match session.transport.as_mut() {
            Some(handle) => handle.play(),
            None => Err(PlayerError::TransportPlaybackFailed(
                "transport already released".to_string(),
            )),
        };

        match resumed {
            Ok(()) => {
                session.state = PlaybackState::Playing;
                debug!(
                    "Generation {}: resumed at {:.2}s",
                    session.generation, session.position_seconds
                );
                let (generation, identity) = (session.generation, session.identity.clone());
                self.emit_state_change(
                    generation,
                    Some(identity),
                    PlaybackState::Paused,
                    PlaybackState::Playing,
                );
                self.publish();
            }
            Err(e) => self.fail(e),
        }
    }

    fn stop(&mut self) {
        match self.session.take() {
            Some(session) => self.end_session(session, Teardown::Stopped),
            None => debug!("stop() ignored: no session"),
        }
    }

    // ------------------------------------------------------------------
    // Transport signals
    // ------------------------------------------------------------------

    fn handle_signal(&mut self, envelope: SignalEnvelope) {
        let SignalEnvelope { generation, signal } = envelope;

        let current = self.session.as_ref().map(|session| session.generation);
        if current != Some(generation) {
            debug!(
                "Discarding stale {:?} from generation {} (current {:?})",
                signal, generation, current
            );
            return;
        }

        match signal {
            TransportSignal::Ready => self.on_ready(),
            TransportSignal::Progress {
                position_seconds,
                duration_seconds,
            } => self.on_progress(position_seconds, duration_seconds),
            TransportSignal::Ended => self.on_ended(),
            TransportSignal::Failed(reason) => self.on_failed(reason),
        }
    }

    fn on_ready(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state != PlaybackState::Loading {
            debug!("Ready ignored in state {}", session.state);
            return;
        }

        let started = match session.transport.as_mut() {
            Some(handle) => handle.play(),
            None => Err(PlayerError::TransportPlaybackFailed(
                "transport already released".to_string(),
            )),
        };

        match started {
            Ok(()) => {
                session.state = PlaybackState::Playing;
                info!("Generation {}: playing {}", session.generation, session.identity);
                let (generation, identity) = (session.generation, session.identity.clone());
                self.emit_state_change(
                    generation,
                    Some(identity),
                    PlaybackState::Loading,
                    PlaybackState::Playing,
                );
                self.publish();
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_progress(&mut self, position_seconds: f64, duration_seconds: Option<f64>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // Late ticks after pause must not move the stored position
        if session.state != PlaybackState::Playing {
            return;
        }

        session.position_seconds = position_seconds;
        if duration_seconds.is_some() {
            session.duration_seconds = duration_seconds;
        }

        self.events.emit_lossy(PlayerEvent::Progress {
            generation: session.generation,
            identity: session.identity.clone(),
            position_seconds,
            duration_seconds: session.duration_seconds,
            timestamp: Utc::now(),
        });
        self.publish();
    }

    fn on_ended(&mut self) {
        let active = self.session.as_ref().is_some_and(|session| {
            matches!(session.state, PlaybackState::Playing | PlaybackState::Paused)
        });
        if !active {
            return;
        }
        if let Some(session) = self.session.take() {
            info!("Generation {}: {} ended", session.generation, session.identity);
            self.end_session(session, Teardown::Ended);
        }
    }

    fn on_failed(&mut self, reason: String) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let error = match session.state {
            PlaybackState::Loading => PlayerError::TransportLoadFailed(reason),
            PlaybackState::Playing | PlaybackState::Paused => {
                PlayerError::TransportPlaybackFailed(reason)
            }
            PlaybackState::Error | PlaybackState::Idle => return,
        };
        self.fail(error);
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn start_session(&mut self, identity: String, source_url: String) {
        self.generation += 1;
        let generation = self.generation;
        info!("Generation {}: loading {} from {}", generation, identity, source_url);

        let listener = TransportListener::new(generation, self.signal_tx.clone());
        let mut session = PlaybackSession::loading(generation, identity.clone(), source_url);
        self.emit_state_change(generation, Some(identity), PlaybackState::Idle, PlaybackState::Loading);

        match self.factory.open(&session.source_url, listener.clone()) {
            Ok(transport) => {
                session.transport = Some(TransportHandle::new(transport, listener));
                self.session = Some(session);
                self.publish();
            }
            Err(e) => {
                self.session = Some(session);
                self.fail(e);
            }
        }
    }

    /// Release the session's transport and return to `Idle`
    ///
    /// The session must already be taken out of `self.session`.
    fn end_session(&mut self, mut session: PlaybackSession, teardown: Teardown) {
        let old_state = session.state;

        if old_state == PlaybackState::Loading {
            debug!("{}", PlayerError::Aborted(session.identity.clone()));
        }
        if let Teardown::Stopped = teardown {
            if let Some(handle) = session.transport.as_mut() {
                handle.rewind();
            }
        }
        session.release_transport();

        let generation = session.generation;
        match teardown {
            Teardown::Superseded { by } => self.events.emit_lossy(PlayerEvent::Superseded {
                generation,
                identity: session.identity.clone(),
                by_identity: by,
                timestamp: Utc::now(),
            }),
            Teardown::Ended => self.events.emit_lossy(PlayerEvent::Ended {
                generation,
                identity: session.identity.clone(),
                timestamp: Utc::now(),
            }),
            Teardown::Stopped => {}
        }

        self.emit_state_change(generation, Some(session.identity), old_state, PlaybackState::Idle);
        self.publish();
    }

    /// Move the current session to `Error`, releasing its transport
    ///
    /// The record stays until the next `play` or `stop`.
    fn fail(&mut self, error: PlayerError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        warn!("Generation {}: {}", session.generation, error);

        session.release_transport();
        let old_state = session.state;
        session.state = PlaybackState::Error;

        let (generation, identity) = (session.generation, session.identity.clone());
        self.events.emit_lossy(PlayerEvent::Failed {
            generation,
            identity: identity.clone(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        });
        self.emit_state_change(generation, Some(identity), old_state, PlaybackState::Error);
        self.publish();
    }

    // ------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------

    fn snapshot(&self) -> SessionSnapshot {
        match &self.session {
            Some(session) => session.snapshot(),
            None => SessionSnapshot::idle(self.generation),
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    fn emit_state_change(
        &self,
        generation: u64,
        identity: Option<String>,
        old_state: PlaybackState,
        new_state: PlaybackState,
    ) {
        self.events.emit_lossy(PlayerEvent::StateChanged {
            generation,
            identity,
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::transport::Transport;

    struct NullTransport;

    impl Transport for NullTransport {
        fn play(&mut self) -> Result<()> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn rewind(&mut self) {}
        fn close(&mut self) {}
    }

    struct NullFactory;

    impl TransportFactory for NullFactory {
        fn open(&self, _url: &str, _listener: TransportListener) -> Result<Box<dyn Transport>> {
            Ok(Box::new(NullTransport))
        }
    }

    fn actor() -> (CoordinatorActor, watch::Receiver<SessionSnapshot>) {
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionSnapshot::default());
        let actor = CoordinatorActor::new(
            Arc::new(NullFactory),
            signal_tx,
            state_tx,
            Arc::new(EventBus::new(16)),
        );
        (actor, state_rx)
    }

    fn envelope(generation: u64, signal: TransportSignal) -> SignalEnvelope {
        SignalEnvelope { generation, signal }
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let (mut actor, state_rx) = actor();
        actor.play("a".into(), "u-a".into());
        actor.play("b".into(), "u-b".into());
        assert_eq!(state_rx.borrow().generation, 2);

        actor.handle_signal(envelope(1, TransportSignal::Ready));
        assert_eq!(state_rx.borrow().state, PlaybackState::Loading);

        actor.handle_signal(envelope(1, TransportSignal::Failed("late".into())));
        assert!(!state_rx.borrow().has_error);

        actor.handle_signal(envelope(2, TransportSignal::Ready));
        assert_eq!(state_rx.borrow().state, PlaybackState::Playing);

        actor.handle_signal(envelope(1, TransportSignal::Ended));
        actor.handle_signal(envelope(
            1,
            TransportSignal::Progress {
                position_seconds: 99.0,
                duration_seconds: None,
            },
        ));
        let snapshot = state_rx.borrow().clone();
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert!(snapshot.is_for("b"));
        assert_eq!(snapshot.position_seconds, 0.0);
    }

    #[test]
    fn test_signal_after_stop_is_discarded() {
        let (mut actor, state_rx) = actor();
        actor.play("a".into(), "u-a".into());
        actor.stop();

        actor.handle_signal(envelope(1, TransportSignal::Ready));

        let snapshot = state_rx.borrow().clone();
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert_eq!(snapshot.generation, 1);
    }

    #[test]
    fn test_ready_twice_is_ignored() {
        let (mut actor, state_rx) = actor();
        actor.play("a".into(), "u-a".into());
        actor.handle_signal(envelope(1, TransportSignal::Ready));
        actor.pause();

        actor.handle_signal(envelope(1, TransportSignal::Ready));

        assert_eq!(state_rx.borrow().state, PlaybackState::Paused);
    }
}
