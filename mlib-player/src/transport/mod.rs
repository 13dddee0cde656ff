//! Transport abstraction
//!
//! A transport fetches and plays one source. The coordinator acquires it
//! through a [`TransportFactory`] and owns it through a [`TransportHandle`].
//! Transports report back through a [`TransportListener`], which tags every
//! signal with the generation of the session that opened it.

mod http;

pub use self::http::{probe_duration, HttpTransport, HttpTransportFactory};

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Asynchronous notification from a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// Source loaded; playback may begin
    Ready,
    /// Periodic position while playing
    Progress {
        position_seconds: f64,
        duration_seconds: Option<f64>,
    },
    /// End of media
    Ended,
    /// Load or playback failure
    Failed(String),
}

/// A signal together with the session generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub generation: u64,
    pub signal: TransportSignal,
}

/// Callback side handed to a transport
///
/// Once detached, `notify` drops every signal.
#[derive(Debug, Clone)]
pub struct TransportListener {
    generation: u64,
    tx: mpsc::UnboundedSender<SignalEnvelope>,
    detached: Arc<AtomicBool>,
}

impl TransportListener {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SignalEnvelope>) -> Self {
        Self {
            generation,
            tx,
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forward a signal to the coordinator
    ///
    /// Returns false if the listener was detached or the coordinator is gone.
    pub fn notify(&self, signal: TransportSignal) -> bool {
        if self.is_detached() {
            debug!(
                "Dropping {:?} from detached transport (generation {})",
                signal, self.generation
            );
            return false;
        }
        self.tx
            .send(SignalEnvelope {
                generation: self.generation,
                signal,
            })
            .is_ok()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }
}

/// Control side of a playing source
pub trait Transport: Send {
    /// Start or resume output
    fn play(&mut self) -> Result<()>;

    /// Halt output, keeping the position
    fn pause(&mut self);

    /// Seek to 0
    fn rewind(&mut self);

    /// Free everything the transport holds; no signals follow
    fn close(&mut self);
}

/// Opens transports bound to a source URL
///
/// `open` starts loading right away and reports `Ready` or `Failed` through
/// the listener. An `Err` means the transport could not even be created.
pub trait TransportFactory: Send + Sync {
    fn open(&self, url: &str, listener: TransportListener) -> Result<Box<dyn Transport>>;
}

/// Scoped ownership of one transport and its listener
///
/// `release` pauses the transport, detaches the listener and closes the
/// transport. It runs at most once, whichever exit path calls it first
/// (stop, supersede, failure, end of media, or drop).
pub struct TransportHandle {
    generation: u64,
    transport: Option<Box<dyn Transport>>,
    listener: TransportListener,
}

impl TransportHandle {
    pub fn new(transport: Box<dyn Transport>, listener: TransportListener) -> Self {
        Self {
            generation: listener.generation(),
            transport: Some(transport),
            listener,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn play(&mut self) -> Result<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.play(),
            None => Ok(()),
        }
    }

    pub fn pause(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.pause();
        }
    }

    pub fn rewind(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.rewind();
        }
    }

    /// Tear down the transport (idempotent)
    pub fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.pause();
            self.listener.detach();
            transport.close();
            debug!("Released transport for generation {}", self.generation);
        }
    }

    pub fn is_released(&self) -> bool {
        self.transport.is_none()
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("generation", &self.generation)
            .field("released", &self.is_released())
            .finish()
    }
}
