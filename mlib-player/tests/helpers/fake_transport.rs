//! Scripted transport factory
//!
//! Every `open` records a `FakeTransportHandle` the test uses to emit
//! signals through the transport's listener and to inspect the control
//! calls the coordinator made.

use mlib_player::error::{PlayerError, Result};
use mlib_player::transport::{Transport, TransportFactory, TransportListener, TransportSignal};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct FakeTransportHandle {
    pub url: String,
    pub listener: TransportListener,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeTransportHandle {
    /// Emit a signal as the transport would; false once detached
    pub fn signal(&self, signal: TransportSignal) -> bool {
        self.listener.notify(signal)
    }

    pub fn ready(&self) -> bool {
        self.signal(TransportSignal::Ready)
    }

    pub fn progress(&self, position_seconds: f64) -> bool {
        self.signal(TransportSignal::Progress {
            position_seconds,
            duration_seconds: Some(180.0),
        })
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&"close")
    }

    pub fn generation(&self) -> u64 {
        self.listener.generation()
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    opened: Arc<Mutex<Vec<FakeTransportHandle>>>,
    refused: Arc<Mutex<HashSet<String>>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail for this URL
    pub fn refuse(&self, url: &str) {
        self.refused.lock().unwrap().insert(url.to_string());
    }

    pub fn opened(&self) -> Vec<FakeTransportHandle> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn last(&self) -> FakeTransportHandle {
        self.opened
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport opened")
    }

    /// Transports not yet closed
    pub fn live_count(&self) -> usize {
        self.opened().iter().filter(|t| !t.is_closed()).count()
    }
}

struct FakeTransport {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeTransport {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Transport for FakeTransport {
    fn play(&mut self) -> Result<()> {
        self.record("play");
        Ok(())
    }

    fn pause(&mut self) {
        self.record("pause");
    }

    fn rewind(&mut self) {
        self.record("rewind");
    }

    fn close(&mut self) {
        self.record("close");
    }
}

impl TransportFactory for FakeFactory {
    fn open(&self, url: &str, listener: TransportListener) -> Result<Box<dyn Transport>> {
        if self.refused.lock().unwrap().contains(url) {
            return Err(PlayerError::TransportLoadFailed(format!("refused {}", url)));
        }

        let calls = Arc::new(Mutex::new(Vec::new()));
        self.opened.lock().unwrap().push(FakeTransportHandle {
            url: url.to_string(),
            listener,
            calls: Arc::clone(&calls),
        });
        Ok(Box::new(FakeTransport { calls }))
    }
}
