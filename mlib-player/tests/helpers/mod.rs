//! Test helpers for mlib-player integration tests
//!
//! - FakeFactory: scripted transports driven by the test
//! - wait_until: await a published snapshot
//! - audio_generator: in-memory WAV files for the HTTP transport

#![allow(dead_code)]

pub mod audio_generator;
pub mod fake_transport;

pub use fake_transport::{FakeFactory, FakeTransportHandle};

use mlib_common::events::{PlayerEvent, SessionSnapshot};
use mlib_player::PlaybackCoordinator;
use std::time::Duration;
use tokio::sync::broadcast;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Wait until the coordinator publishes a snapshot matching `predicate`
pub async fn wait_until<F>(coordinator: &PlaybackCoordinator, predicate: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let mut rx = coordinator.subscribe();
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            rx.changed().await.expect("coordinator closed");
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

/// Collect every event currently queued on the receiver
pub fn drain_events(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
