//! HTTP transport tests against a local axum server
//!
//! Tests cover:
//! - Load, duration probe, progress and end of media
//! - Non-success status and undecodable bodies fail the load
//! - Closing during load produces no signals

mod helpers;

use axum::{http::header, routing::get, Router};
use helpers::audio_generator::silent_wav;
use mlib_player::transport::{
    probe_duration, HttpTransportFactory, SignalEnvelope, TransportFactory, TransportListener,
    TransportSignal,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(40);

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route(
            "/audio/short",
            get(|| async { ([(header::CONTENT_TYPE, "audio/wav")], silent_wav(300)) }),
        )
        .route(
            "/audio/garbage",
            get(|| async { ([(header::CONTENT_TYPE, "audio/mpeg")], vec![0u8; 4096]) }),
        )
        .route(
            "/audio/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                silent_wav(300)
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn next_signal(rx: &mut mpsc::UnboundedReceiver<SignalEnvelope>) -> TransportSignal {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for transport signal")
        .expect("signal channel closed")
        .signal
}

#[test]
fn test_probe_wav_duration() {
    let duration = probe_duration(silent_wav(500), Some("audio/wav"))
        .unwrap()
        .expect("WAV states its length");
    assert!((duration - 0.5).abs() < 0.01, "duration {}", duration);
}

#[tokio::test]
async fn test_load_play_and_end() {
    let addr = serve().await;
    let factory = HttpTransportFactory::new(PROGRESS_INTERVAL);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut transport = factory
        .open(
            &format!("http://{}/audio/short", addr),
            TransportListener::new(1, tx),
        )
        .unwrap();

    assert_eq!(next_signal(&mut rx).await, TransportSignal::Ready);
    transport.play().unwrap();

    let mut last_position = 0.0;
    loop {
        match next_signal(&mut rx).await {
            TransportSignal::Progress {
                position_seconds,
                duration_seconds,
            } => {
                assert!(position_seconds >= last_position);
                let duration = duration_seconds.expect("duration probed");
                assert!((duration - 0.3).abs() < 0.01);
                last_position = position_seconds;
            }
            TransportSignal::Ended => break,
            other => panic!("unexpected signal {:?}", other),
        }
    }
    assert!((last_position - 0.3).abs() < 0.01);

    transport.close();
}

#[tokio::test]
async fn test_not_found_fails_load() {
    let addr = serve().await;
    let factory = HttpTransportFactory::new(PROGRESS_INTERVAL);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _transport = factory
        .open(
            &format!("http://{}/audio/unknown", addr),
            TransportListener::new(1, tx),
        )
        .unwrap();

    match next_signal(&mut rx).await {
        TransportSignal::Failed(reason) => assert!(reason.contains("404"), "{}", reason),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_fails_load() {
    let addr = serve().await;
    let factory = HttpTransportFactory::new(PROGRESS_INTERVAL);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _transport = factory
        .open(
            &format!("http://{}/audio/garbage", addr),
            TransportListener::new(1, tx),
        )
        .unwrap();

    assert!(matches!(
        next_signal(&mut rx).await,
        TransportSignal::Failed(_)
    ));
}

#[tokio::test]
async fn test_close_during_load_is_silent() {
    let addr = serve().await;
    let factory = HttpTransportFactory::new(PROGRESS_INTERVAL);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut transport = factory
        .open(
            &format!("http://{}/audio/slow", addr),
            TransportListener::new(1, tx),
        )
        .unwrap();
    transport.close();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(rx.try_recv().is_err());
}
