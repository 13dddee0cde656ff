//! Player Service (mlib-player) - Main entry point
//!
//! Runs the playback coordinator and exposes it to control surfaces over
//! HTTP, with an SSE stream of playback events.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mlib_common::config::TomlConfig;
use mlib_common::logging::init_tracing;
use mlib_player::transport::HttpTransportFactory;
use mlib_player::{build_router, AppState, PlaybackCoordinator, PlayerError};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for mlib-player
#[derive(Parser, Debug)]
#[command(name = "mlib-player")]
#[command(about = "Single-session playback coordinator")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MLIB_PLAYER_PORT")]
    port: Option<u16>,

    /// Media server base URL (e.g. http://127.0.0.1:5810)
    #[arg(short, long, env = "MLIB_MEDIA_URL")]
    media_url: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "MLIB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(long, env = "MLIB_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, origin) = TomlConfig::load(args.config.as_deref());

    let mut logging = config.logging.clone();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    let _log_guard =
        init_tracing(&logging, "tower_http=debug").context("Failed to initialize logging")?;

    info!(
        "Starting Mirai Library Player (mlib-player) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    origin.log();

    let player = &config.player;
    let port = args.port.unwrap_or(player.port);
    let media_url = args
        .media_url
        .unwrap_or_else(|| player.media_base_url.clone());

    info!("Media server: {}", media_url);
    info!(
        "Progress interval: {}ms, event buffer: {}",
        player.progress_interval_ms, player.event_capacity
    );

    let factory = HttpTransportFactory::new(Duration::from_millis(player.progress_interval_ms));
    let coordinator = PlaybackCoordinator::spawn(Arc::new(factory), player.event_capacity);

    let app = build_router(AppState::new(coordinator.clone(), &media_url)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PlayerError::Http(format!("bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PlayerError::Http(e.to_string()))?;

    if let Err(e) = coordinator.shutdown().await {
        warn!("Coordinator shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
