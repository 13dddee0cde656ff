//! Media Server (mlib-media) - Main entry point
//!
//! Serves `GET /audio/{song_id}` with byte-range support from the assets
//! recorded in the SQLite catalog.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mlib_common::config::{resolve_path, TomlConfig};
use mlib_common::logging::init_tracing;
use mlib_media::catalog::SqliteCatalog;
use mlib_media::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for mlib-media
#[derive(Parser, Debug)]
#[command(name = "mlib-media")]
#[command(about = "Audio file server with HTTP range support")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MLIB_MEDIA_PORT")]
    port: Option<u16>,

    /// Root folder for relative asset paths and the catalog database
    #[arg(short, long, env = "MLIB_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// SQLite catalog path
    #[arg(short, long, env = "MLIB_DATABASE")]
    database: Option<PathBuf>,

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
        "Starting Mirai Library Media Server (mlib-media) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    origin.log();

    let root_folder = config.resolve_root_folder(args.root_folder);
    let db_path = resolve_path(
        &root_folder,
        args.database.as_deref().unwrap_or(config.media.database_path.as_path()),
    );
    let port = args.port.unwrap_or(config.media.port);

    info!("Root folder: {}", root_folder.display());
    info!("Catalog database: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let catalog = SqliteCatalog::connect(&db_path)
        .await
        .context("Failed to open catalog database")?;

    let app = build_router(AppState::new(Arc::new(catalog), root_folder));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

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
