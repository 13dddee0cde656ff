//! # Mirai Library Media Server (mlib-media)
//!
//! Serves completed audio assets over HTTP with byte-range support so
//! players can seek. Stateless per request; the only shared state is the
//! read-only catalog.

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod error;
pub mod range;

pub use error::{MediaError, Result};

use catalog::Catalog;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog lookup (song id → assets)
    pub catalog: Arc<dyn Catalog>,
    /// Base folder for relative asset paths
    pub root_folder: PathBuf,
}

impl AppState {
    pub fn new(catalog: Arc<dyn Catalog>, root_folder: PathBuf) -> Self {
        Self {
            catalog,
            root_folder,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::audio_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
