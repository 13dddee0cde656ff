//! Error types for mlib-media
//!
//! Every variant maps to a fixed HTTP status and a short public message.
//! Internal detail (paths, I/O and database errors) is logged, never sent.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Media server error
#[derive(Error, Debug)]
pub enum MediaError {
    /// No song with this id in the catalog
    #[error("Song not found: {0}")]
    SongNotFound(String),

    /// Song exists but has no asset with status `completed`
    #[error("No completed asset for song: {0}")]
    NoCompletedAsset(String),

    /// Asset selected but its file cannot be opened or stat'ed
    #[error("File inaccessible for song {song_id}: {reason}")]
    FileInaccessible { song_id: String, reason: String },

    /// Range header malformed or not satisfiable for this file
    #[error("Range not satisfiable ({reason}), file size {file_size}")]
    RangeInvalid { file_size: u64, reason: String },

    /// Catalog database errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] sqlx::Error),

    /// File I/O errors after the file was opened
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using MediaError
pub type Result<T> = std::result::Result<T, MediaError>;

impl MediaError {
    /// HTTP status for this error
    ///
    /// Unknown song, missing asset and unreachable file are all 404: they
    /// describe data availability, not a server fault.
    pub fn status_code(&self) -> StatusCode {
        match self {
            MediaError::SongNotFound(_)
            | MediaError::NoCompletedAsset(_)
            | MediaError::FileInaccessible { .. } => StatusCode::NOT_FOUND,
            MediaError::RangeInvalid { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            MediaError::Catalog(_) | MediaError::Io(_) | MediaError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body text sent to the client
    pub fn public_message(&self) -> &'static str {
        match self {
            MediaError::SongNotFound(_) => "Song not found",
            MediaError::NoCompletedAsset(_) => "Audio file not found or not ready",
            MediaError::FileInaccessible { .. } => "File not found or inaccessible",
            MediaError::RangeInvalid { .. } => "Requested range not satisfiable",
            MediaError::Catalog(_) | MediaError::Io(_) | MediaError::Internal(_) => {
                "Internal server error"
            }
        }
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match status {
            StatusCode::NOT_FOUND => debug!("{}", self),
            StatusCode::RANGE_NOT_SATISFIABLE => warn!("{}", self),
            _ => error!("Server error: {}", self),
        }

        let mut response = (status, self.public_message()).into_response();

        if let MediaError::RangeInvalid { file_size, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", file_size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}
