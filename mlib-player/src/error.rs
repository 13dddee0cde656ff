//! Error types for mlib-player
//!
//! Transport failures never reach HTTP callers as errors: the coordinator
//! turns them into the `Error` session state. Only coordinator shutdown and
//! bad requests surface as non-200 responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Player service error
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Network, status or codec failure while acquiring audio
    #[error("Transport load failed: {0}")]
    TransportLoadFailed(String),

    /// Failure after the transport became ready
    #[error("Transport playback failed: {0}")]
    TransportPlaybackFailed(String),

    /// Load abandoned because the session was superseded or stopped
    #[error("Load aborted for {0}")]
    Aborted(String),

    /// Coordinator task has exited
    #[error("Playback coordinator is not running")]
    CoordinatorClosed,

    /// Bad request parameter
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener bind or serve failure
    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Convenience Result type using PlayerError
pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl PlayerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlayerError::CoordinatorClosed => StatusCode::SERVICE_UNAVAILABLE,
            PlayerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlayerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PlayerError::CoordinatorClosed.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PlayerError::InvalidRequest("empty song_id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlayerError::Http("bind".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
