//! Error types for jukebox-station
//!
//! Defines module-specific error types using thiserror, and the mapping of
//! those errors onto HTTP responses for the request gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for jukebox-station
#[derive(Error, Debug)]
pub enum Error {
    /// Track directory could not be listed, or a track could not be opened/read
    #[error("Track store unavailable: {0}")]
    StoreUnavailable(String),

    /// Requested track does not exist in the store
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// A listener can no longer accept data
    ///
    /// Handled inside the broadcast hub by dropping that listener; never
    /// returned to callers of `broadcast`.
    #[error("Listener write failed: {0}")]
    SinkWriteFailure(String),

    /// Track identifier is empty or refers outside the store
    #[error("Invalid track identifier: {0:?}")]
    InvalidTrack(String),
}

/// Convenience Result type using jukebox-station Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status the gateway reports for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::TrackNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTrack(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::TrackNotFound("x.mp3".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::InvalidTrack("..".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::StoreUnavailable("permission denied".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
