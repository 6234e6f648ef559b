//! Scheduling-service API error types

use thiserror::Error;

/// Errors that can occur talking to the scheduling service
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Check whether this failure came back over a healthy connection
    ///
    /// Used by the shell to distinguish "the service rejected it" from
    /// "the service never saw it" when wording the error.
    pub fn is_service_side(&self) -> bool {
        matches!(
            self,
            ApiError::Http { .. } | ApiError::Service(_) | ApiError::InvalidResponse(_)
        )
    }
}
