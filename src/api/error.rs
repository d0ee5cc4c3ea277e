//! Error types for the lesson API

use thiserror::Error;

use crate::lesson::FieldErrors;

/// Errors that can occur when talking to the lesson API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// API returned an unexpected error response
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// The user already answered this popup
    #[error("{message}")]
    Conflict {
        /// Message to show the user
        message: String,
    },

    /// The submission payload was rejected
    #[error("Invalid submission: {}", .0.summary())]
    Validation(FieldErrors),

    /// Lesson or popup does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to read a fixture file
    #[error("Failed to read {path}: {source}")]
    FixtureError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ApiError {
    /// Message used when the server does not provide one
    pub const ALREADY_SUBMITTED: &'static str =
        "You have already submitted an answer for this quiz";

    /// Conflict with the default message
    pub fn already_submitted() -> Self {
        Self::Conflict { message: Self::ALREADY_SUBMITTED.to_string() }
    }

    /// Check if this error is recoverable (user can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            ApiError::RequestError(_) => true,
            ApiError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if this is a duplicate submission
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}
