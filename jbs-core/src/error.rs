//! Error types for the jbs backend.

use thiserror::Error;

/// Errors that can occur in jbs operations.
#[derive(Error, Debug)]
pub enum JbsError {
    #[error("Invalid token format")]
    InvalidToken,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("This time slot is already booked.")]
    SlotUnavailable,

    #[error("{0}")]
    ActionNotAllowed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl JbsError {
    /// Whether the message is safe to show to the caller as-is.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            JbsError::InvalidToken
                | JbsError::BookingNotFound
                | JbsError::NotFound(_)
                | JbsError::Validation(_)
                | JbsError::SlotUnavailable
                | JbsError::ActionNotAllowed(_)
        )
    }
}

impl From<reqwest::Error> for JbsError {
    fn from(err: reqwest::Error) -> Self {
        JbsError::Remote(err.to_string())
    }
}

impl From<serde_json::Error> for JbsError {
    fn from(err: serde_json::Error) -> Self {
        JbsError::Serialization(err.to_string())
    }
}

/// Result type alias for jbs operations.
pub type JbsResult<T> = Result<T, JbsError>;
