//! Jito Error Types
//!
//! Error handling for Jito bundle operations.

use thiserror::Error;

/// Errors that can occur during Jito bundle operations
#[derive(Error, Debug, Clone)]
pub enum JitoError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Block Engine API error
    #[error("Block Engine error: {message} (code: {code})")]
    ApiError {
        code: i32,
        message: String,
    },

    /// Invalid bundle (empty, too large, etc.)
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    /// Tip account is not a valid public key
    #[error("Invalid tip account: {0}")]
    InvalidTipAccount(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Network/connection error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Bundle status check failed
    #[error("Status check failed: {0}")]
    StatusCheckFailed(String),
}

impl JitoError {
    /// True when the relay could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            JitoError::HttpError(_) | JitoError::Timeout | JitoError::NetworkError(_)
        )
    }
}

impl From<reqwest::Error> for JitoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            JitoError::Timeout
        } else if err.is_connect() {
            JitoError::NetworkError(err.to_string())
        } else {
            JitoError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for JitoError {
    fn from(err: serde_json::Error) -> Self {
        JitoError::SerializationError(err.to_string())
    }
}
