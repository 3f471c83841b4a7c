//! Error types for feedhub.

use thiserror::Error;

/// Common error type for feedhub.
#[derive(Error, Debug)]
pub enum FeedHubError {
    /// Failure talking to an upstream feed. The message is shown verbatim
    /// in the source's `error` field.
    #[error("{0}")]
    Http(String),

    /// Cache store unavailable or returned unusable data.
    #[error("cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error for user input or configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// The fan-out was asked to fetch an empty source list.
    #[error("no feed sources configured")]
    NoSources,
}

impl From<reqwest::Error> for FeedHubError {
    fn from(e: reqwest::Error) -> Self {
        FeedHubError::Http(e.to_string())
    }
}

/// Result type alias for feedhub operations.
pub type Result<T> = std::result::Result<T, FeedHubError>;
