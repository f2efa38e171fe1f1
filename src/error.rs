use thiserror::Error;

use crate::request::RequestId;

/// Result type for volley operations.
pub type Result<T> = std::result::Result<T, VolleyError>;

/// Errors that can occur in the dispatch and logging system.
#[derive(Debug, Error)]
pub enum VolleyError {
    /// Caller supplied a request that fails validation. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An interaction has already been recorded for this request.
    #[error("interaction already recorded for request {0}")]
    Duplicate(RequestId),

    /// The persistence layer could not be reached or rejected the operation.
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),

    /// HTTP transport failed below the classification layer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded or deserialized.
    #[error("config error: {0}")]
    Config(#[from] figment::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
