//! Error types for model management.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during model operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable candidates were supplied for recommendation.
    #[error("no model candidates provided")]
    NoCandidates,

    /// Provider API error (non-success status).
    #[error("provider API error: {0}")]
    ProviderApi(String),

    /// Request failed at the transport level.
    #[error("request failed: {0}")]
    Request(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
