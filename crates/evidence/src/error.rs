//! Evidence retrieval errors

use thiserror::Error;

/// Blob store and local write failures
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Object does not exist (or was already fetched)
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Key cannot be turned into a local file name
    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    /// Base URL of an HTTP store is unusable
    #[error("Invalid blob store endpoint: {url}")]
    InvalidEndpoint { url: String },

    /// Remote store answered with a failure status
    #[error("Blob store returned {status} for {key}")]
    Http { status: u16, key: String },

    #[error("Blob store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {secs}s fetching {key}")]
    Timeout { key: String, secs: u64 },
}

/// Result type for evidence operations
pub type EvidenceResult<T> = Result<T, EvidenceError>;

impl EvidenceError {
    pub fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
