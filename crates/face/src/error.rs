//! Face matching errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    /// No comparison service configured
    #[error("Face matching is not configured")]
    NotConfigured,

    #[error("Face comparison timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Cannot read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Face service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Face service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Face service unavailable: {0}")]
    Unavailable(String),
}

pub type FaceResult<T> = Result<T, FaceError>;
