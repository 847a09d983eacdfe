//! Core domain errors

use thiserror::Error;

/// Errors raised while interpreting domain values
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an InvalidField error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Check if this error means an identifying field was absent
    pub fn is_missing_field(&self) -> bool {
        matches!(self, CoreError::MissingField(_))
    }
}
