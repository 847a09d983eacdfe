//! Store errors

use hostlock_core::CoreError;
use thiserror::Error;

/// Errors from the SQLite store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Host {host_id} is not allowed to modify {entity} {id}")]
    Unauthorized {
        entity: String,
        id: String,
        host_id: i64,
    },

    #[error("Invalid stored value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    #[error("Domain error: {0}")]
    Domain(#[from] CoreError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_value(field: &str, value: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Pool closed or connection lost: the persistence context is gone
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::PoolClosed)
                | Self::Database(sqlx::Error::PoolTimedOut)
                | Self::Database(sqlx::Error::Io(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = StoreError::not_found("TamperLog", "t-1");
        assert!(err.is_not_found());
        assert!(!err.is_unavailable());
        assert_eq!(err.to_string(), "Record not found: TamperLog with id t-1");
    }

    #[test]
    fn test_pool_closed_is_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert!(err.is_unavailable());
    }
}
