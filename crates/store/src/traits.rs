//! Collaborator seams consumed by the decision pipeline

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hostlock_core::{LogEntry, ReferenceImage, Resolution, TamperLogEntry};

use crate::error::StoreResult;

/// Temporal assignment index
///
/// Pure read: resolving a token never changes state.
#[async_trait]
pub trait AssignmentIndex: Send + Sync {
    /// Find the assignment active for `token` at `at`
    ///
    /// Unknown tokens resolve to [`Resolution::unknown`]; known tokens with no
    /// active window keep their label but carry no reservation.
    async fn resolve(&self, token: &str, at: DateTime<Utc>) -> StoreResult<Resolution>;
}

/// Lookup of the occupant photo for a reservation
#[async_trait]
pub trait ReferenceDirectory: Send + Sync {
    /// First linked person (lowest id) that has an enrolled photo
    async fn reference_for(&self, reservation_id: i64) -> StoreResult<Option<ReferenceImage>>;
}

/// Append-only audit persistence
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Insert one access log row; returns its id
    async fn insert_access_log(&self, entry: &LogEntry) -> StoreResult<i64>;

    /// Insert one tamper log row
    async fn insert_tamper_log(&self, entry: &TamperLogEntry) -> StoreResult<()>;
}
