//! SQLite-backed store
//!
//! One pool shared by the index, the reference lookup and the audit writer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hostlock_core::{
    select_active, LogEntry, ReferenceImage, Resolution, TamperLogEntry, TamperStatus,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};
use crate::schema::{init_schema, AccessLogRow, AssignmentRow, FobRow, TamperLogRow};
use crate::traits::{AssignmentIndex, AuditSink, ReferenceDirectory};

/// SQLite store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to `database_url`, creating the file and schema if missing
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Private in-memory database (tests, dry runs)
    pub async fn in_memory() -> StoreResult<Self> {
        // A single long-lived connection: each SQLite memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Wrap an existing pool; the schema is not touched
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if missing
    pub async fn init(&self) -> StoreResult<()> {
        init_schema(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool; later calls fail as unavailable
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // === Tamper alerts ===

    /// Get one tamper alert
    pub async fn tamper_log(&self, tamper_id: &str) -> StoreResult<TamperLogEntry> {
        sqlx::query_as::<_, TamperLogRow>(
            "SELECT id, property_id, snapshot, status, triggered_at, created_at
             FROM tamper_logs WHERE id = ?",
        )
        .bind(tamper_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("TamperLog", tamper_id))?
        .try_into()
    }

    /// Mark a tamper alert resolved on behalf of `host_id`
    ///
    /// Only the host owning the alert's property may resolve it; an alert
    /// with no property has no owner and cannot be resolved. Resolving twice
    /// is a no-op.
    pub async fn resolve_tamper(&self, tamper_id: &str, host_id: i64) -> StoreResult<TamperStatus> {
        let alert = self.tamper_log(tamper_id).await?;

        let owner: Option<i64> = match alert.property_id {
            Some(property_id) => sqlx::query("SELECT host_id FROM properties WHERE id = ?")
                .bind(property_id)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| row.get("host_id")),
            None => None,
        };

        if owner != Some(host_id) {
            tracing::warn!(
                tamper_id,
                host_id,
                property_id = ?alert.property_id,
                "Unauthorized tamper resolution"
            );
            return Err(StoreError::Unauthorized {
                entity: "TamperLog".to_string(),
                id: tamper_id.to_string(),
                host_id,
            });
        }

        let next = alert.status.transition(TamperStatus::Resolved)?;
        if next != alert.status {
            sqlx::query("UPDATE tamper_logs SET status = ? WHERE id = ? AND status = ?")
                .bind(next.to_string())
                .bind(tamper_id)
                .bind(TamperStatus::Open.to_string())
                .execute(&self.pool)
                .await?;
            tracing::info!(tamper_id, host_id, "Tamper alert resolved");
        }

        Ok(next)
    }

    /// Tamper alerts for every property owned by `host_id`, newest first
    pub async fn tamper_alerts_for_host(&self, host_id: i64) -> StoreResult<Vec<TamperLogEntry>> {
        let rows = sqlx::query_as::<_, TamperLogRow>(
            "SELECT t.id, t.property_id, t.snapshot, t.status, t.triggered_at, t.created_at
             FROM tamper_logs t
             JOIN properties p ON p.id = t.property_id
             WHERE p.host_id = ?
             ORDER BY t.triggered_at DESC",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TamperLogEntry::try_from).collect()
    }

    /// Most recent tamper alerts regardless of property
    pub async fn recent_tamper_alerts(&self, limit: u32) -> StoreResult<Vec<TamperLogEntry>> {
        let rows = sqlx::query_as::<_, TamperLogRow>(
            "SELECT id, property_id, snapshot, status, triggered_at, created_at
             FROM tamper_logs ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TamperLogEntry::try_from).collect()
    }

    // === Access history ===

    /// Most recent access logs, newest first
    pub async fn recent_access_logs(&self, limit: u32) -> StoreResult<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            "SELECT id, token, label, reservation_id, decision, face_confidence, snapshot,
                    category, created_at
             FROM access_logs ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LogEntry::try_from).collect()
    }

    /// Access history of one reservation, newest first
    pub async fn access_logs_for_reservation(&self, reservation_id: i64) -> StoreResult<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            "SELECT id, token, label, reservation_id, decision, face_confidence, snapshot,
                    category, created_at
             FROM access_logs WHERE reservation_id = ? ORDER BY id DESC",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LogEntry::try_from).collect()
    }

    /// Number of access log rows
    pub async fn access_log_count(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM access_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    /// Number of tamper log rows
    pub async fn tamper_log_count(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM tamper_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count") as u64)
    }
}

#[async_trait]
impl AssignmentIndex for Store {
    async fn resolve(&self, token: &str, at: DateTime<Utc>) -> StoreResult<Resolution> {
        let fob = sqlx::query_as::<_, FobRow>("SELECT id, uid, label FROM fobs WHERE uid = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(fob) = fob else {
            return Ok(Resolution::unknown());
        };

        let assignments: Vec<_> = sqlx::query_as::<_, AssignmentRow>(
            "SELECT id, reservation_id, active_from, active_until, is_active
             FROM fob_assignments WHERE fob_id = ? ORDER BY id",
        )
        .bind(fob.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.into_assignment(&fob.uid))
        .collect();

        match select_active(&assignments, at) {
            Some((winner, matching)) => {
                if matching > 1 {
                    tracing::warn!(
                        token,
                        matching = matching as u64,
                        assignment_id = winner.id,
                        "Overlapping active assignments, using lowest id"
                    );
                }
                Ok(Resolution::active(fob.label, winner.reservation_id))
            }
            None => Ok(Resolution::inactive(fob.label)),
        }
    }
}

#[async_trait]
impl ReferenceDirectory for Store {
    async fn reference_for(&self, reservation_id: i64) -> StoreResult<Option<ReferenceImage>> {
        let row = sqlx::query(
            "SELECT p.id, p.name, p.reference_image
             FROM reservation_occupants o
             JOIN persons p ON p.id = o.person_id
             WHERE o.reservation_id = ?
               AND p.reference_image IS NOT NULL
               AND p.reference_image != ''
             ORDER BY p.id
             LIMIT 1",
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ReferenceImage {
            person_id: row.get("id"),
            person_name: row.get("name"),
            path: row.get("reference_image"),
        }))
    }
}

#[async_trait]
impl AuditSink for Store {
    async fn insert_access_log(&self, entry: &LogEntry) -> StoreResult<i64> {
        let result = sqlx::query(
            "INSERT INTO access_logs
             (token, label, reservation_id, decision, face_confidence, snapshot, category, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.token)
        .bind(&entry.label)
        .bind(entry.reservation_id)
        .bind(entry.decision.to_string())
        .bind(entry.face_confidence)
        .bind(&entry.snapshot)
        .bind(entry.category.to_string())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_tamper_log(&self, entry: &TamperLogEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tamper_logs (id, property_id, snapshot, status, triggered_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(entry.property_id)
        .bind(&entry.snapshot)
        .bind(entry.status.to_string())
        .bind(entry.triggered_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
