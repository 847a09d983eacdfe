//! Database schema and row types
//!
//! The registry tables (properties, reservations, persons, fobs,
//! assignments) are owned by the booking side; this crate only reads them,
//! apart from seeding. The two log tables are append-only, except for the
//! tamper status flag.

use chrono::{DateTime, Utc};
use hostlock_core::{
    AccessDecision, Assignment, EventCategory, LogEntry, TamperLogEntry, TamperStatus,
};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS properties (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        host_id INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reservations (
        id INTEGER PRIMARY KEY,
        property_id INTEGER REFERENCES properties(id),
        booking_code TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS persons (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        reference_image TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reservation_occupants (
        reservation_id INTEGER NOT NULL REFERENCES reservations(id),
        person_id INTEGER NOT NULL REFERENCES persons(id),
        PRIMARY KEY (reservation_id, person_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fobs (
        id INTEGER PRIMARY KEY,
        uid TEXT NOT NULL UNIQUE,
        label TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fob_assignments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        fob_id INTEGER NOT NULL REFERENCES fobs(id),
        reservation_id INTEGER NOT NULL REFERENCES reservations(id),
        active_from TEXT NOT NULL,
        active_until TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_fob_assignments_fob
    ON fob_assignments(fob_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token TEXT NOT NULL,
        label TEXT NOT NULL,
        reservation_id INTEGER,
        decision TEXT NOT NULL,
        face_confidence REAL NOT NULL DEFAULT 0,
        snapshot TEXT,
        category TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_access_logs_reservation
    ON access_logs(reservation_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tamper_logs (
        id TEXT PRIMARY KEY,
        property_id INTEGER,
        snapshot TEXT,
        status TEXT NOT NULL,
        triggered_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

/// Create all tables and indexes if missing
pub async fn init_schema(pool: &SqlitePool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Row of `fobs`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FobRow {
    pub id: i64,
    pub uid: String,
    pub label: String,
}

/// Row of `fob_assignments`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub reservation_id: i64,
    pub active_from: DateTime<Utc>,
    pub active_until: DateTime<Utc>,
    pub is_active: bool,
}

impl AssignmentRow {
    pub fn into_assignment(self, token: &str) -> Assignment {
        Assignment {
            id: self.id,
            token: token.to_string(),
            reservation_id: self.reservation_id,
            active_from: self.active_from,
            active_until: self.active_until,
            is_active: self.is_active,
        }
    }
}

/// Row of `access_logs`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessLogRow {
    pub id: i64,
    pub token: String,
    pub label: String,
    pub reservation_id: Option<i64>,
    pub decision: String,
    pub face_confidence: f64,
    pub snapshot: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccessLogRow> for LogEntry {
    type Error = StoreError;

    fn try_from(row: AccessLogRow) -> StoreResult<Self> {
        let decision = AccessDecision::from_str(&row.decision)
            .map_err(|_| StoreError::invalid_value("access_logs.decision", &row.decision))?;
        let category = EventCategory::from_str(&row.category)
            .map_err(|_| StoreError::invalid_value("access_logs.category", &row.category))?;
        Ok(LogEntry {
            token: row.token,
            label: row.label,
            reservation_id: row.reservation_id,
            decision,
            face_confidence: row.face_confidence,
            snapshot: row.snapshot,
            category,
            created_at: row.created_at,
        })
    }
}

/// Row of `tamper_logs`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TamperLogRow {
    pub id: String,
    pub property_id: Option<i64>,
    pub snapshot: Option<String>,
    pub status: String,
    pub triggered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TamperLogRow> for TamperLogEntry {
    type Error = StoreError;

    fn try_from(row: TamperLogRow) -> StoreResult<Self> {
        let status = TamperStatus::from_str(&row.status)
            .map_err(|_| StoreError::invalid_value("tamper_logs.status", &row.status))?;
        Ok(TamperLogEntry {
            id: row.id,
            property_id: row.property_id,
            snapshot: row.snapshot,
            status,
            triggered_at: row.triggered_at,
            created_at: row.created_at,
        })
    }
}
