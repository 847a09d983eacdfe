//! Registry seeding
//!
//! Reservations, occupants and fob assignments are managed by the booking
//! side. These inserts let a stand-alone deployment (and the tests) load a
//! registry snapshot; they are not a booking API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

/// A property and the host that owns it
#[derive(Debug, Clone, Deserialize)]
pub struct PropertySeed {
    pub id: i64,
    pub name: String,
    pub host_id: i64,
}

/// A person, optionally with an enrolled reference photo
#[derive(Debug, Clone, Deserialize)]
pub struct PersonSeed {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub reference_image: Option<String>,
}

/// A reservation and its occupants
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationSeed {
    pub id: i64,
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default)]
    pub booking_code: Option<String>,
    #[serde(default)]
    pub occupants: Vec<i64>,
}

/// A physical fob
#[derive(Debug, Clone, Deserialize)]
pub struct FobSeed {
    pub id: i64,
    pub uid: String,
    pub label: String,
}

/// A fob bound to a reservation for a window
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentSeed {
    /// Fob uid
    pub fob: String,
    pub reservation_id: i64,
    pub active_from: DateTime<Utc>,
    pub active_until: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Full registry snapshot
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrySeed {
    #[serde(default)]
    pub properties: Vec<PropertySeed>,
    #[serde(default)]
    pub persons: Vec<PersonSeed>,
    #[serde(default)]
    pub reservations: Vec<ReservationSeed>,
    #[serde(default)]
    pub fobs: Vec<FobSeed>,
    #[serde(default)]
    pub assignments: Vec<AssignmentSeed>,
}

/// Counts of what a seed run inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub properties: usize,
    pub persons: usize,
    pub reservations: usize,
    pub fobs: usize,
    pub assignments: usize,
}

impl Store {
    pub async fn add_property(&self, id: i64, name: &str, host_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT OR REPLACE INTO properties (id, name, host_id) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(host_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn add_person(&self, id: i64, name: &str, reference_image: Option<&str>) -> StoreResult<()> {
        sqlx::query("INSERT OR REPLACE INTO persons (id, name, reference_image) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(reference_image)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn add_reservation(
        &self,
        id: i64,
        property_id: Option<i64>,
        booking_code: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO reservations (id, property_id, booking_code) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(property_id)
        .bind(booking_code)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn add_occupant(&self, reservation_id: i64, person_id: i64) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO reservation_occupants (reservation_id, person_id) VALUES (?, ?)",
        )
        .bind(reservation_id)
        .bind(person_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn add_fob(&self, id: i64, uid: &str, label: &str) -> StoreResult<()> {
        sqlx::query("INSERT OR REPLACE INTO fobs (id, uid, label) VALUES (?, ?, ?)")
            .bind(id)
            .bind(uid)
            .bind(label)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Bind fob `uid` to a reservation; returns the assignment id
    pub async fn assign_fob(
        &self,
        uid: &str,
        reservation_id: i64,
        active_from: DateTime<Utc>,
        active_until: DateTime<Utc>,
        is_active: bool,
    ) -> StoreResult<i64> {
        if active_until < active_from {
            return Err(StoreError::invalid_value(
                "fob_assignments.active_until",
                active_until.to_rfc3339(),
            ));
        }

        let fob_id: i64 = sqlx::query_scalar("SELECT id FROM fobs WHERE uid = ?")
            .bind(uid)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StoreError::not_found("Fob", uid))?;

        let result = sqlx::query(
            "INSERT INTO fob_assignments (fob_id, reservation_id, active_from, active_until, is_active)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(fob_id)
        .bind(reservation_id)
        .bind(active_from)
        .bind(active_until)
        .bind(is_active)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Load a registry snapshot in dependency order
    pub async fn seed(&self, registry: &RegistrySeed) -> StoreResult<SeedSummary> {
        let mut summary = SeedSummary::default();

        for p in &registry.properties {
            self.add_property(p.id, &p.name, p.host_id).await?;
            summary.properties += 1;
        }
        for p in &registry.persons {
            self.add_person(p.id, &p.name, p.reference_image.as_deref()).await?;
            summary.persons += 1;
        }
        for r in &registry.reservations {
            self.add_reservation(r.id, r.property_id, r.booking_code.as_deref()).await?;
            for person_id in &r.occupants {
                self.add_occupant(r.id, *person_id).await?;
            }
            summary.reservations += 1;
        }
        for f in &registry.fobs {
            self.add_fob(f.id, &f.uid, &f.label).await?;
            summary.fobs += 1;
        }
        for a in &registry.assignments {
            self.assign_fob(&a.fob, a.reservation_id, a.active_from, a.active_until, a.is_active)
                .await?;
            summary.assignments += 1;
        }

        tracing::info!(
            properties = summary.properties,
            persons = summary.persons,
            reservations = summary.reservations,
            fobs = summary.fobs,
            assignments = summary.assignments,
            "Registry seeded"
        );

        Ok(summary)
    }
}
