//! HostLock Store - SQLite persistence for the access pipeline
//!
//! - Temporal assignment index: token + instant -> active reservation
//! - Reference directory: reservation -> occupant photo
//! - Audit sink: append-only access and tamper logs
//! - Tamper resolution and history queries for the dashboard

pub mod error;
pub mod schema;
pub mod seed;
pub mod store;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use seed::{
    AssignmentSeed, FobSeed, PersonSeed, PropertySeed, RegistrySeed, ReservationSeed, SeedSummary,
};
pub use store::Store;
pub use traits::{AssignmentIndex, AuditSink, ReferenceDirectory};
