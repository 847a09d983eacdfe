//! Integration tests for the SQLite store

use chrono::{DateTime, TimeZone, Utc};
use hostlock_core::{
    AccessDecision, EventCategory, LogEntry, TamperLogEntry, TamperStatus, UNKNOWN_LABEL,
};
use hostlock_store::{AssignmentIndex, AuditSink, ReferenceDirectory, RegistrySeed, Store};
use tempfile::TempDir;

fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

/// Property 1 (host 10), reservation 100 with Alice (photo) and Bob (no photo),
/// reservation 200 with nobody, fob A1 bound to 100 for Jan 1..10
async fn seeded_store() -> Store {
    let store = Store::in_memory().await.unwrap();
    store.add_property(1, "Lake House", 10).await.unwrap();
    store.add_person(1, "Alice", Some("alice.jpg")).await.unwrap();
    store.add_person(2, "Bob", None).await.unwrap();
    store.add_reservation(100, Some(1), Some("BK-100")).await.unwrap();
    store.add_reservation(200, Some(1), Some("BK-200")).await.unwrap();
    store.add_occupant(100, 2).await.unwrap();
    store.add_occupant(100, 1).await.unwrap();
    store.add_fob(1, "A1", "Fob 1").await.unwrap();
    store.add_fob(2, "B2", "Fob 2").await.unwrap();
    store
        .assign_fob("A1", 100, ts(1, 0), ts(10, 0), true)
        .await
        .unwrap();
    store
}

fn log_entry(token: &str, reservation_id: Option<i64>, decision: AccessDecision) -> LogEntry {
    LogEntry {
        token: token.to_string(),
        label: "Fob 1".to_string(),
        reservation_id,
        decision,
        face_confidence: 0.0,
        snapshot: None,
        category: EventCategory::Fob,
        created_at: ts(5, 12),
    }
}

fn tamper_entry(id: &str, property_id: Option<i64>) -> TamperLogEntry {
    TamperLogEntry {
        id: id.to_string(),
        property_id,
        snapshot: Some("tamper/TAMPER_1.jpg".to_string()),
        status: TamperStatus::Open,
        triggered_at: ts(5, 12),
        created_at: ts(5, 12),
    }
}

#[tokio::test]
async fn test_resolve_unknown_token() {
    let store = seeded_store().await;
    let res = store.resolve("ZZ", ts(5, 12)).await.unwrap();
    assert!(!res.is_active);
    assert_eq!(res.label, UNKNOWN_LABEL);
    assert_eq!(res.reservation_id, None);
}

#[tokio::test]
async fn test_resolve_active_window() {
    let store = seeded_store().await;
    let res = store.resolve("A1", ts(5, 12)).await.unwrap();
    assert!(res.is_active);
    assert_eq!(res.label, "Fob 1");
    assert_eq!(res.reservation_id, Some(100));
}

#[tokio::test]
async fn test_resolve_outside_window_keeps_label() {
    let store = seeded_store().await;
    let res = store.resolve("A1", ts(11, 0)).await.unwrap();
    assert!(!res.is_active);
    assert_eq!(res.label, "Fob 1");
    assert_eq!(res.reservation_id, None);

    // Known fob with no assignments at all
    let res = store.resolve("B2", ts(5, 12)).await.unwrap();
    assert!(!res.is_active);
    assert_eq!(res.label, "Fob 2");
}

#[tokio::test]
async fn test_resolve_ignores_deactivated_assignment() {
    let store = seeded_store().await;
    store
        .assign_fob("B2", 200, ts(1, 0), ts(10, 0), false)
        .await
        .unwrap();
    let res = store.resolve("B2", ts(5, 12)).await.unwrap();
    assert!(!res.is_active);
}

#[tokio::test]
async fn test_resolve_overlap_prefers_lowest_id() {
    let store = seeded_store().await;
    // Second overlapping window for A1, inserted later so it has a higher id
    store
        .assign_fob("A1", 200, ts(3, 0), ts(8, 0), true)
        .await
        .unwrap();
    let res = store.resolve("A1", ts(5, 12)).await.unwrap();
    assert_eq!(res.reservation_id, Some(100));
}

#[tokio::test]
async fn test_resolve_selects_window_by_time() {
    let store = seeded_store().await;
    store
        .assign_fob("A1", 200, ts(15, 0), ts(20, 0), true)
        .await
        .unwrap();
    assert_eq!(
        store.resolve("A1", ts(16, 0)).await.unwrap().reservation_id,
        Some(200)
    );
    assert_eq!(
        store.resolve("A1", ts(2, 0)).await.unwrap().reservation_id,
        Some(100)
    );
}

#[tokio::test]
async fn test_assign_rejects_inverted_window() {
    let store = seeded_store().await;
    let err = store
        .assign_fob("A1", 100, ts(10, 0), ts(1, 0), true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("active_until"));

    let err = store
        .assign_fob("NOPE", 100, ts(1, 0), ts(2, 0), true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_reference_for_picks_person_with_photo() {
    let store = seeded_store().await;
    let reference = store.reference_for(100).await.unwrap().unwrap();
    assert_eq!(reference.person_id, 1);
    assert_eq!(reference.person_name, "Alice");
    assert_eq!(reference.path, "alice.jpg");

    assert!(store.reference_for(200).await.unwrap().is_none());
}

#[tokio::test]
async fn test_access_log_round_trip() {
    let store = seeded_store().await;
    let mut entry = log_entry("A1", Some(100), AccessDecision::GrantedWithoutFaceCheck);
    entry.snapshot = Some("fob/snap.jpg".to_string());

    let id = store.insert_access_log(&entry).await.unwrap();
    assert!(id > 0);
    store
        .insert_access_log(&log_entry("ZZ", None, AccessDecision::Denied))
        .await
        .unwrap();

    assert_eq!(store.access_log_count().await.unwrap(), 2);

    let recent = store.recent_access_logs(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].token, "ZZ");
    assert_eq!(recent[1], entry);

    let history = store.access_logs_for_reservation(100).await.unwrap();
    assert_eq!(history, vec![entry]);
}

#[tokio::test]
async fn test_tamper_resolution_requires_owner() {
    let store = seeded_store().await;
    store
        .insert_tamper_log(&tamper_entry("t-1", Some(1)))
        .await
        .unwrap();

    let err = store.resolve_tamper("t-1", 99).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(
        store.tamper_log("t-1").await.unwrap().status,
        TamperStatus::Open
    );

    let status = store.resolve_tamper("t-1", 10).await.unwrap();
    assert_eq!(status, TamperStatus::Resolved);
    assert_eq!(
        store.tamper_log("t-1").await.unwrap().status,
        TamperStatus::Resolved
    );
}

#[tokio::test]
async fn test_tamper_without_property_has_no_owner() {
    let store = seeded_store().await;
    store
        .insert_tamper_log(&tamper_entry("t-orphan", None))
        .await
        .unwrap();

    for host_id in [10, 99] {
        let err = store.resolve_tamper("t-orphan", host_id).await.unwrap_err();
        assert!(err.is_unauthorized());
    }
    assert_eq!(
        store.tamper_log("t-orphan").await.unwrap().status,
        TamperStatus::Open
    );
}

#[tokio::test]
async fn test_tamper_resolution_is_irreversible_and_idempotent() {
    let store = seeded_store().await;
    store
        .insert_tamper_log(&tamper_entry("t-2", Some(1)))
        .await
        .unwrap();

    assert_eq!(
        store.resolve_tamper("t-2", 10).await.unwrap(),
        TamperStatus::Resolved
    );
    assert_eq!(
        store.resolve_tamper("t-2", 10).await.unwrap(),
        TamperStatus::Resolved
    );

    let err = store.resolve_tamper("missing", 10).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_tamper_alerts_for_host() {
    let store = seeded_store().await;
    store.add_property(2, "City Flat", 20).await.unwrap();
    store
        .insert_tamper_log(&tamper_entry("t-1", Some(1)))
        .await
        .unwrap();
    store
        .insert_tamper_log(&tamper_entry("t-2", Some(2)))
        .await
        .unwrap();

    let alerts = store.tamper_alerts_for_host(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, "t-1");
    assert_eq!(store.recent_tamper_alerts(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_closed_store_is_unavailable() {
    let store = seeded_store().await;
    store.close().await;
    let err = store.resolve("A1", ts(5, 12)).await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_file_database_and_seed() {
    let temp_dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", temp_dir.path().join("hostlock.db").display());

    let registry = RegistrySeed {
        properties: vec![hostlock_store::PropertySeed {
            id: 1,
            name: "Lake House".to_string(),
            host_id: 10,
        }],
        persons: vec![hostlock_store::PersonSeed {
            id: 1,
            name: "Alice".to_string(),
            reference_image: Some("alice.jpg".to_string()),
        }],
        reservations: vec![hostlock_store::ReservationSeed {
            id: 100,
            property_id: Some(1),
            booking_code: None,
            occupants: vec![1],
        }],
        fobs: vec![hostlock_store::FobSeed {
            id: 1,
            uid: "A1".to_string(),
            label: "Fob 1".to_string(),
        }],
        assignments: vec![hostlock_store::AssignmentSeed {
            fob: "A1".to_string(),
            reservation_id: 100,
            active_from: ts(1, 0),
            active_until: ts(10, 0),
            is_active: true,
        }],
    };

    {
        let store = Store::connect(&url).await.unwrap();
        let summary = store.seed(&registry).await.unwrap();
        assert_eq!(summary.assignments, 1);
        store.close().await;
    }

    // Reopen: data persisted
    let store = Store::connect(&url).await.unwrap();
    let res = store.resolve("A1", ts(5, 12)).await.unwrap();
    assert_eq!(res.reservation_id, Some(100));
}
