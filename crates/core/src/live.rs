//! Events pushed to live dashboard subscribers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::AccessDecision;
use crate::log::{LogEntry, TamperLogEntry, TamperStatus};
use crate::message::TAMPER_ALERT_TEXT;

/// Typed live-stream event, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    AccessDecision {
        nfc_uid: String,
        access: AccessDecision,
        label: String,
        reservation_id: Option<i64>,
        confidence: f64,
        snapshot: Option<String>,
        created_at: DateTime<Utc>,
    },
    TamperAlert {
        tamper_id: String,
        alert: String,
        snapshot: Option<String>,
        status: TamperStatus,
        triggered_at: DateTime<Utc>,
    },
    NewImage {
        image_filename: String,
    },
}

impl LiveEvent {
    /// Serialize for the stream; these types always encode
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

impl From<&LogEntry> for LiveEvent {
    fn from(entry: &LogEntry) -> Self {
        LiveEvent::AccessDecision {
            nfc_uid: entry.token.clone(),
            access: entry.decision,
            label: entry.label.clone(),
            reservation_id: entry.reservation_id,
            confidence: entry.face_confidence,
            snapshot: entry.snapshot.clone(),
            created_at: entry.created_at,
        }
    }
}

impl From<&TamperLogEntry> for LiveEvent {
    fn from(entry: &TamperLogEntry) -> Self {
        LiveEvent::TamperAlert {
            tamper_id: entry.id.clone(),
            alert: TAMPER_ALERT_TEXT.to_string(),
            snapshot: entry.snapshot.clone(),
            status: entry.status,
            triggered_at: entry.triggered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::EventCategory;

    #[test]
    fn test_access_decision_projection() {
        let entry = LogEntry {
            token: "A1".to_string(),
            label: "Fob 1".to_string(),
            reservation_id: Some(4),
            decision: AccessDecision::Granted,
            face_confidence: 99.0,
            snapshot: Some("fob/a.jpg".to_string()),
            category: EventCategory::FobFace,
            created_at: Utc::now(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&LiveEvent::from(&entry).to_json()).unwrap();
        assert_eq!(value["type"], "access_decision");
        assert_eq!(value["nfc_uid"], "A1");
        assert_eq!(value["access"], "granted");
        assert_eq!(value["confidence"], 99.0);
    }

    #[test]
    fn test_new_image_tag() {
        let event = LiveEvent::NewImage {
            image_filename: "snap.jpg".to_string(),
        };
        assert_eq!(
            event.to_json(),
            r#"{"type":"new_image","image_filename":"snap.jpg"}"#
        );
    }

    #[test]
    fn test_tamper_alert_projection() {
        let entry = TamperLogEntry {
            id: "t-1".to_string(),
            property_id: None,
            snapshot: None,
            status: TamperStatus::Open,
            triggered_at: Utc::now(),
            created_at: Utc::now(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&LiveEvent::from(&entry).to_json()).unwrap();
        assert_eq!(value["type"], "tamper_alert");
        assert_eq!(value["status"], "open");
        assert_eq!(value["alert"], "Tamper detected!");
    }
}
