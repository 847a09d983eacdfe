//! Audit records
//!
//! A [`LogEntry`] is written exactly once per processed tap and never
//! mutated. A [`TamperLogEntry`] only ever moves `open -> resolved`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::decision::AccessDecision;
use crate::error::{CoreError, CoreResult};

/// How the tap was verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventCategory {
    /// Token only
    Fob,
    /// Token plus a face comparison that actually ran
    FobFace,
}

/// Immutable audit record of one tap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub token: String,
    pub label: String,
    pub reservation_id: Option<i64>,
    pub decision: AccessDecision,
    /// 0 when the face step did not confirm a match
    pub face_confidence: f64,
    /// Local reference of the retrieved snapshot
    pub snapshot: Option<String>,
    pub category: EventCategory,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Dashboard status projection
    pub fn display_status(&self) -> &'static str {
        match self.decision {
            AccessDecision::Granted | AccessDecision::GrantedWithoutFaceCheck => "Success",
            AccessDecision::Denied => "Failed",
            AccessDecision::ServiceError => "Error",
        }
    }
}

/// Tamper alert lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TamperStatus {
    Open,
    Resolved,
}

impl TamperStatus {
    /// Apply a transition; `resolved -> open` is rejected
    pub fn transition(self, next: TamperStatus) -> CoreResult<TamperStatus> {
        match (self, next) {
            (TamperStatus::Open, _) => Ok(next),
            (TamperStatus::Resolved, TamperStatus::Resolved) => Ok(TamperStatus::Resolved),
            (TamperStatus::Resolved, TamperStatus::Open) => Err(CoreError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }
}

/// Audit record of one tamper event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperLogEntry {
    pub id: String,
    /// Property served by the reporting controller
    pub property_id: Option<i64>,
    pub snapshot: Option<String>,
    pub status: TamperStatus,
    /// Device-reported time of the event
    pub triggered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(decision: AccessDecision) -> LogEntry {
        LogEntry {
            token: "A1".to_string(),
            label: "Fob 1".to_string(),
            reservation_id: Some(1),
            decision,
            face_confidence: 0.0,
            snapshot: None,
            category: EventCategory::Fob,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_status() {
        assert_eq!(entry(AccessDecision::Granted).display_status(), "Success");
        assert_eq!(
            entry(AccessDecision::GrantedWithoutFaceCheck).display_status(),
            "Success"
        );
        assert_eq!(entry(AccessDecision::Denied).display_status(), "Failed");
    }

    #[test]
    fn test_tamper_open_to_resolved() {
        assert_eq!(
            TamperStatus::Open.transition(TamperStatus::Resolved),
            Ok(TamperStatus::Resolved)
        );
    }

    #[test]
    fn test_tamper_resolved_is_terminal() {
        assert_eq!(
            TamperStatus::Resolved.transition(TamperStatus::Resolved),
            Ok(TamperStatus::Resolved)
        );
        let err = TamperStatus::Resolved
            .transition(TamperStatus::Open)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(EventCategory::Fob.to_string(), "fob");
        assert_eq!(EventCategory::FobFace.to_string(), "fob_face");
    }
}
