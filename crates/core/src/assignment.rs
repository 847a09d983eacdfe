//! Fob assignments - time-bounded bindings of a token to a reservation
//!
//! A token may carry many assignments over disjoint windows. At most one
//! should contain any given instant; when the booking side lets two overlap,
//! the lowest assignment id wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label reported for tokens that are not registered at all
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A binding of a token to a reservation for `[active_from, active_until]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Internal identifier (tie-break key)
    pub id: i64,
    /// Token identifier as read from the fob
    pub token: String,
    /// Owning reservation
    pub reservation_id: i64,
    /// Start of the window (inclusive)
    pub active_from: DateTime<Utc>,
    /// End of the window (inclusive)
    pub active_until: DateTime<Utc>,
    /// Status flag; inactive rows never match
    pub is_active: bool,
}

impl Assignment {
    /// Whether this assignment grants access at `at`
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.active_from <= at && at <= self.active_until
    }
}

/// Pick the assignment active at `at`, lowest id first
///
/// Returns the winner and the number of candidates that matched, so callers
/// can report overlapping windows.
pub fn select_active(assignments: &[Assignment], at: DateTime<Utc>) -> Option<(&Assignment, usize)> {
    let mut matching: Vec<&Assignment> = assignments.iter().filter(|a| a.covers(at)).collect();
    matching.sort_by_key(|a| a.id);
    let count = matching.len();
    matching.first().map(|winner| (*winner, count))
}

/// Outcome of resolving a token at an instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub is_active: bool,
    /// Human-readable fob tag, or [`UNKNOWN_LABEL`]
    pub label: String,
    pub reservation_id: Option<i64>,
}

impl Resolution {
    /// Token has no registration
    pub fn unknown() -> Self {
        Self {
            is_active: false,
            label: UNKNOWN_LABEL.to_string(),
            reservation_id: None,
        }
    }

    /// Token is registered but no window is active
    pub fn inactive(label: impl Into<String>) -> Self {
        Self {
            is_active: false,
            label: label.into(),
            reservation_id: None,
        }
    }

    /// Token is bound to `reservation_id` right now
    pub fn active(label: impl Into<String>, reservation_id: i64) -> Self {
        Self {
            is_active: true,
            label: label.into(),
            reservation_id: Some(reservation_id),
        }
    }
}

/// Enrolled photo of a reservation occupant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub person_id: i64,
    pub person_name: String,
    /// Local path of the enrolled photo
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn assignment(id: i64, reservation_id: i64, from: u32, until: u32) -> Assignment {
        Assignment {
            id,
            token: "A1".to_string(),
            reservation_id,
            active_from: at(from, 0),
            active_until: at(until, 0),
            is_active: true,
        }
    }

    #[test]
    fn test_covers_is_inclusive() {
        let a = assignment(1, 10, 1, 10);
        assert!(a.covers(at(1, 0)));
        assert!(a.covers(at(5, 12)));
        assert!(a.covers(at(10, 0)));
        assert!(!a.covers(at(10, 1)));
    }

    #[test]
    fn test_inactive_flag_never_covers() {
        let mut a = assignment(1, 10, 1, 10);
        a.is_active = false;
        assert!(!a.covers(at(5, 12)));
    }

    #[test]
    fn test_select_active_disjoint_windows() {
        let rows = vec![assignment(1, 10, 1, 5), assignment(2, 20, 6, 10)];
        let (winner, count) = select_active(&rows, at(7, 0)).unwrap();
        assert_eq!(winner.reservation_id, 20);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_select_active_overlap_picks_lowest_id() {
        let rows = vec![assignment(9, 90, 1, 10), assignment(3, 30, 1, 10)];
        let (winner, count) = select_active(&rows, at(5, 0)).unwrap();
        assert_eq!(winner.id, 3);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_select_active_none() {
        let rows = vec![assignment(1, 10, 1, 5)];
        assert!(select_active(&rows, at(20, 0)).is_none());
        assert!(select_active(&[], at(1, 0)).is_none());
    }

    #[test]
    fn test_resolution_constructors() {
        let unknown = Resolution::unknown();
        assert!(!unknown.is_active);
        assert_eq!(unknown.label, UNKNOWN_LABEL);
        assert_eq!(unknown.reservation_id, None);

        let inactive = Resolution::inactive("Fob 3");
        assert_eq!(inactive.label, "Fob 3");
        assert_eq!(inactive.reservation_id, None);

        let active = Resolution::active("Fob 1", 7);
        assert!(active.is_active);
        assert_eq!(active.reservation_id, Some(7));
    }
}
