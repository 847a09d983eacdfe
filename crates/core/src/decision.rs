//! Access decisions
//!
//! Outcomes are ordered from strongest to weakest trust:
//! `Granted > GrantedWithoutFaceCheck > Denied`, with `ServiceError`
//! treated as a denial by the edge device.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Confidence recorded when the face step confirmed the occupant
pub const FACE_CONFIRMED_CONFIDENCE: f64 = 99.0;

/// Final outcome of a tap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessDecision {
    /// Valid token, face confirmed or not required
    Granted,

    /// Valid token, face step skipped, failed or mismatched
    #[serde(rename = "granted_no_face")]
    #[strum(serialize = "granted_no_face")]
    GrantedWithoutFaceCheck,

    /// Unknown or inactive token
    Denied,

    /// Persistence context unavailable; nothing was evaluated
    ServiceError,
}

impl AccessDecision {
    /// Whether the door opens
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            AccessDecision::Granted | AccessDecision::GrantedWithoutFaceCheck
        )
    }

    /// Value sent to the edge device
    pub fn wire(&self) -> WireAccess {
        match self {
            AccessDecision::Granted => WireAccess::Granted,
            AccessDecision::GrantedWithoutFaceCheck => WireAccess::GrantedNoFace,
            AccessDecision::Denied | AccessDecision::ServiceError => WireAccess::Denied,
        }
    }
}

/// Access values understood by the door controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WireAccess {
    Granted,
    GrantedNoFace,
    Denied,
}
