//! Decision engine
//!
//! ```text
//! resolve token ──error──▶ service_error
//!      │ inactive / unknown ──▶ denied
//!      ▼ active
//! snapshot? ──fetch fails──▶ granted_no_face
//!      ▼
//! reference photo? ──none──▶ granted_no_face
//!      ▼
//! no snapshot ──▶ granted (confidence 0)
//! compare ──match──▶ granted (confirmed confidence)
//!        └─no match / failure──▶ granted_no_face
//! ```
//!
//! A face mismatch never turns a valid token into a denial. The external
//! steps share one per-tap budget; running out of it counts as a failure of
//! the step that was in progress, and the decision is still published and
//! logged.

use chrono::Utc;
use hostlock_bus::MessageChannel;
use hostlock_core::{
    AccessDecision, DecisionMessage, EventCategory, LogEntry, Resolution, TapEvent,
    FACE_CONFIRMED_CONFIDENCE,
};
use hostlock_evidence::{EvidenceCategory, EvidenceRef, EvidenceRetriever};
use hostlock_face::FaceMatchAdapter;
use hostlock_store::{AssignmentIndex, ReferenceDirectory};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::audit::AuditWriter;
use crate::error::EngineResult;

pub const DEFAULT_DECISION_BUDGET: Duration = Duration::from_secs(20);

/// Result of evaluating one tap
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub decision: AccessDecision,
    pub label: String,
    pub reservation_id: Option<i64>,
    pub confidence: f64,
    /// Local reference of the retrieved snapshot
    pub snapshot: Option<String>,
    pub category: EventCategory,
}

impl Verdict {
    fn new(decision: AccessDecision, resolution: Resolution) -> Self {
        Self {
            decision,
            label: resolution.label,
            reservation_id: resolution.reservation_id,
            confidence: 0.0,
            snapshot: None,
            category: EventCategory::Fob,
        }
    }

    fn service_error() -> Self {
        Self::new(AccessDecision::ServiceError, Resolution::unknown())
    }

    pub fn into_log_entry(self, token: &str) -> LogEntry {
        LogEntry {
            token: token.to_string(),
            label: self.label,
            reservation_id: self.reservation_id,
            decision: self.decision,
            face_confidence: self.confidence,
            snapshot: self.snapshot,
            category: self.category,
            created_at: Utc::now(),
        }
    }
}

pub struct DecisionEngine {
    index: Arc<dyn AssignmentIndex>,
    references: Arc<dyn ReferenceDirectory>,
    evidence: Arc<EvidenceRetriever>,
    face: Arc<FaceMatchAdapter>,
    channel: Arc<dyn MessageChannel>,
    audit: Arc<AuditWriter>,
    confirmed_confidence: f64,
    budget: Duration,
}

impl DecisionEngine {
    pub fn new(
        index: Arc<dyn AssignmentIndex>,
        references: Arc<dyn ReferenceDirectory>,
        evidence: Arc<EvidenceRetriever>,
        face: Arc<FaceMatchAdapter>,
        channel: Arc<dyn MessageChannel>,
        audit: Arc<AuditWriter>,
    ) -> Self {
        Self {
            index,
            references,
            evidence,
            face,
            channel,
            audit,
            confirmed_confidence: FACE_CONFIRMED_CONFIDENCE,
            budget: DEFAULT_DECISION_BUDGET,
        }
    }

    pub fn with_confirmed_confidence(mut self, confidence: f64) -> Self {
        self.confirmed_confidence = confidence;
        self
    }

    /// Time allowed for lookups, retrieval and comparison of one tap
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Evaluate a tap without publishing or persisting anything
    pub async fn decide(&self, tap: &TapEvent) -> Verdict {
        let deadline = Instant::now() + self.budget;

        let resolution = match timeout_at(deadline, self.index.resolve(&tap.token, tap.at)).await {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => {
                tracing::error!(token = %tap.token, error = %e, "Assignment lookup unavailable");
                return Verdict::service_error();
            }
            Err(_) => {
                tracing::error!(token = %tap.token, "Assignment lookup exceeded budget");
                return Verdict::service_error();
            }
        };

        let reservation_id = match (resolution.is_active, resolution.reservation_id) {
            (true, Some(id)) => id,
            _ => return Verdict::new(AccessDecision::Denied, resolution),
        };

        let mut verdict = Verdict::new(AccessDecision::Granted, resolution);

        let probe = match &tap.snapshot_key {
            Some(key) => match timeout_at(deadline, self.evidence.fetch(key, EvidenceCategory::Fob))
                .await
                .unwrap_or(EvidenceRef::Unavailable)
            {
                EvidenceRef::Unavailable => {
                    tracing::warn!(token = %tap.token, key = %key, "Snapshot unavailable, skipping face check");
                    verdict.decision = AccessDecision::GrantedWithoutFaceCheck;
                    return verdict;
                }
                stored => Some(stored),
            },
            None => None,
        };
        verdict.snapshot = probe.as_ref().and_then(EvidenceRef::reference);

        let reference = match timeout_at(deadline, self.references.reference_for(reservation_id)).await {
            Ok(Ok(Some(reference))) => reference,
            Ok(Ok(None)) => {
                tracing::warn!(token = %tap.token, reservation_id, "No reference photo on file");
                verdict.decision = AccessDecision::GrantedWithoutFaceCheck;
                return verdict;
            }
            Ok(Err(e)) => {
                tracing::warn!(token = %tap.token, reservation_id, error = %e, "Reference lookup failed");
                verdict.decision = AccessDecision::GrantedWithoutFaceCheck;
                return verdict;
            }
            Err(_) => {
                tracing::warn!(token = %tap.token, reservation_id, "Reference lookup exceeded budget");
                verdict.decision = AccessDecision::GrantedWithoutFaceCheck;
                return verdict;
            }
        };

        let Some(probe_path) = probe.as_ref().and_then(EvidenceRef::path) else {
            return verdict;
        };

        verdict.category = EventCategory::FobFace;
        let reference_path = self.face.reference_path(&reference.path);
        let matched = match timeout_at(deadline, self.face.compare(probe_path, &reference_path)).await {
            Ok(matched) => matched,
            Err(_) => {
                tracing::warn!(token = %tap.token, "Face comparison exceeded budget");
                false
            }
        };
        if matched {
            verdict.confidence = self.confirmed_confidence;
        } else {
            tracing::warn!(
                token = %tap.token,
                person_id = reference.person_id,
                "Face not confirmed, granting on token only"
            );
            verdict.decision = AccessDecision::GrantedWithoutFaceCheck;
        }
        verdict
    }

    /// Decide, publish the decision to the door, then persist it
    pub async fn handle_tap(&self, tap: &TapEvent) -> EngineResult<LogEntry> {
        let verdict = self.decide(tap).await;

        tracing::info!(
            token = %tap.token,
            decision = %verdict.decision,
            reservation_id = ?verdict.reservation_id,
            confidence = verdict.confidence,
            "Access decided"
        );

        let message = DecisionMessage::new(tap.token.clone(), verdict.label.clone(), verdict.decision);
        let published: EngineResult<()> = match serde_json::to_value(&message) {
            Ok(value) => self.channel.publish(value).await.map_err(Into::into),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = published {
            tracing::error!(token = %tap.token, error = %e, "Failed to publish decision");
        }

        let entry = verdict.into_log_entry(&tap.token);
        // Decision already sent; a failed write is reported by the writer
        let _ = self.audit.record_access(&entry).await;
        Ok(entry)
    }
}
