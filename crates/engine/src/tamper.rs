//! Tamper path: record the alert, acknowledge it to the door

use chrono::Utc;
use hostlock_bus::MessageChannel;
use hostlock_core::{TamperAck, TamperEvent, TamperLogEntry, TamperStatus};
use hostlock_evidence::{EvidenceCategory, EvidenceRetriever};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::audit::AuditWriter;
use crate::decision::DEFAULT_DECISION_BUDGET;
use crate::error::EngineResult;

pub struct TamperHandler {
    evidence: Arc<EvidenceRetriever>,
    channel: Arc<dyn MessageChannel>,
    audit: Arc<AuditWriter>,
    property_id: Option<i64>,
    budget: Duration,
}

impl TamperHandler {
    pub fn new(
        evidence: Arc<EvidenceRetriever>,
        channel: Arc<dyn MessageChannel>,
        audit: Arc<AuditWriter>,
        property_id: Option<i64>,
    ) -> Self {
        Self {
            evidence,
            channel,
            audit,
            property_id,
            budget: DEFAULT_DECISION_BUDGET,
        }
    }

    /// Time allowed for retrieving the tamper snapshot
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Open a tamper alert
    ///
    /// The acknowledgement is published before the alert is persisted.
    pub async fn handle(&self, event: &TamperEvent) -> EngineResult<TamperLogEntry> {
        let snapshot = match &event.snapshot_key {
            Some(key) => match timeout(self.budget, self.evidence.fetch(key, EvidenceCategory::Tamper)).await {
                Ok(evidence) => evidence.reference(),
                Err(_) => {
                    tracing::warn!(key = %key, "Tamper snapshot retrieval exceeded budget");
                    None
                }
            },
            None => None,
        };

        let entry = TamperLogEntry {
            id: Uuid::new_v4().to_string(),
            property_id: self.property_id,
            snapshot,
            status: TamperStatus::Open,
            triggered_at: event.triggered_at,
            created_at: Utc::now(),
        };

        tracing::warn!(
            tamper_id = %entry.id,
            property_id = ?entry.property_id,
            snapshot = ?entry.snapshot,
            "Tamper detected"
        );

        let ack = serde_json::to_value(TamperAck::new(entry.id.clone()))?;
        if let Err(e) = self.channel.publish(ack).await {
            tracing::error!(tamper_id = %entry.id, error = %e, "Failed to publish tamper ack");
        }

        let _ = self.audit.record_tamper(&entry).await;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hostlock_bus::{LiveStream, LocalChannel};
    use hostlock_evidence::MemoryBlobStore;
    use hostlock_store::Store;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tamper_opens_alert_with_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = Store::in_memory().await.unwrap();
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("TAMPER_1.jpg", b"t".to_vec());
        let channel = Arc::new(LocalChannel::new("door"));
        let mut sub = channel.subscribe();
        let handler = TamperHandler::new(
            Arc::new(EvidenceRetriever::new(blobs, dir.path())),
            channel.clone(),
            Arc::new(AuditWriter::new(Arc::new(store.clone()), LiveStream::default())),
            Some(7),
        );

        let triggered_at = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let entry = handler
            .handle(&TamperEvent {
                snapshot_key: Some("TAMPER_1.jpg".to_string()),
                triggered_at,
            })
            .await
            .unwrap();

        assert_eq!(entry.status, TamperStatus::Open);
        assert_eq!(entry.snapshot.as_deref(), Some("tamper/TAMPER_1.jpg"));
        assert_eq!(entry.property_id, Some(7));
        assert_eq!(store.tamper_log(&entry.id).await.unwrap(), entry);

        let ack = sub.recv().await.unwrap();
        assert_eq!(ack["tamper_id"], entry.id.as_str());
        assert_eq!(ack["source"], "server_tamper_ack");
    }
}
