//! Audit log writer and notifier
//!
//! One insert per entry. Only committed entries reach the live stream; a
//! failed insert is reported and returned, never retried.

use hostlock_bus::LiveStream;
use hostlock_core::{LiveEvent, LogEntry, TamperLogEntry};
use hostlock_store::AuditSink;
use std::sync::Arc;

use crate::error::EngineResult;

pub struct AuditWriter {
    sink: Arc<dyn AuditSink>,
    live: LiveStream,
}

impl AuditWriter {
    pub fn new(sink: Arc<dyn AuditSink>, live: LiveStream) -> Self {
        Self { sink, live }
    }

    pub fn live(&self) -> &LiveStream {
        &self.live
    }

    /// Persist an access log entry, then notify live subscribers
    pub async fn record_access(&self, entry: &LogEntry) -> EngineResult<i64> {
        match self.sink.insert_access_log(entry).await {
            Ok(id) => {
                self.live.push_event(&LiveEvent::from(entry));
                Ok(id)
            }
            Err(e) => {
                tracing::error!(
                    token = %entry.token,
                    decision = %entry.decision,
                    error = %e,
                    "Failed to persist access log"
                );
                Err(e.into())
            }
        }
    }

    /// Persist a tamper alert, then notify live subscribers
    pub async fn record_tamper(&self, entry: &TamperLogEntry) -> EngineResult<()> {
        match self.sink.insert_tamper_log(entry).await {
            Ok(()) => {
                self.live.push_event(&LiveEvent::from(entry));
                Ok(())
            }
            Err(e) => {
                tracing::error!(tamper_id = %entry.id, error = %e, "Failed to persist tamper log");
                Err(e.into())
            }
        }
    }
}
