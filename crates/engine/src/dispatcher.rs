//! Event dispatcher
//!
//! Single subscriber on the message channel. The receive loop only
//! filters, fans out and spawns: every accepted message is handled in its
//! own task, bounded by a semaphore, so a slow download or face comparison
//! never holds up delivery. The per-message budget bounds the external
//! steps only: a reply to the door and the audit write always follow.

use chrono::Utc;
use hostlock_bus::{ChannelSubscription, LiveStream};
use hostlock_core::{ChannelMessage, Envelope, LiveEvent, LogEntry, TamperLogEntry};
use hostlock_evidence::{EvidenceCategory, EvidenceRef, EvidenceRetriever};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::timeout;

use crate::decision::DecisionEngine;
use crate::error::EngineResult;
use crate::tamper::TamperHandler;

/// What handling one message produced
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Access(LogEntry),
    Tamper(TamperLogEntry),
    Image(EvidenceRef),
    /// Nothing beyond the raw fan-out
    Ignored,
}

pub struct Dispatcher {
    engine: Arc<DecisionEngine>,
    tamper: Arc<TamperHandler>,
    evidence: Arc<EvidenceRetriever>,
    live: LiveStream,
    workers: Arc<Semaphore>,
    max_in_flight: usize,
    budget: Duration,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<DecisionEngine>,
        tamper: Arc<TamperHandler>,
        evidence: Arc<EvidenceRetriever>,
        live: LiveStream,
        max_in_flight: usize,
        budget: Duration,
    ) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            engine,
            tamper,
            evidence,
            live,
            workers: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            budget,
        }
    }

    /// Filter one raw channel message
    ///
    /// Returns `None` for the server's own broadcasts and for payloads that
    /// are not JSON objects. Accepted messages are fanned out raw first.
    pub fn accept(&self, message: Value) -> Option<Envelope> {
        let envelope = match Envelope::from_value(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed channel message");
                return None;
            }
        };

        if envelope.is_self_originated() {
            tracing::debug!(origin = %envelope.origin, "Ignoring own broadcast");
            return None;
        }

        self.live.push_raw(&envelope.raw());
        Some(envelope)
    }

    /// Route an accepted message by shape and handle it
    pub async fn dispatch(&self, envelope: Envelope) -> EngineResult<DispatchOutcome> {
        match envelope.classify(Utc::now())? {
            ChannelMessage::Tap(tap) => Ok(DispatchOutcome::Access(self.engine.handle_tap(&tap).await?)),
            ChannelMessage::Tamper(event) => {
                Ok(DispatchOutcome::Tamper(self.tamper.handle(&event).await?))
            }
            ChannelMessage::Image { key } => {
                let evidence = timeout(self.budget, self.evidence.fetch(&key, EvidenceCategory::Fob))
                    .await
                    .unwrap_or_else(|_| {
                        tracing::warn!(key = %key, "Image retrieval exceeded budget");
                        EvidenceRef::Unavailable
                    });
                if let Some(file_name) = evidence.file_name() {
                    self.live.push_event(&LiveEvent::NewImage {
                        image_filename: file_name.to_string(),
                    });
                }
                Ok(DispatchOutcome::Image(evidence))
            }
            ChannelMessage::Other => Ok(DispatchOutcome::Ignored),
        }
    }

    /// Receive until the channel closes or `shutdown` flips to true,
    /// then wait for in-flight messages
    pub async fn run(
        self: Arc<Self>,
        mut subscription: ChannelSubscription,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(max_in_flight = self.max_in_flight as u64, "Dispatcher started");

        loop {
            let message = tokio::select! {
                message = subscription.recv() => message,
                _ = shutdown.changed() => None,
            };
            let Some(message) = message else { break };

            let Some(envelope) = self.accept(message) else {
                continue;
            };

            let permit = match self.workers.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let this = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                this.process(envelope).await;
            });
        }

        // Drain: every worker holds a permit until it finishes
        let _ = self.workers.acquire_many(self.max_in_flight as u32).await;
        tracing::info!("Dispatcher stopped");
    }

    async fn process(&self, envelope: Envelope) {
        match self.dispatch(envelope).await {
            Ok(DispatchOutcome::Ignored) => tracing::debug!("Message carried nothing to act on"),
            Ok(_) => {}
            Err(e) if e.is_rejected() => tracing::warn!(error = %e, "Message rejected"),
            Err(e) => tracing::error!(error = %e, "Message processing failed"),
        }
    }
}
