//! Service wiring and lifecycle
//!
//! Every collaborator is constructed once in [`AccessService::start`] and
//! injected; nothing is global. The returned [`ServiceHandle`] owns the
//! dispatcher task and stops it on [`ServiceHandle::shutdown`].

use hostlock_bus::{LiveStream, LocalChannel, MessageChannel};
use hostlock_evidence::{BlobStore, DirBlobStore, EvidenceRetriever, HttpBlobStore, MemoryBlobStore};
use hostlock_face::{FaceMatchAdapter, FaceMatcher, HttpFaceMatcher};
use hostlock_store::Store;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audit::AuditWriter;
use crate::config::{BlobBackend, ConfigError, HostlockConfig};
use crate::decision::DecisionEngine;
use crate::dispatcher::Dispatcher;
use crate::error::EngineResult;
use crate::tamper::TamperHandler;

/// External collaborators the service runs against
pub struct ServiceComponents {
    pub store: Store,
    pub channel: Arc<dyn MessageChannel>,
    pub blobs: Arc<dyn BlobStore>,
    pub matcher: Option<Arc<dyn FaceMatcher>>,
}

impl ServiceComponents {
    /// Build collaborators from configuration
    pub async fn from_config(config: &HostlockConfig) -> EngineResult<Self> {
        let store = Store::connect(&config.storage.database_url).await?;

        let channel: Arc<dyn MessageChannel> = Arc::new(LocalChannel::with_capacity(
            config.channel.name.clone(),
            config.channel.capacity,
        ));

        let blobs: Arc<dyn BlobStore> = match config.evidence.backend {
            BlobBackend::Dir => Arc::new(DirBlobStore::new(&config.evidence.bucket_dir)),
            BlobBackend::Http => {
                let endpoint = config.evidence.endpoint.as_deref().ok_or_else(|| {
                    ConfigError::Validation("evidence backend 'http' requires an endpoint".to_string())
                })?;
                Arc::new(
                    HttpBlobStore::new(endpoint)
                        .map_err(|e| ConfigError::Validation(e.to_string()))?,
                )
            }
            BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
        };

        let matcher = config
            .face
            .endpoint
            .as_deref()
            .map(|endpoint| Arc::new(HttpFaceMatcher::new(endpoint)) as Arc<dyn FaceMatcher>);

        Ok(Self {
            store,
            channel,
            blobs,
            matcher,
        })
    }
}

/// The wired pipeline
pub struct AccessService {
    config: HostlockConfig,
    store: Store,
    channel: Arc<dyn MessageChannel>,
    live: LiveStream,
    evidence: Arc<EvidenceRetriever>,
    engine: Arc<DecisionEngine>,
    tamper: Arc<TamperHandler>,
    dispatcher: Arc<Dispatcher>,
}

impl AccessService {
    /// Validate `config`, build collaborators from it and start dispatching
    pub async fn start(config: HostlockConfig) -> EngineResult<ServiceHandle> {
        config.validate()?;
        let components = ServiceComponents::from_config(&config).await?;
        Self::start_with(config, components)
    }

    /// Start dispatching against the given collaborators
    pub fn start_with(config: HostlockConfig, components: ServiceComponents) -> EngineResult<ServiceHandle> {
        config.validate()?;
        let service = Arc::new(Self::wire(config, components));

        // Subscribe before spawning so nothing published after start is missed
        let subscription = service.channel.subscribe();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(service.dispatcher.clone().run(subscription, shutdown_rx));

        tracing::info!(
            channel = %service.config.channel.name,
            user_id = %service.config.channel.user_id,
            face_check = service.config.face.endpoint.is_some(),
            "Access service started"
        );

        Ok(ServiceHandle {
            service,
            shutdown,
            task,
        })
    }

    fn wire(config: HostlockConfig, components: ServiceComponents) -> Self {
        let ServiceComponents {
            store,
            channel,
            blobs,
            matcher,
        } = components;

        let live = LiveStream::new(config.live.capacity);

        if config.property_id.is_none() {
            tracing::warn!("No property_id configured, tamper alerts will have no resolving host");
        }

        let evidence = Arc::new(
            EvidenceRetriever::new(blobs, &config.evidence.image_root)
                .with_timeout(config.evidence_timeout()),
        );

        let face = match matcher {
            Some(matcher) => FaceMatchAdapter::new(matcher),
            None => {
                tracing::warn!("No face matcher configured, face checks will be skipped");
                FaceMatchAdapter::disabled()
            }
        };
        let mut face = face
            .with_threshold(config.face.similarity_threshold)
            .with_timeout(config.face_timeout());
        if let Some(root) = &config.face.reference_root {
            face = face.with_reference_root(root);
        }
        let face = Arc::new(face);

        let audit = Arc::new(AuditWriter::new(Arc::new(store.clone()), live.clone()));

        let engine = Arc::new(
            DecisionEngine::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                evidence.clone(),
                face,
                channel.clone(),
                audit.clone(),
            )
            .with_confirmed_confidence(config.face.confirmed_confidence)
            .with_budget(config.message_budget()),
        );

        let tamper = Arc::new(
            TamperHandler::new(evidence.clone(), channel.clone(), audit, config.property_id)
                .with_budget(config.message_budget()),
        );

        let dispatcher = Arc::new(Dispatcher::new(
            engine.clone(),
            tamper.clone(),
            evidence.clone(),
            live.clone(),
            config.dispatcher.max_in_flight,
            config.message_budget(),
        ));

        Self {
            config,
            store,
            channel,
            live,
            evidence,
            engine,
            tamper,
            dispatcher,
        }
    }

    pub fn config(&self) -> &HostlockConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn channel(&self) -> &Arc<dyn MessageChannel> {
        &self.channel
    }

    pub fn live(&self) -> &LiveStream {
        &self.live
    }

    pub fn evidence(&self) -> &Arc<EvidenceRetriever> {
        &self.evidence
    }

    pub fn engine(&self) -> &Arc<DecisionEngine> {
        &self.engine
    }

    pub fn tamper(&self) -> &Arc<TamperHandler> {
        &self.tamper
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

/// Running service
pub struct ServiceHandle {
    service: Arc<AccessService>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn service(&self) -> &Arc<AccessService> {
        &self.service
    }

    /// Stop receiving, finish in-flight messages, close the store
    pub async fn shutdown(self) -> EngineResult<()> {
        let _ = self.shutdown.send(true);
        self.task.await?;
        self.service.store.close().await;
        tracing::info!("Access service stopped");
        Ok(())
    }
}

impl std::ops::Deref for ServiceHandle {
    type Target = AccessService;

    fn deref(&self) -> &AccessService {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[tokio::test]
    async fn test_start_refuses_missing_credentials() {
        let result = AccessService::start(HostlockConfig::default()).await;
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::MissingCredentials(_)))
        ));
    }
}
