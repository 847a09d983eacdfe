//! HostLock Engine - the access-decision pipeline
//!
//! ```text
//! channel ─▶ Dispatcher ─▶ DecisionEngine ─▶ {index, evidence, face}
//!                │                │
//!                │                ├─▶ channel (decision)
//!                │                └─▶ AuditWriter ─▶ store, live stream
//!                └─▶ TamperHandler / image fetch
//! ```

pub mod audit;
pub mod config;
pub mod decision;
pub mod dispatcher;
pub mod error;
pub mod service;
pub mod tamper;

pub use audit::AuditWriter;
pub use config::{
    BlobBackend, ChannelConfig, ConfigError, DispatcherConfig, EvidenceConfig, FaceConfig,
    HostlockConfig, HttpConfig, LiveConfig, StorageConfig,
};
pub use decision::{DecisionEngine, Verdict};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{EngineError, EngineResult};
pub use service::{AccessService, ServiceComponents, ServiceHandle};
pub use tamper::TamperHandler;
