//! Service configuration
//!
//! Loaded from an optional TOML file, then overridden by `HOSTLOCK_*`
//! environment variables. Every field has a default except the channel
//! credentials, which must be supplied before the service will start.

use hostlock_core::FACE_CONFIRMED_CONFIDENCE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Channel name or keys absent: refuse to run half-configured
    #[error("missing channel credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostlockConfig {
    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub evidence: EvidenceConfig,

    #[serde(default)]
    pub face: FaceConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub live: LiveConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Property served by this door controller; tagged on tamper alerts
    #[serde(default)]
    pub property_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub publish_key: String,

    #[serde(default)]
    pub subscribe_key: String,

    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Messages buffered per subscriber
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

/// Where device snapshots are uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobBackend {
    /// A local directory acting as the bucket
    #[default]
    Dir,
    /// Object gateway reachable over HTTP
    Http,
    /// In-process, for dry runs
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default)]
    pub backend: BlobBackend,

    #[serde(default = "default_bucket_dir")]
    pub bucket_dir: PathBuf,

    /// Base URL for the `http` backend
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Root of the local `fob/` and `tamper/` namespaces
    #[serde(default = "default_image_root")]
    pub image_root: PathBuf,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Comparison service; face checks are skipped when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Minimum similarity (percent) counted as a match
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Confidence recorded when the face is confirmed
    #[serde(default = "default_confirmed_confidence")]
    pub confirmed_confidence: f64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Directory relative reference image paths are resolved against
    #[serde(default)]
    pub reference_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Messages processed concurrently
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Upper bound on handling one message
    #[serde(default = "default_message_budget_ms")]
    pub message_budget_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Events a dashboard may fall behind before losing the oldest
    #[serde(default = "default_live_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_user_id() -> String {
    "hostlock-server".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

fn default_database_url() -> String {
    "sqlite:hostlock.db".to_string()
}

fn default_bucket_dir() -> PathBuf {
    PathBuf::from("bucket")
}

fn default_image_root() -> PathBuf {
    PathBuf::from("images")
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_similarity_threshold() -> f32 {
    85.0
}

fn default_confirmed_confidence() -> f64 {
    FACE_CONFIRMED_CONFIDENCE
}

fn default_max_in_flight() -> usize {
    16
}

fn default_message_budget_ms() -> u64 {
    20_000
}

fn default_live_capacity() -> usize {
    100
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            publish_key: String::new(),
            subscribe_key: String::new(),
            user_id: default_user_id(),
            capacity: default_channel_capacity(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            bucket_dir: default_bucket_dir(),
            endpoint: None,
            image_root: default_image_root(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            similarity_threshold: default_similarity_threshold(),
            confirmed_confidence: default_confirmed_confidence(),
            timeout_ms: default_timeout_ms(),
            reference_root: None,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            message_budget_ms: default_message_budget_ms(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            capacity: default_live_capacity(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl HostlockConfig {
    /// Load from a TOML file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load from TOML text
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `HOSTLOCK_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str, target: &mut String| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };
        set("HOSTLOCK_CHANNEL", &mut self.channel.name);
        set("HOSTLOCK_PUBLISH_KEY", &mut self.channel.publish_key);
        set("HOSTLOCK_SUBSCRIBE_KEY", &mut self.channel.subscribe_key);
        set("HOSTLOCK_USER_ID", &mut self.channel.user_id);
        set("HOSTLOCK_DATABASE_URL", &mut self.storage.database_url);
        set("HOSTLOCK_BIND", &mut self.http.bind);

        if let Some(dir) = lookup("HOSTLOCK_BUCKET_DIR") {
            self.evidence.bucket_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("HOSTLOCK_IMAGE_ROOT") {
            self.evidence.image_root = PathBuf::from(root);
        }
        if let Some(endpoint) = lookup("HOSTLOCK_BLOB_ENDPOINT") {
            self.evidence.endpoint = Some(endpoint);
            self.evidence.backend = BlobBackend::Http;
        }
        if let Some(endpoint) = lookup("HOSTLOCK_FACE_ENDPOINT") {
            self.face.endpoint = Some(endpoint);
        }
        if let Some(raw) = lookup("HOSTLOCK_PROPERTY_ID") {
            let id = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("HOSTLOCK_PROPERTY_ID is not an integer: {raw}"))
            })?;
            self.property_id = Some(id);
        }
        Ok(())
    }

    /// Check the configuration is complete enough to start
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.name.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("channel name"));
        }
        if self.channel.publish_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("publish key"));
        }
        if self.channel.subscribe_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("subscribe key"));
        }
        if self.evidence.backend == BlobBackend::Http && self.evidence.endpoint.is_none() {
            return Err(ConfigError::Validation(
                "evidence backend 'http' requires an endpoint".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.face.similarity_threshold) {
            return Err(ConfigError::Validation(format!(
                "similarity threshold must be within 0..=100, got {}",
                self.face.similarity_threshold
            )));
        }
        if self.dispatcher.max_in_flight == 0 {
            return Err(ConfigError::Validation(
                "dispatcher.max_in_flight must be at least 1".to_string(),
            ));
        }
        for (name, millis) in [
            ("evidence.timeout_ms", self.evidence.timeout_ms),
            ("face.timeout_ms", self.face.timeout_ms),
            ("dispatcher.message_budget_ms", self.dispatcher.message_budget_ms),
        ] {
            if millis == 0 {
                return Err(ConfigError::Validation(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }

    pub fn evidence_timeout(&self) -> Duration {
        Duration::from_millis(self.evidence.timeout_ms)
    }

    pub fn face_timeout(&self) -> Duration {
        Duration::from_millis(self.face.timeout_ms)
    }

    pub fn message_budget(&self) -> Duration {
        Duration::from_millis(self.dispatcher.message_budget_ms)
    }
}
