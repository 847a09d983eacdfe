//! Destructive snapshot retrieval
//!
//! `fetch` downloads an object into a category namespace under the local
//! image root and then deletes it remotely. A key can be fetched at most once.
//! Failures never propagate: the caller gets [`EvidenceRef::Unavailable`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tokio::time::timeout;

use crate::blob::BlobStore;
use crate::error::{EvidenceError, EvidenceResult};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Local namespace a snapshot is written into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EvidenceCategory {
    /// Snapshots taken at tap time (and image-only uploads)
    Fob,
    /// Snapshots taken when the tamper switch fires
    Tamper,
}

/// Outcome of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceRef {
    Stored {
        category: EvidenceCategory,
        file_name: String,
        path: PathBuf,
    },
    /// Sentinel: treat as "no image available"
    Unavailable,
}

impl EvidenceRef {
    pub fn is_available(&self) -> bool {
        matches!(self, EvidenceRef::Stored { .. })
    }

    /// Reference recorded in audit logs, e.g. `fob/A1_20240105.jpg`
    pub fn reference(&self) -> Option<String> {
        match self {
            EvidenceRef::Stored {
                category,
                file_name,
                ..
            } => Some(format!("{category}/{file_name}")),
            EvidenceRef::Unavailable => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            EvidenceRef::Stored { path, .. } => Some(path),
            EvidenceRef::Unavailable => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            EvidenceRef::Stored { file_name, .. } => Some(file_name),
            EvidenceRef::Unavailable => None,
        }
    }
}

/// Local file name for a remote key: its last path segment
pub fn local_file_name(remote_key: &str) -> EvidenceResult<String> {
    let name = Path::new(remote_key.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..");

    name.map(str::to_string).ok_or_else(|| EvidenceError::InvalidKey {
        key: remote_key.to_string(),
    })
}

pub struct EvidenceRetriever {
    store: Arc<dyn BlobStore>,
    local_root: PathBuf,
    timeout: Duration,
}

impl EvidenceRetriever {
    pub fn new(store: Arc<dyn BlobStore>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            local_root: local_root.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn category_dir(&self, category: EvidenceCategory) -> PathBuf {
        self.local_root.join(category.to_string())
    }

    /// Fetch `remote_key` into `category`, degrading to the sentinel on failure
    pub async fn fetch(&self, remote_key: &str, category: EvidenceCategory) -> EvidenceRef {
        match self.try_fetch(remote_key, category).await {
            Ok(evidence) => evidence,
            Err(e) => {
                tracing::warn!(
                    key = remote_key,
                    category = %category,
                    backend = self.store.name(),
                    error = %e,
                    "Snapshot retrieval failed"
                );
                EvidenceRef::Unavailable
            }
        }
    }

    /// Fetch with the error surfaced
    pub async fn try_fetch(
        &self,
        remote_key: &str,
        category: EvidenceCategory,
    ) -> EvidenceResult<EvidenceRef> {
        let file_name = local_file_name(remote_key)?;

        let bytes = timeout(self.timeout, self.store.get(remote_key))
            .await
            .map_err(|_| self.timed_out(remote_key))??;

        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await?;

        // The local copy is the evidence now; a failed remote delete only leaks storage
        match timeout(self.timeout, self.store.delete(remote_key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(key = remote_key, error = %e, "Remote snapshot delete failed")
            }
            Err(_) => tracing::warn!(key = remote_key, "Remote snapshot delete timed out"),
        }

        tracing::info!(
            key = remote_key,
            category = %category,
            bytes = bytes.len() as u64,
            "Snapshot retrieved"
        );

        Ok(EvidenceRef::Stored {
            category,
            file_name,
            path,
        })
    }

    fn timed_out(&self, key: &str) -> EvidenceError {
        EvidenceError::Timeout {
            key: key.to_string(),
            secs: self.timeout.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_name() {
        assert_eq!(local_file_name("snap.jpg").unwrap(), "snap.jpg");
        assert_eq!(local_file_name("uploads/2024/snap.jpg").unwrap(), "snap.jpg");
        assert!(local_file_name("").is_err());
        assert!(local_file_name("uploads/..").is_err());
    }

    #[test]
    fn test_reference_format() {
        let evidence = EvidenceRef::Stored {
            category: EvidenceCategory::Tamper,
            file_name: "TAMPER_1.jpg".to_string(),
            path: PathBuf::from("/tmp/images/tamper/TAMPER_1.jpg"),
        };
        assert_eq!(evidence.reference().as_deref(), Some("tamper/TAMPER_1.jpg"));
        assert!(EvidenceRef::Unavailable.reference().is_none());
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(EvidenceCategory::Fob.to_string(), "fob");
        assert_eq!("tamper".parse::<EvidenceCategory>().unwrap(), EvidenceCategory::Tamper);
    }
}
