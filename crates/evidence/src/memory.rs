//! In-memory blob store for tests and dry runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::blob::BlobStore;
use crate::error::{EvidenceError, EvidenceResult};

/// Blob store backed by a map
///
/// Can be switched offline or slowed down to exercise the failure paths.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    offline: AtomicBool,
    delay: RwLock<Option<Duration>>,
    gets: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object
    pub fn put(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), bytes.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every call fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of `get` calls so far
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    async fn simulate(&self, key: &str) -> EvidenceResult<()> {
        let delay = *self.delay.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(EvidenceError::Http {
                status: 503,
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> EvidenceResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.simulate(key).await?;
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| EvidenceError::not_found(key))
    }

    async fn delete(&self, key: &str) -> EvidenceResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.simulate(key).await?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| EvidenceError::not_found(key))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryBlobStore::new();
        store.put("a.jpg", b"abc".to_vec());

        assert_eq!(store.get("a.jpg").await.unwrap(), b"abc");
        store.delete("a.jpg").await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get_calls(), 1);
        assert_eq!(store.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_offline() {
        let store = MemoryBlobStore::new();
        store.put("a.jpg", b"abc".to_vec());
        store.set_offline(true);

        assert!(store.get("a.jpg").await.is_err());
        assert!(store.contains("a.jpg"));
    }
}
