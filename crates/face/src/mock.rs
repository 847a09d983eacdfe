//! Mock face matcher for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::error::{FaceError, FaceResult};
use crate::matcher::FaceMatcher;

/// Returns a configurable similarity, or fails
pub struct MockFaceMatcher {
    /// `None` makes every call fail
    similarity: RwLock<Option<f32>>,
    delay: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockFaceMatcher {
    pub fn with_similarity(similarity: f32) -> Self {
        Self {
            similarity: RwLock::new(Some(similarity)),
            delay: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every comparison matches
    pub fn matching() -> Self {
        Self::with_similarity(99.5)
    }

    /// Every comparison finds a different face
    pub fn mismatching() -> Self {
        Self::with_similarity(12.0)
    }

    /// Every comparison errors
    pub fn failing() -> Self {
        Self {
            similarity: RwLock::new(None),
            delay: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_similarity(&self, similarity: Option<f32>) {
        *self.similarity.write().unwrap_or_else(PoisonError::into_inner) = similarity;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceMatcher for MockFaceMatcher {
    async fn similarity(&self, _probe: &[u8], _reference: &[u8]) -> FaceResult<f32> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let similarity = *self.similarity.read().unwrap_or_else(PoisonError::into_inner);
        similarity.ok_or_else(|| FaceError::Unavailable("mock configured to fail".to_string()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
