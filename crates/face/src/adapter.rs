//! Threshold, timeout and fail-to-false around a [`FaceMatcher`]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{FaceError, FaceResult};
use crate::matcher::FaceMatcher;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 85.0;
pub const DEFAULT_COMPARE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FaceMatchAdapter {
    matcher: Option<Arc<dyn FaceMatcher>>,
    threshold: f32,
    timeout: Duration,
    reference_root: Option<PathBuf>,
}

impl FaceMatchAdapter {
    pub fn new(matcher: Arc<dyn FaceMatcher>) -> Self {
        Self {
            matcher: Some(matcher),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            timeout: DEFAULT_COMPARE_TIMEOUT,
            reference_root: None,
        }
    }

    /// No comparison service: every compare is a non-match
    pub fn disabled() -> Self {
        Self {
            matcher: None,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            timeout: DEFAULT_COMPARE_TIMEOUT,
            reference_root: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory relative reference paths are resolved against
    pub fn with_reference_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.reference_root = Some(root.into());
        self
    }

    pub fn is_configured(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Filesystem path of a stored reference image
    pub fn reference_path(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        match &self.reference_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Whether both images show the same person
    ///
    /// Any failure (not configured, unreadable image, service error,
    /// timeout) is reported as a non-match with a warning.
    pub async fn compare(&self, probe: &Path, reference: &Path) -> bool {
        match self.similarity(probe, reference).await {
            Ok(similarity) => {
                let matched = similarity >= self.threshold;
                tracing::debug!(
                    similarity = similarity as f64,
                    threshold = self.threshold as f64,
                    matched,
                    "Face comparison"
                );
                matched
            }
            Err(e) => {
                tracing::warn!(
                    probe = %probe.display(),
                    reference = %reference.display(),
                    error = %e,
                    "Face comparison failed, treating as no match"
                );
                false
            }
        }
    }

    /// Raw similarity with the error surfaced
    pub async fn similarity(&self, probe: &Path, reference: &Path) -> FaceResult<f32> {
        let matcher = self.matcher.as_ref().ok_or(FaceError::NotConfigured)?;

        let probe_bytes = read_image(probe).await?;
        let reference_bytes = read_image(reference).await?;

        timeout(self.timeout, matcher.similarity(&probe_bytes, &reference_bytes))
            .await
            .map_err(|_| FaceError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }
}

async fn read_image(path: &Path) -> FaceResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| FaceError::Image {
        path: path.display().to_string(),
        source,
    })
}
