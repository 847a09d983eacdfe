//! Comparison service seam

use async_trait::async_trait;

use crate::error::FaceResult;

/// Black-box face comparison
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    /// Similarity of the best face match between two images, in percent (0-100)
    ///
    /// No face found in either image is a similarity of 0, not an error.
    async fn similarity(&self, probe: &[u8], reference: &[u8]) -> FaceResult<f32>;

    /// Service name for logs
    fn name(&self) -> &'static str;
}
