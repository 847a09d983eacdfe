//! Remote blob storage seam

use async_trait::async_trait;

use crate::error::EvidenceResult;

/// Object storage holding device snapshots
///
/// Only the two calls the pipeline needs: read an object, then remove it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download the object named `key`
    async fn get(&self, key: &str) -> EvidenceResult<Vec<u8>>;

    /// Remove the object named `key`
    async fn delete(&self, key: &str) -> EvidenceResult<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}
