//! HostLock Evidence - snapshot retrieval from remote blob storage
//!
//! Backends:
//! - [`DirBlobStore`]: a directory acting as the bucket
//! - [`HttpBlobStore`]: GET/DELETE against an object gateway
//! - [`MemoryBlobStore`]: in-process map for tests

pub mod blob;
pub mod dir;
pub mod error;
pub mod http;
pub mod memory;
pub mod retriever;

pub use blob::BlobStore;
pub use dir::DirBlobStore;
pub use error::{EvidenceError, EvidenceResult};
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;
pub use retriever::{
    local_file_name, EvidenceCategory, EvidenceRef, EvidenceRetriever, DEFAULT_FETCH_TIMEOUT,
};
