//! HostLock Face - face match adapter
//!
//! The recognition itself is a black box behind [`FaceMatcher`]; the
//! [`FaceMatchAdapter`] turns its similarity score into a yes/no answer and
//! never lets a failure escape.

pub mod adapter;
pub mod error;
pub mod http;
pub mod matcher;
pub mod mock;

pub use adapter::{FaceMatchAdapter, DEFAULT_COMPARE_TIMEOUT, DEFAULT_SIMILARITY_THRESHOLD};
pub use error::{FaceError, FaceResult};
pub use http::HttpFaceMatcher;
pub use matcher::FaceMatcher;
pub use mock::MockFaceMatcher;
