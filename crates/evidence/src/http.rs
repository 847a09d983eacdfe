//! HTTP object storage backend
//!
//! Objects live at `{base_url}/{key}`; GET downloads, DELETE removes.
//! Each `/`-separated segment of the key is percent-encoded.
//! Works against any S3-compatible gateway that accepts plain requests
//! (pre-signed or proxied).

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::blob::BlobStore;
use crate::error::{EvidenceError, EvidenceResult};

pub struct HttpBlobStore {
    client: Client,
    base_url: Url,
}

impl HttpBlobStore {
    pub fn new(base_url: &str) -> EvidenceResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> EvidenceResult<Self> {
        let invalid = || EvidenceError::InvalidEndpoint {
            url: base_url.to_string(),
        };
        let base_url = Url::parse(base_url).map_err(|_| invalid())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self { client, base_url })
    }

    fn url(&self, key: &str) -> EvidenceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EvidenceError::InvalidEndpoint {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(key.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn check(status: StatusCode, key: &str) -> EvidenceResult<()> {
        if status == StatusCode::NOT_FOUND {
            return Err(EvidenceError::not_found(key));
        }
        if !status.is_success() {
            return Err(EvidenceError::Http {
                status: status.as_u16(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> EvidenceResult<Vec<u8>> {
        let response = self.client.get(self.url(key)?).send().await?;
        Self::check(response.status(), key)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, key: &str) -> EvidenceResult<()> {
        let response = self.client.delete(self.url(key)?).send().await?;
        Self::check(response.status(), key)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(store: &HttpBlobStore, key: &str) -> String {
        store.url(key).unwrap().to_string()
    }

    #[test]
    fn test_url_join() {
        let store = HttpBlobStore::new("http://blobs.local/bucket/").unwrap();
        assert_eq!(url(&store, "snap.jpg"), "http://blobs.local/bucket/snap.jpg");
        assert_eq!(url(&store, "/snap.jpg"), "http://blobs.local/bucket/snap.jpg");
        assert_eq!(
            url(&store, "uploads/2024/snap.jpg"),
            "http://blobs.local/bucket/uploads/2024/snap.jpg"
        );

        let bare = HttpBlobStore::new("http://blobs.local").unwrap();
        assert_eq!(url(&bare, "snap.jpg"), "http://blobs.local/snap.jpg");
    }

    #[test]
    fn test_url_escapes_key_segments() {
        let store = HttpBlobStore::new("http://blobs.local/bucket").unwrap();
        assert_eq!(
            url(&store, "front door/snap 1.jpg"),
            "http://blobs.local/bucket/front%20door/snap%201.jpg"
        );
        assert_eq!(
            url(&store, "a?b#c.jpg"),
            "http://blobs.local/bucket/a%3Fb%23c.jpg"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            HttpBlobStore::new("not a url"),
            Err(EvidenceError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            HttpBlobStore::new("mailto:blobs@local"),
            Err(EvidenceError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(HttpBlobStore::check(StatusCode::OK, "k").is_ok());
        assert!(HttpBlobStore::check(StatusCode::NO_CONTENT, "k").is_ok());
        assert!(HttpBlobStore::check(StatusCode::NOT_FOUND, "k")
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            HttpBlobStore::check(StatusCode::FORBIDDEN, "k"),
            Err(EvidenceError::Http { status: 403, .. })
        ));
    }
}
