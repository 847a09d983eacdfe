//! HTTP face comparison service
//!
//! ```text
//! POST {endpoint}
//! { "source_image": "<base64>", "target_image": "<base64>" }
//!
//! 200 { "face_matches": [ { "similarity": 97.4 } ] }
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{FaceError, FaceResult};
use crate::matcher::FaceMatcher;

#[derive(Debug, Serialize)]
struct CompareRequest {
    source_image: String,
    target_image: String,
}

#[derive(Debug, Default, Deserialize)]
struct CompareResponse {
    #[serde(default)]
    face_matches: Vec<FaceMatchEntry>,
}

#[derive(Debug, Deserialize)]
struct FaceMatchEntry {
    similarity: f32,
}

impl CompareResponse {
    fn best(&self) -> f32 {
        self.face_matches
            .iter()
            .map(|m| m.similarity)
            .fold(0.0, f32::max)
    }
}

pub struct HttpFaceMatcher {
    client: Client,
    endpoint: String,
}

impl HttpFaceMatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl FaceMatcher for HttpFaceMatcher {
    async fn similarity(&self, probe: &[u8], reference: &[u8]) -> FaceResult<f32> {
        let request = CompareRequest {
            source_image: STANDARD.encode(probe),
            target_image: STANDARD.encode(reference),
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FaceError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompareResponse = response.json().await?;
        Ok(body.best())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
