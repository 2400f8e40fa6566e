//! `FaceService` backed by an inference sidecar.
//!
//! Decoding is local (format sniffing only); liveness and embedding extraction
//! are delegated to `POST {base}/liveness` and `POST {base}/embedding`, both
//! taking the raw capture as the request body.

pub mod decode;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

use crate::gate::services::{Embedding, FaceError, FaceImage, FaceService, Liveness};
use crate::APP_USER_AGENT;

const DEFAULT_REJECT_REASON: &str = "liveness check failed";

#[derive(Clone, Debug, PartialEq)]
pub struct FaceServiceConfig {
    pub url: String,
    pub timeout: Duration,
    pub similarity_threshold: f32,
    /// Expected embedding length; `0` accepts any.
    pub embedding_dim: usize,
}

#[derive(Debug, Deserialize)]
struct LivenessResponse {
    #[serde(alias = "live")]
    is_live: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug)]
pub struct RemoteFaceService {
    client: Client,
    liveness_url: Url,
    embedding_url: Url,
    similarity_threshold: f32,
    embedding_dim: usize,
}

/// Resolve `endpoint` under `base`, keeping any path prefix on the base URL.
///
/// # Errors
/// Returns an error if the URL is malformed, has no host, or is not http/https.
pub fn endpoint_url(base: &str, endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Error parsing URL: {base}"))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
    }

    if url.host().is_none() {
        return Err(anyhow!("Error parsing URL: no host specified"));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    let endpoint_url = url.join(endpoint.trim_start_matches('/'))?;

    debug!("endpoint URL: {}", endpoint_url);

    Ok(endpoint_url)
}

impl RemoteFaceService {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &FaceServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build face service client")?;

        Ok(Self {
            client,
            liveness_url: endpoint_url(&config.url, "liveness")?,
            embedding_url: endpoint_url(&config.url, "embedding")?,
            similarity_threshold: config.similarity_threshold,
            embedding_dim: config.embedding_dim,
        })
    }

    async fn post_image(&self, url: &Url, image: &FaceImage) -> Result<Response, FaceError> {
        let response = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, image.format().mime())
            .body(image.bytes().to_vec())
            .send()
            .await
            .map_err(|e| {
                error!("Face service request failed: {}", e);

                FaceError::Unavailable(e.to_string())
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body["detail"].as_str().map(str::to_string))
            .unwrap_or_default();

        error!("Face service returned {}: {}", status, detail);

        Err(rejection(status, detail))
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), FaceError> {
        if self.embedding_dim == 0 || embedding.dim() == self.embedding_dim {
            Ok(())
        } else {
            Err(FaceError::InvalidEmbedding(format!(
                "expected {} dimensions, got {}",
                self.embedding_dim,
                embedding.dim()
            )))
        }
    }
}

fn rejection(status: StatusCode, detail: String) -> FaceError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => FaceError::InvalidImage(
            if detail.is_empty() {
                "rejected by face service".to_string()
            } else {
                detail
            },
        ),
        _ => FaceError::Unavailable(format!("{status}, {detail}")),
    }
}

impl From<LivenessResponse> for Liveness {
    fn from(response: LivenessResponse) -> Self {
        match (response.is_live, response.reason) {
            (true, reason) => Self {
                is_live: true,
                reason: reason.unwrap_or_else(|| Self::live().reason),
            },
            (false, reason) => {
                Self::rejected(reason.unwrap_or_else(|| DEFAULT_REJECT_REASON.to_string()))
            }
        }
    }
}

#[async_trait]
impl FaceService for RemoteFaceService {
    async fn decode(&self, bytes: &[u8]) -> Result<FaceImage, FaceError> {
        decode::decode(bytes)
    }

    #[instrument(skip(self, image), fields(format = ?image.format()))]
    async fn check_liveness(&self, image: &FaceImage) -> Result<Liveness, FaceError> {
        let response = self.post_image(&self.liveness_url, image).await?;
        let body: LivenessResponse = response
            .json()
            .await
            .map_err(|e| FaceError::Unavailable(format!("invalid liveness response: {e}")))?;

        Ok(body.into())
    }

    #[instrument(skip(self, image), fields(format = ?image.format()))]
    async fn embedding(&self, image: &FaceImage) -> Result<Option<Embedding>, FaceError> {
        let response = self.post_image(&self.embedding_url, image).await?;
        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| FaceError::Unavailable(format!("invalid embedding response: {e}")))?;

        let Some(values) = body.embedding else {
            return Ok(None);
        };

        let embedding = Embedding::new(values)?;
        self.check_dimension(&embedding)?;
        Ok(Some(embedding))
    }

    fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }
}
