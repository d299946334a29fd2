//! HTTP implementation of the scene collaborator
//!
//! Each operation is one JSON POST against the configured base URL.

use super::scene_backend::{
    BackendError, BatchGenerationRequest, BatchGenerationResponse, DecomposeRequest,
    DecomposeResponse, EvaluateRequest, MixRequest, MixResponse, RecordSink, RecordSubmission,
    RegenerationRequest, RegenerationResponse, SceneBackend,
};
use crate::models::AutomatedMetrics;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("bgm-scene/", env!("CARGO_PKG_VERSION"));
const HEALTH_TIMEOUT_SECS: u64 = 5;

const DECOMPOSE_PATH: &str = "/api/v1/decide-cues";
const GENERATE_PATH: &str = "/api/v1/generate-audio";
const REGENERATE_PATH: &str = "/api/v1/regenerate-audio";
const MIX_PATH: &str = "/api/v1/generate-audio-cues-with-audio-base64";
const EVALUATE_PATH: &str = "/api/v1/evaluate-audio";
const HEALTH_PATH: &str = "/api/v1/health";

fn build_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Network(e.to_string()))
}

async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    body: &Req,
) -> Result<Resp, BackendError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    tracing::debug!(url, "POST to collaborator");

    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(BackendError::Api(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}

/// Scene collaborator reached over HTTP
pub struct HttpSceneBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSceneBackend {
    /// `timeout` bounds every call; generation and mixing can take minutes
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http_client: build_client(timeout)?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SceneBackend for HttpSceneBackend {
    async fn decompose(
        &self,
        request: &DecomposeRequest,
    ) -> Result<DecomposeResponse, BackendError> {
        let response: DecomposeResponse =
            post_json(&self.http_client, &self.url(DECOMPOSE_PATH), request).await?;
        tracing::info!(
            cues = response.cues.len(),
            total_duration_ms = response.total_duration_ms,
            "Decomposition returned"
        );
        Ok(response)
    }

    async fn generate_batch(
        &self,
        request: &BatchGenerationRequest,
    ) -> Result<BatchGenerationResponse, BackendError> {
        let response: BatchGenerationResponse =
            post_json(&self.http_client, &self.url(GENERATE_PATH), request).await?;
        tracing::info!(
            requested = request.cues.len(),
            returned = response.audio_cues.len(),
            "Batch generation returned"
        );
        Ok(response)
    }

    async fn regenerate(
        &self,
        request: &RegenerationRequest,
    ) -> Result<RegenerationResponse, BackendError> {
        post_json(&self.http_client, &self.url(REGENERATE_PATH), request).await
    }

    async fn mix(&self, request: &MixRequest) -> Result<MixResponse, BackendError> {
        let response: MixResponse =
            post_json(&self.http_client, &self.url(MIX_PATH), request).await?;
        if response.audio_base64.trim().is_empty() {
            return Err(BackendError::MissingAudio);
        }
        Ok(response)
    }

    async fn evaluate(&self, request: &EvaluateRequest) -> Result<AutomatedMetrics, BackendError> {
        post_json(&self.http_client, &self.url(EVALUATE_PATH), request).await
    }

    async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .http_client
            .get(self.url(HEALTH_PATH))
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Api(status.as_u16(), status.to_string()));
        }
        Ok(())
    }
}

/// Record sink reached over HTTP; the response body is ignored
pub struct HttpRecordSink {
    http_client: reqwest::Client,
    url: String,
}

impl HttpRecordSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            http_client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RecordSink for HttpRecordSink {
    async fn submit(&self, record: &RecordSubmission) -> Result<(), BackendError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Api(status.as_u16(), status.to_string()));
        }
        Ok(())
    }
}
