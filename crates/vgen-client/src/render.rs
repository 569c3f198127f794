//! Rendering service HTTP client.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use vgen_models::ReferenceImage;

use crate::error::{ClientError, ClientResult};
use crate::types::{ApiEnvelope, RecordInfo, SubmitData, SubmitRequest};

/// Configuration for the rendering client.
#[derive(Debug, Clone)]
pub struct RenderClientConfig {
    /// Base URL of the rendering API
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Max retries for status queries (submissions are never retried)
    pub max_retries: u32,
}

impl Default for RenderClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8010/api/v1/video".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl RenderClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("RENDER_API_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("RENDER_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("RENDER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Client for the remote rendering service.
pub struct RenderClient {
    http: Client,
    config: RenderClientConfig,
}

impl RenderClient {
    /// Create a new rendering client.
    pub fn new(config: RenderClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(RenderClientConfig::from_env())
    }

    /// Encode a reference image as a `data:` URI.
    pub fn image_data_uri(image: &ReferenceImage) -> String {
        format!("data:{};base64,{}", image.mime_type, BASE64.encode(&image.data))
    }

    /// Submit a generation job.
    ///
    /// Returns the response envelope as-is, including non-success
    /// application codes. Not retried: a duplicate submission would be
    /// charged twice.
    pub async fn submit(&self, request: &SubmitRequest) -> ClientResult<ApiEnvelope<SubmitData>> {
        let url = format!("{}/generate", self.config.base_url.trim_end_matches('/'));

        debug!(url = %url, model = %request.model, "Submitting generation job");

        let mut builder = self.http.post(&url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        Self::read_envelope(response).await
    }

    /// Query the status of a job.
    pub async fn record_info(&self, job_id: &str) -> ClientResult<ApiEnvelope<RecordInfo>> {
        let url = format!("{}/record-info", self.config.base_url.trim_end_matches('/'));

        self.with_retry(|| async {
            let mut builder = self.http.get(&url).query(&[("jobId", job_id)]);
            if let Some(key) = &self.config.api_key {
                builder = builder.bearer_auth(key);
            }
            let response = builder.send().await?;
            Self::read_envelope(response).await
        })
        .await
    }

    /// Decode an envelope, tolerating non-2xx statuses whose body is still an envelope.
    async fn read_envelope<T: DeserializeOwned>(response: Response) -> ClientResult<ApiEnvelope<T>> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ClientError::Http {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(ClientError::InvalidResponse(format!(
                "unexpected response body: {}",
                e
            ))),
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> ClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    warn!(
                        "Render request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationType;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RenderClient {
        let config = RenderClientConfig::default()
            .with_base_url(server.uri())
            .with_api_key("test-key");
        RenderClient::new(config).unwrap()
    }

    fn submit_request() -> SubmitRequest {
        SubmitRequest {
            prompt: "free. cat skateboarding".into(),
            model: "video-fast".into(),
            aspect_ratio: "16:9".into(),
            enable_translation: true,
            generation_type: GenerationType::TextToVideo,
            image_urls: Vec::new(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = RenderClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_image_data_uri() {
        let image = ReferenceImage::new(b"abc".to_vec(), "image/png");
        assert_eq!(RenderClient::image_data_uri(&image), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_submit_returns_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "video-fast"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "msg": "success",
                "data": {"jobId": "job-42", "status": "queued"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let envelope = client_for(&server).submit(&submit_request()).await.unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.data.unwrap().job_id.as_deref(), Some("job-42"));
    }

    #[tokio::test]
    async fn test_submit_keeps_envelope_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "code": 402,
                "msg": "Insufficient credits"
            })))
            .mount(&server)
            .await;

        let envelope = tokio_test::assert_ok!(client_for(&server).submit(&submit_request()).await);
        assert_eq!(envelope.code, 402);
    }

    #[tokio::test]
    async fn test_submit_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).submit(&submit_request()).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_record_info_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/record-info"))
            .and(query_param("jobId", "job-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": {"successFlag": 0}
            })))
            .mount(&server)
            .await;

        let envelope = client_for(&server).record_info("job-42").await.unwrap();
        assert_eq!(envelope.data.unwrap().success_flag, Some(0));
    }
}
