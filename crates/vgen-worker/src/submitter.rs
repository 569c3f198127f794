//! Generation job submission.
//!
//! Maps a finalized prompt onto the rendering service's submission call and
//! classifies the response. Submissions are never retried here; a duplicate
//! would be charged twice.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use vgen_client::{
    ApiEnvelope, ClientError, ClientResult, GenerationType, RecordInfo, RenderClient, SubmitData,
    SubmitRequest,
};
use vgen_models::{AspectRatio, JobHandle, JobId, ReferenceImage, ResolutionTier};

use crate::config::ModelConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// Application code (and HTTP status) meaning the account cannot pay.
pub const INSUFFICIENT_BALANCE_CODE: i64 = 402;

/// Remote rendering service.
#[async_trait]
pub trait RenderService: Send + Sync {
    /// Submit a job; the envelope is returned unclassified.
    async fn submit(&self, request: &SubmitRequest) -> ClientResult<ApiEnvelope<SubmitData>>;

    /// Query one job's status.
    async fn status(&self, job_id: &JobId) -> ClientResult<ApiEnvelope<RecordInfo>>;
}

#[async_trait]
impl RenderService for RenderClient {
    async fn submit(&self, request: &SubmitRequest) -> ClientResult<ApiEnvelope<SubmitData>> {
        RenderClient::submit(self, request).await
    }

    async fn status(&self, job_id: &JobId) -> ClientResult<ApiEnvelope<RecordInfo>> {
        self.record_info(job_id.as_str()).await
    }
}

/// Submits generation jobs.
#[derive(Clone)]
pub struct JobSubmitter {
    service: Arc<dyn RenderService>,
    models: ModelConfig,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn RenderService>, models: ModelConfig) -> Self {
        Self { service, models }
    }

    /// Wire payload for one submission.
    pub fn build_request(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        tier: ResolutionTier,
        reference_image: Option<&ReferenceImage>,
    ) -> SubmitRequest {
        let (generation_type, image_urls) = match reference_image {
            Some(image) => (
                GenerationType::ReferenceToVideo,
                vec![RenderClient::image_data_uri(image)],
            ),
            None => (GenerationType::TextToVideo, Vec::new()),
        };

        SubmitRequest {
            prompt: prompt.to_string(),
            model: self.models.model_for(tier).to_string(),
            aspect_ratio: aspect_ratio.as_str().to_string(),
            enable_translation: true,
            generation_type,
            image_urls,
        }
    }

    /// Submit and return the job handle.
    pub async fn submit(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        tier: ResolutionTier,
        reference_image: Option<&ReferenceImage>,
    ) -> WorkerResult<JobHandle> {
        let request = self.build_request(prompt, aspect_ratio, tier, reference_image);
        info!(
            model = %request.model,
            aspect_ratio = %request.aspect_ratio,
            generation_type = ?request.generation_type,
            "Submitting generation job"
        );

        let classified = classify_submission(self.service.submit(&request).await);
        match &classified {
            Ok(handle) => {
                metrics::record_submission("accepted", tier.as_str());
                info!(job_id = %handle.id(), "Generation job accepted");
            }
            Err(e) => {
                metrics::record_submission(outcome_label(e), tier.as_str());
                warn!(error = %e, "Generation job not accepted");
            }
        }
        classified
    }
}

impl std::fmt::Debug for JobSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSubmitter")
            .field("models", &self.models)
            .finish()
    }
}

/// Turn a raw submission response into a handle or a typed failure.
pub fn classify_submission(response: ClientResult<ApiEnvelope<SubmitData>>) -> WorkerResult<JobHandle> {
    let envelope = match response {
        Ok(envelope) => envelope,
        Err(ClientError::Http { status, body }) if i64::from(status) == INSUFFICIENT_BALANCE_CODE => {
            let message = if body.trim().is_empty() {
                "insufficient balance".to_string()
            } else {
                body
            };
            return Err(WorkerError::insufficient_balance(message));
        }
        Err(e) => return Err(WorkerError::Client(e)),
    };

    if envelope.code == INSUFFICIENT_BALANCE_CODE {
        return Err(WorkerError::insufficient_balance(envelope.message()));
    }
    if !envelope.is_success() {
        return Err(WorkerError::remote_rejected(envelope.code, envelope.message()));
    }

    envelope
        .data
        .and_then(|d| d.job_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(JobHandle::new)
        .ok_or_else(|| WorkerError::malformed("success response without a job id"))
}

fn outcome_label(error: &WorkerError) -> &'static str {
    match error {
        WorkerError::InsufficientBalance(_) => "insufficient_balance",
        WorkerError::RemoteRejected { .. } => "rejected",
        WorkerError::MalformedResponse(_) => "malformed",
        _ => "transport",
    }
}
