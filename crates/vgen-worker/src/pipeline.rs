//! End-to-end flows: generate a video, and download a watermarked copy.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use validator::Validate;
use vgen_client::{CompletionClient, RenderClient};
use vgen_media::{CompositeOptions, Compositor, OutputPackager, SharedEncoder};
use vgen_models::{
    EnhancementResult, GeneratedVideoRecord, GenerationRequest, GenerationResult, JobHandle,
    Orientation,
};

use crate::config::WorkerConfig;
use crate::enhancer::PromptEnhancer;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::poller::JobPoller;
use crate::submitter::JobSubmitter;

/// Persistence collaborator for generated videos.
#[async_trait]
pub trait VideoRecordSink: Send + Sync {
    async fn save(&self, record: GeneratedVideoRecord) -> WorkerResult<()>;
}

/// Sink that only logs the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRecordSink;

#[async_trait]
impl VideoRecordSink for LoggingRecordSink {
    async fn save(&self, record: GeneratedVideoRecord) -> WorkerResult<()> {
        info!(
            record_id = %record.id,
            user_id = %record.user_id,
            job_id = %record.job_id,
            videos = record.video_urls.len(),
            cost = %record.cost.to_description(),
            "Generated video ready to persist"
        );
        Ok(())
    }
}

/// Everything a successful generation produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub enhancement: EnhancementResult,
    pub handle: JobHandle,
    pub result: GenerationResult,
}

impl GenerationOutcome {
    /// Prompt that was sent to the rendering service.
    pub fn submitted_prompt(&self) -> &str {
        &self.enhancement.prompt
    }
}

/// Enhance → submit → poll.
#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    enhancer: PromptEnhancer,
    submitter: JobSubmitter,
    poller: JobPoller,
}

impl GenerationPipeline {
    pub fn new(enhancer: PromptEnhancer, submitter: JobSubmitter, poller: JobPoller) -> Self {
        Self {
            enhancer,
            submitter,
            poller,
        }
    }

    /// Build the pipeline with HTTP clients from `config`.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        let completion = Arc::new(CompletionClient::new(config.completion.clone())?);
        let render = Arc::new(RenderClient::new(config.render.clone())?);

        Ok(Self::new(
            PromptEnhancer::new(completion),
            JobSubmitter::new(render.clone(), config.models.clone()),
            JobPoller::new(render, config.poll.clone()),
        ))
    }

    /// Run one generation to completion.
    pub async fn generate(&self, request: &GenerationRequest) -> WorkerResult<GenerationOutcome> {
        request
            .validate()
            .map_err(|e| WorkerError::InvalidRequest(e.to_string()))?;

        let enhancement = self
            .enhancer
            .enhance(&request.prompt, &request.instructions())
            .await;
        metrics::record_enhancement(enhancement.source.as_str());
        info!(
            source = enhancement.source.as_str(),
            tier = %request.tier,
            aspect_ratio = %request.aspect_ratio,
            "Prompt finalized"
        );

        let handle = self
            .submitter
            .submit(
                &enhancement.prompt,
                request.aspect_ratio,
                request.tier,
                request.reference_image.as_ref(),
            )
            .await?;

        let result = self.poller.poll(&handle).await?;

        Ok(GenerationOutcome {
            enhancement,
            handle,
            result,
        })
    }

    /// Run one generation and hand the record to `sink`.
    pub async fn generate_for_user(
        &self,
        user_id: &str,
        request: &GenerationRequest,
        sink: &dyn VideoRecordSink,
    ) -> WorkerResult<GenerationOutcome> {
        let outcome = self.generate(request).await?;

        let record = GeneratedVideoRecord::new(
            user_id,
            request.prompt.as_str(),
            outcome.submitted_prompt(),
            request.aspect_ratio,
            request.tier,
            &outcome.result,
        );
        sink.save(record).await?;

        Ok(outcome)
    }
}

/// Where a download landed.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub watermark_applied: bool,
    pub orientation: Orientation,
    pub log: Vec<String>,
}

/// Composite → package.
#[derive(Debug, Clone)]
pub struct DownloadService {
    compositor: Compositor,
    packager: OutputPackager,
}

impl DownloadService {
    pub fn new(compositor: Compositor, packager: OutputPackager) -> Self {
        Self {
            compositor,
            packager,
        }
    }

    pub fn from_config(config: &WorkerConfig, encoder: SharedEncoder) -> Self {
        Self::new(
            Compositor::new(encoder, config.watermark.clone()),
            OutputPackager::new(&config.download_dir),
        )
    }

    /// Fetch, watermark when possible, and write into the download directory.
    pub async fn download(&self, locator: &str, options: &CompositeOptions) -> WorkerResult<DownloadOutcome> {
        let result = self
            .compositor
            .composite(locator, options)
            .await
            .ok_or_else(|| WorkerError::DownloadFailed(format!("could not fetch {}", locator)))?;

        let path = self.packager.package(result.data, &result.file_name).await?;

        Ok(DownloadOutcome {
            path,
            watermark_applied: result.watermark_applied,
            orientation: result.orientation,
            log: result.log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, PollConfig};
    use crate::enhancer::PromptCompleter;
    use crate::submitter::RenderService;
    use std::sync::Mutex;
    use vgen_client::{
        ApiEnvelope, ClientError, ClientResult, RecordInfo, RecordResponse, SubmitData,
        SubmitRequest,
    };
    use vgen_media::{EncoderEngine, WatermarkConfig};
    use vgen_models::{JobId, ResolutionTier};

    struct Offline;

    #[async_trait]
    impl PromptCompleter for Offline {
        async fn complete_json(&self, _system: &str, _user: &str) -> ClientResult<String> {
            Err(ClientError::ServiceUnavailable("offline".into()))
        }
    }

    /// Accepts every job and reports it finished on the first query.
    #[derive(Default)]
    struct InstantRender {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RenderService for InstantRender {
        async fn submit(&self, request: &SubmitRequest) -> ClientResult<ApiEnvelope<SubmitData>> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            Ok(ApiEnvelope {
                code: 200,
                msg: None,
                data: Some(SubmitData {
                    job_id: Some("job-7".into()),
                    status: None,
                }),
            })
        }

        async fn status(&self, job_id: &JobId) -> ClientResult<ApiEnvelope<RecordInfo>> {
            Ok(ApiEnvelope {
                code: 200,
                msg: None,
                data: Some(RecordInfo {
                    job_id: Some(job_id.to_string()),
                    success_flag: Some(1),
                    response: Some(RecordResponse {
                        result_urls: Some(vec!["https://cdn/job-7.mp4".into()]),
                    }),
                    ..Default::default()
                }),
            })
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<GeneratedVideoRecord>>,
    }

    #[async_trait]
    impl VideoRecordSink for CollectingSink {
        async fn save(&self, record: GeneratedVideoRecord) -> WorkerResult<()> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    fn pipeline(render: Arc<InstantRender>) -> GenerationPipeline {
        GenerationPipeline::new(
            PromptEnhancer::new(Arc::new(Offline)),
            JobSubmitter::new(render.clone(), ModelConfig::default()),
            JobPoller::new(render, PollConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_offline_enhancer_submits_fallback_prompt() {
        let render = Arc::new(InstantRender::default());
        let outcome = pipeline(render.clone())
            .generate(&GenerationRequest::new("cat skateboarding"))
            .await
            .unwrap();

        assert_eq!(outcome.submitted_prompt(), "free. cat skateboarding");
        assert!(outcome.enhancement.is_fallback());
        assert_eq!(render.prompts.lock().unwrap()[0], "free. cat skateboarding");
        assert_eq!(outcome.result.primary_locator(), "https://cdn/job-7.mp4");
    }

    #[tokio::test]
    async fn test_record_handed_to_sink() {
        let sink = CollectingSink::default();
        let request = GenerationRequest::new("a fox").with_tier(ResolutionTier::High);

        pipeline(Arc::new(InstantRender::default()))
            .generate_for_user("user-1", &request, &sink)
            .await
            .unwrap();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "user-1");
        assert_eq!(records[0].raw_prompt, "a fox");
        assert_eq!(records[0].submitted_prompt, "free. a fox");
        assert_eq!(records[0].cost.tokens, 20);
        assert_eq!(records[0].video_urls, vec!["https://cdn/job-7.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_request_never_submits() {
        let render = Arc::new(InstantRender::default());
        let err = pipeline(render.clone())
            .generate(&GenerationRequest::new(""))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::InvalidRequest(_)));
        assert!(render.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_degrades_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("job-7.mp4");
        std::fs::write(&source, b"raw-video").unwrap();

        let encoder = SharedEncoder::preloaded(EncoderEngine::with_paths(
            "/nonexistent/ffmpeg",
            "/nonexistent/ffprobe",
        ));
        let service = DownloadService::new(
            Compositor::new(
                encoder,
                WatermarkConfig::default().with_image_path(dir.path().join("none.png")),
            ),
            OutputPackager::new(dir.path().join("out")),
        );

        let outcome = service
            .download(source.to_str().unwrap(), &CompositeOptions::default())
            .await
            .unwrap();

        assert!(!outcome.watermark_applied);
        assert_eq!(outcome.path, dir.path().join("out").join("job-7.mp4"));
        assert_eq!(std::fs::read(&outcome.path).unwrap(), b"raw-video");
    }

    #[tokio::test]
    async fn test_download_unfetchable_source() {
        let dir = tempfile::tempdir().unwrap();
        let service = DownloadService::new(
            Compositor::new(SharedEncoder::new(), WatermarkConfig::default()),
            OutputPackager::new(dir.path()),
        );

        let err = service
            .download("/nonexistent/video.mp4", &CompositeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::DownloadFailed(_)));
    }
}
