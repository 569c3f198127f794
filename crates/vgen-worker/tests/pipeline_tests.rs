//! End-to-end pipeline tests against mocked remote services.

use std::time::Duration;

use serde_json::json;
use tokio_test::assert_ok;
use vgen_client::{CompletionConfig, RenderClientConfig};
use vgen_media::{CompositeOptions, EncoderEngine, SharedEncoder, WatermarkConfig};
use vgen_models::{AspectRatio, GenerationRequest, Orientation, ResolutionTier};
use vgen_worker::{
    DownloadService, GenerationPipeline, LoggingRecordSink, PollConfig, Remediation, WorkerConfig,
    WorkerError,
};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_poll() -> PollConfig {
    PollConfig {
        base_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(20),
        backoff_factor: 1.2,
        timeout: Duration::from_secs(5),
    }
}

fn config_for(render: &MockServer, completion: Option<&MockServer>) -> WorkerConfig {
    let completion = match completion {
        Some(server) => CompletionConfig::default()
            .with_base_url(server.uri())
            .with_api_key("completion-key"),
        None => CompletionConfig::default(),
    };

    WorkerConfig {
        completion,
        render: RenderClientConfig::default()
            .with_base_url(render.uri())
            .with_api_key("render-key"),
        poll: fast_poll(),
        ..WorkerConfig::default()
    }
}

async fn mount_status_sequence(server: &MockServer, job_id: &str) {
    Mock::given(method("GET"))
        .and(path("/record-info"))
        .and(query_param("jobId", job_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": {"taskId": job_id, "successFlag": 0}
        })))
        .up_to_n_times(2)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/record-info"))
        .and(query_param("jobId", job_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": {
                "taskId": job_id,
                "successFlag": 1,
                "response": {"resultUrls": [format!("https://cdn.example/{}.mp4", job_id)]}
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unconfigured_enhancer_submits_free_prompt() {
    let render = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "prompt": "free. cat skateboarding",
            "aspectRatio": "16:9"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": {"taskId": "job-cat"}
        })))
        .expect(1)
        .mount(&render)
        .await;
    mount_status_sequence(&render, "job-cat").await;

    let pipeline = GenerationPipeline::from_config(&config_for(&render, None)).unwrap();
    let outcome = pipeline
        .generate_for_user(
            "user-1",
            &GenerationRequest::new("cat skateboarding"),
            &LoggingRecordSink,
        )
        .await
        .unwrap();

    assert!(outcome.enhancement.is_fallback());
    assert_eq!(outcome.handle.id().as_str(), "job-cat");
    assert_eq!(
        outcome.result.locators().to_vec(),
        vec!["https://cdn.example/job-cat.mp4".to_string()]
    );
}

#[tokio::test]
async fn test_remote_enhancement_is_submitted() {
    let render = MockServer::start().await;
    let completion = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"final_prompt\": \"A tabby cat carves down a sunlit ramp\"}"
                }
            }]
        })))
        .expect(1)
        .mount(&completion)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "prompt": "A tabby cat carves down a sunlit ramp",
            "aspectRatio": "9:16",
            "model": "veo3"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"taskId": "job-remote"}
        })))
        .expect(1)
        .mount(&render)
        .await;
    mount_status_sequence(&render, "job-remote").await;

    let request = GenerationRequest::new("cat skateboarding")
        .with_theme("summer")
        .with_aspect_ratio(AspectRatio::Portrait)
        .with_tier(ResolutionTier::High);

    let pipeline = GenerationPipeline::from_config(&config_for(&render, Some(&completion))).unwrap();
    let outcome = pipeline.generate(&request).await.unwrap();

    assert!(!outcome.enhancement.is_fallback());
    assert_eq!(outcome.submitted_prompt(), "A tabby cat carves down a sunlit ramp");
}

#[tokio::test]
async fn test_insufficient_balance_is_not_a_rejection() {
    let render = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({"prompt": "free. broke"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 402,
            "msg": "Credits insufficient"
        })))
        .mount(&render)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({"prompt": "free. flagged"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 400,
            "msg": "prompt violates content policy"
        })))
        .mount(&render)
        .await;
    Mock::given(method("GET"))
        .and(path("/record-info"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&render)
        .await;

    let pipeline = GenerationPipeline::from_config(&config_for(&render, None)).unwrap();

    let balance = pipeline
        .generate(&GenerationRequest::new("broke"))
        .await
        .unwrap_err();
    assert!(balance.is_insufficient_balance());
    assert_eq!(balance.remediation(), Remediation::TopUp);

    let rejected = pipeline
        .generate(&GenerationRequest::new("flagged"))
        .await
        .unwrap_err();
    assert!(matches!(
        rejected,
        WorkerError::RemoteRejected { code: 400, ref message } if message.contains("content policy")
    ));
    assert_ne!(rejected.remediation(), Remediation::TopUp);
}

#[tokio::test]
async fn test_remote_generation_failure_surfaces_message() {
    let render = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {"taskId": "job-bad"}
        })))
        .mount(&render)
        .await;
    Mock::given(method("GET"))
        .and(path("/record-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {
                "taskId": "job-bad",
                "successFlag": 3,
                "errorMessage": "safety filter triggered"
            }
        })))
        .mount(&render)
        .await;

    let pipeline = GenerationPipeline::from_config(&config_for(&render, None)).unwrap();
    let err = pipeline
        .generate(&GenerationRequest::new("anything"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkerError::JobFailed { ref message, .. } if message == "safety filter triggered"
    ));
}

#[tokio::test]
async fn test_download_without_encoder_keeps_original() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos/job-cat.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"original-bytes".to_vec()))
        .mount(&server)
        .await;

    let config = WorkerConfig {
        watermark: WatermarkConfig::default().with_image_path(dir.path().join("missing.png")),
        download_dir: dir.path().join("downloads"),
        ..WorkerConfig::default()
    };
    let encoder = SharedEncoder::preloaded(EncoderEngine::with_paths(
        "/nonexistent/ffmpeg",
        "/nonexistent/ffprobe",
    ));
    let service = DownloadService::from_config(&config, encoder);

    let locator = format!("{}/videos/job-cat.mp4?sig=abc", server.uri());
    let options = CompositeOptions::new(ResolutionTier::Standard, AspectRatio::Portrait);
    let outcome = assert_ok!(service.download(&locator, &options).await);

    assert!(!outcome.watermark_applied);
    assert_eq!(outcome.orientation, Orientation::Portrait);
    assert_eq!(outcome.path, dir.path().join("downloads").join("job-cat.mp4"));
    assert_eq!(std::fs::read(&outcome.path).unwrap(), b"original-bytes");
    assert!(!outcome.log.is_empty());
}

#[tokio::test]
async fn test_download_of_missing_remote_fails() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = WorkerConfig {
        download_dir: dir.path().to_path_buf(),
        ..WorkerConfig::default()
    };
    let service = DownloadService::from_config(&config, SharedEncoder::new());

    let err = service
        .download(&format!("{}/gone.mp4", server.uri()), &CompositeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::DownloadFailed(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
