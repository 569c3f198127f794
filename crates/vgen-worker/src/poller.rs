//! Job status polling.
//!
//! A small state machine: a job starts `Pending` and moves to exactly one of
//! `Succeeded`, `Failed` or `TimedOut`. One status query is in flight at a
//! time; the wait between queries grows from the base interval up to the
//! cap, and every wait and query is clamped to what is left of the
//! wall-clock ceiling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use vgen_client::{ApiEnvelope, RecordInfo};
use vgen_models::{GenerationResult, JobHandle, JobStatus};

use crate::config::PollConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::submitter::{RenderService, INSUFFICIENT_BALANCE_CODE};

/// Remote `successFlag` values.
pub mod flags {
    pub const RUNNING: i64 = 0;
    pub const SUCCESS: i64 = 1;
    pub const CREATE_FAILED: i64 = 2;
    pub const GENERATE_FAILED: i64 = 3;
}

/// Consecutive transport failures logged at warn level before suppression.
const MAX_LOGGED_QUERY_FAILURES: u32 = 3;

/// Poller state.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Pending,
    Succeeded(GenerationResult),
    Failed { code: i64, message: String },
    TimedOut { elapsed: Duration },
}

impl PollState {
    pub fn status(&self) -> JobStatus {
        match self {
            PollState::Pending => JobStatus::Pending,
            PollState::Succeeded(_) => JobStatus::Succeeded,
            PollState::Failed { .. } => JobStatus::Failed,
            PollState::TimedOut { .. } => JobStatus::TimedOut,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Terminal state as the caller-facing result.
    pub fn into_result(self, handle: &JobHandle) -> WorkerResult<GenerationResult> {
        match self {
            PollState::Succeeded(result) => Ok(result),
            PollState::Failed { code, message } if code == INSUFFICIENT_BALANCE_CODE => {
                Err(WorkerError::insufficient_balance(message))
            }
            PollState::Failed { code, message } => Err(WorkerError::JobFailed { code, message }),
            PollState::TimedOut { elapsed } => Err(WorkerError::PollTimedOut {
                job_id: handle.id().to_string(),
                elapsed_secs: elapsed.as_secs(),
            }),
            PollState::Pending => Err(WorkerError::malformed("poll ended without a terminal state")),
        }
    }
}

/// Interpret one status response.
///
/// Errors only for a fatal inconsistency (success without a locator, or a
/// flag outside the known set).
pub fn interpret_status(handle: &JobHandle, envelope: ApiEnvelope<RecordInfo>) -> WorkerResult<PollState> {
    if !envelope.is_success() {
        return Ok(PollState::Failed {
            code: envelope.code,
            message: envelope.message(),
        });
    }

    let info = envelope.data.unwrap_or_default();
    match info.success_flag.unwrap_or(flags::RUNNING) {
        flags::RUNNING => Ok(PollState::Pending),
        flags::SUCCESS => GenerationResult::new(handle.id().clone(), info.result_urls())
            .map(PollState::Succeeded)
            .ok_or_else(|| WorkerError::malformed("job succeeded without a result locator")),
        flag @ (flags::CREATE_FAILED | flags::GENERATE_FAILED) => {
            let default_message = if flag == flags::CREATE_FAILED {
                "task creation failed"
            } else {
                "generation failed"
            };
            let message = info
                .error_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_message.to_string());
            Ok(PollState::Failed { code: flag, message })
        }
        other => Err(WorkerError::malformed(format!("unknown status flag {}", other))),
    }
}

/// Suppresses log spam from repeated transport failures.
#[derive(Debug, Default)]
struct QueryFailureTracker {
    consecutive_failures: u32,
}

impl QueryFailureTracker {
    fn record_success(&mut self) {
        if self.consecutive_failures > MAX_LOGGED_QUERY_FAILURES {
            debug!(
                "Status queries recovered after {} consecutive failures",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
    }

    /// Returns `true` if this failure should be logged.
    fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures <= MAX_LOGGED_QUERY_FAILURES
    }
}

/// Polls a submitted job until it reaches a terminal state.
#[derive(Clone)]
pub struct JobPoller {
    service: Arc<dyn RenderService>,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(service: Arc<dyn RenderService>, config: PollConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until success, failure or the ceiling.
    pub async fn poll(&self, handle: &JobHandle) -> WorkerResult<GenerationResult> {
        self.run(handle).await?.into_result(handle)
    }

    /// Drive the state machine to a terminal [`PollState`].
    pub async fn run(&self, handle: &JobHandle) -> WorkerResult<PollState> {
        let logger = JobLogger::new(handle.id(), "poll");
        logger.log_start(&format!(
            "polling every {:?}..{:?}, ceiling {:?}",
            self.config.base_interval, self.config.max_interval, self.config.timeout
        ));

        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut queries: u32 = 0;
        let mut failures = QueryFailureTracker::default();

        let state = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break PollState::TimedOut {
                    elapsed: started.elapsed(),
                };
            }

            queries += 1;
            match tokio::time::timeout(remaining, self.service.status(handle.id())).await {
                Err(_) => {
                    logger.log_warning("status query cut off by the poll ceiling");
                    continue;
                }
                Ok(Err(e)) => {
                    if failures.record_failure() {
                        logger.log_warning(&format!("status query {} failed: {}", queries, e));
                    }
                }
                Ok(Ok(envelope)) => {
                    failures.record_success();
                    let state = match interpret_status(handle, envelope) {
                        Ok(state) => state,
                        Err(e) => {
                            logger.log_error(&e.to_string());
                            metrics::record_poll_finished("malformed", queries, started.elapsed().as_secs_f64());
                            return Err(e);
                        }
                    };
                    if state.is_terminal() {
                        break state;
                    }
                    logger.log_progress(queries, started.elapsed().as_millis(), "still running");
                }
            }

            let delay = self
                .config
                .delay_for_attempt(queries - 1)
                .min(deadline.saturating_duration_since(Instant::now()));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        };

        let elapsed = started.elapsed();
        metrics::record_poll_finished(state.status().as_str(), queries, elapsed.as_secs_f64());
        match &state {
            PollState::Succeeded(result) => logger.log_completion(&format!(
                "{} locator(s) after {} queries",
                result.locators().len(),
                queries
            )),
            PollState::Failed { code, message } => {
                logger.log_error(&format!("remote failure {}: {}", code, message))
            }
            PollState::TimedOut { elapsed } => {
                warn!(job_id = %handle.id(), queries, elapsed_ms = elapsed.as_millis() as u64, "Poll ceiling reached");
            }
            PollState::Pending => {}
        }

        Ok(state)
    }
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use vgen_client::{ClientError, ClientResult, RecordResponse, SubmitData, SubmitRequest};
    use vgen_models::JobId;

    type StatusReply = ClientResult<ApiEnvelope<RecordInfo>>;

    fn running() -> StatusReply {
        Ok(record(200, Some(flags::RUNNING), vec![], None))
    }

    fn record(code: i64, flag: Option<i64>, urls: Vec<&str>, error: Option<&str>) -> ApiEnvelope<RecordInfo> {
        ApiEnvelope {
            code,
            msg: Some(if code == 200 { "success" } else { "rejected" }.to_string()),
            data: Some(RecordInfo {
                job_id: Some("job-1".into()),
                success_flag: flag,
                response: Some(RecordResponse {
                    result_urls: Some(urls.into_iter().map(str::to_string).collect()),
                }),
                error_code: None,
                error_message: error.map(str::to_string),
            }),
        }
    }

    /// Replies from a script, then "running" forever.
    struct Scripted {
        replies: Mutex<VecDeque<StatusReply>>,
        calls: AtomicU32,
        hang: bool,
    }

    impl Scripted {
        fn new(replies: Vec<StatusReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                hang: false,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RenderService for Scripted {
        async fn submit(&self, _request: &SubmitRequest) -> ClientResult<ApiEnvelope<SubmitData>> {
            unreachable!("poller never submits")
        }

        async fn status(&self, _job_id: &JobId) -> StatusReply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(running)
        }
    }

    fn poller(service: Arc<Scripted>) -> JobPoller {
        JobPoller::new(service, PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_running() {
        let service = Scripted::new(vec![
            running(),
            running(),
            Ok(record(200, Some(flags::SUCCESS), vec!["https://cdn/v.mp4"], None)),
        ]);
        let handle = JobHandle::new("job-1");

        let started = Instant::now();
        let result = poller(service.clone()).poll(&handle).await.unwrap();

        assert_eq!(result.locators(), ["https://cdn/v.mp4".to_string()]);
        assert_eq!(service.calls(), 3);
        // 3s + 3.6s of backoff before the third query
        let waited = started.elapsed().as_secs_f64();
        assert!((waited - 6.6).abs() < 0.01, "waited {waited}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_running_times_out_near_ceiling() {
        let service = Scripted::new(vec![]);
        let handle = JobHandle::new("job-1");

        let started = Instant::now();
        let err = poller(service.clone()).poll(&handle).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, WorkerError::PollTimedOut { elapsed_secs: 120, .. }));
        assert!(elapsed >= Duration::from_secs(120));
        assert!(elapsed <= Duration::from_secs(150), "elapsed {elapsed:?}");
        assert!(service.calls() > 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_query_is_clamped() {
        let service = Arc::new(Scripted {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            hang: true,
        });
        let handle = JobHandle::new("job-1");

        let started = Instant::now();
        let state = poller(service.clone()).run(&handle).await.unwrap();

        assert_eq!(state.status(), JobStatus::TimedOut);
        assert!(started.elapsed() <= Duration::from_secs(150));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_terminal() {
        let service = Scripted::new(vec![
            Err(ClientError::ServiceUnavailable("reset".into())),
            Ok(record(200, Some(flags::SUCCESS), vec!["https://cdn/a.mp4"], None)),
        ]);
        let handle = JobHandle::new("job-1");

        let result = poller(service.clone()).poll(&handle).await.unwrap();
        assert_eq!(result.primary_locator(), "https://cdn/a.mp4");
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_keeps_message() {
        let service = Scripted::new(vec![Ok(record(
            200,
            Some(flags::GENERATE_FAILED),
            vec![],
            Some("content policy violation"),
        ))]);
        let handle = JobHandle::new("job-1");

        let err = poller(service).poll(&handle).await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::JobFailed { code: 3, ref message } if message == "content policy violation"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_without_locator_is_fatal() {
        let service = Scripted::new(vec![Ok(record(200, Some(flags::SUCCESS), vec![""], None))]);
        let handle = JobHandle::new("job-1");

        let err = poller(service.clone()).poll(&handle).await.unwrap_err();
        assert!(matches!(err, WorkerError::MalformedResponse(_)));
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn test_interpret_status() {
        let handle = JobHandle::new("job-1");

        let state = interpret_status(&handle, record(200, Some(flags::CREATE_FAILED), vec![], None)).unwrap();
        assert_eq!(
            state,
            PollState::Failed {
                code: 2,
                message: "task creation failed".into()
            }
        );

        let rejected = interpret_status(&handle, record(500, None, vec![], None)).unwrap();
        assert_eq!(rejected.status(), JobStatus::Failed);

        let balance = interpret_status(&handle, record(402, None, vec![], None))
            .unwrap()
            .into_result(&handle)
            .unwrap_err();
        assert!(balance.is_insufficient_balance());

        assert!(interpret_status(&handle, record(200, Some(9), vec![], None)).is_err());
        assert_eq!(
            interpret_status(&handle, record(200, None, vec![], None)).unwrap(),
            PollState::Pending
        );
    }
}
