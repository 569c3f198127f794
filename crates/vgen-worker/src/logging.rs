//! Structured job logging utilities.
//!
//! Lifecycle events for one remote generation job, always tagged with the
//! job id and the stage that emitted them.

use tracing::{error, info, warn};
use vgen_models::JobId;

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a new job logger for a specific job and stage
    /// (e.g. "submit", "poll").
    pub fn new(job_id: &JobId, stage: &str) -> Self {
        Self {
            job_id: job_id.as_str().to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, attempt: u32, elapsed_ms: u128, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            attempt,
            elapsed_ms = elapsed_ms as u64,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job completed: {}", message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::from_string("task-42");
        let logger = JobLogger::new(&job_id, "poll");

        assert_eq!(logger.job_id, "task-42");
        assert_eq!(logger.stage, "poll");
    }

    #[test]
    fn test_job_logger_emits_at_every_stage() {
        let logger = JobLogger::new(&JobId::from_string("task-7"), "submit");

        logger.log_start("queued");
        logger.log_progress(3, 1_500, "still running");
        logger.log_warning("slow");
        logger.log_error("failed");
        logger.log_completion("done");
    }
}
