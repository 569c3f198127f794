//! Job lifecycle metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vgen_jobs_submitted_total";
    pub const JOBS_FINISHED_TOTAL: &str = "vgen_jobs_finished_total";
    pub const POLL_DURATION_SECONDS: &str = "vgen_poll_duration_seconds";
    pub const POLL_QUERIES_TOTAL: &str = "vgen_poll_queries_total";
    pub const PROMPT_ENHANCEMENTS_TOTAL: &str = "vgen_prompt_enhancements_total";
}

/// Record a submission attempt by outcome (`accepted`, `insufficient_balance`, ...).
pub fn record_submission(outcome: &'static str, tier: &'static str) {
    let labels = [("outcome", outcome), ("tier", tier)];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record a terminal poll state.
pub fn record_poll_finished(status: &'static str, queries: u32, duration_secs: f64) {
    let labels = [("status", status)];
    counter!(names::JOBS_FINISHED_TOTAL, &labels).increment(1);
    counter!(names::POLL_QUERIES_TOTAL, &labels).increment(u64::from(queries));
    histogram!(names::POLL_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record where a submitted prompt came from (`remote` or `fallback`).
pub fn record_enhancement(source: &'static str) {
    let labels = [("source", source)];
    counter!(names::PROMPT_ENHANCEMENTS_TOTAL, &labels).increment(1);
}
