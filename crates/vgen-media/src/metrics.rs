//! Compositing metrics.
//!
//! Recorded through the `metrics` facade; the binary decides whether a
//! recorder is installed.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const WATERMARK_TOTAL: &str = "vgen_watermark_total";
    pub const WATERMARK_DURATION_SECONDS: &str = "vgen_watermark_duration_seconds";
    pub const FFMPEG_DURATION_SECONDS: &str = "vgen_ffmpeg_duration_seconds";
}

/// Record one compositing call by outcome (`applied`, `degraded`, `fetch_failed`).
pub fn record_composite(outcome: &'static str, reason: &'static str, duration_secs: f64) {
    let labels = [("outcome", outcome), ("reason", reason)];

    counter!(names::WATERMARK_TOTAL, &labels).increment(1);
    histogram!(names::WATERMARK_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one encoder run.
pub fn record_ffmpeg(duration_secs: f64, success: bool) {
    let labels = [("success", if success { "true" } else { "false" })];
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}
