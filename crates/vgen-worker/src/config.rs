//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vgen_client::{CompletionConfig, RenderClientConfig};
use vgen_media::WatermarkConfig;
use vgen_models::ResolutionTier;

/// Status polling cadence and ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the second status query
    pub base_interval: Duration,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    /// Growth applied per attempt
    pub backoff_factor: f64,
    /// Wall-clock ceiling for the whole poll
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(10),
            backoff_factor: 1.2,
            timeout: Duration::from_secs(120), // 2 minutes
        }
    }
}

impl PollConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_interval: std::env::var("POLL_BASE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_interval),
            max_interval: std::env::var("POLL_MAX_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_interval),
            backoff_factor: std::env::var("POLL_BACKOFF_FACTOR")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|f| f.is_finite() && *f >= 1.0)
                .unwrap_or(defaults.backoff_factor),
            timeout: std::env::var("POLL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Delay after the `attempt`-th status query (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt.min(64) as i32);
        let delay = self.base_interval.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_interval.as_secs_f64()))
    }
}

/// Rendering model identifier per resolution tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub standard: String,
    pub high: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            standard: "veo3_fast".to_string(),
            high: "veo3".to_string(),
        }
    }
}

impl ModelConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            standard: std::env::var("RENDER_MODEL_STANDARD")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.standard),
            high: std::env::var("RENDER_MODEL_HIGH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.high),
        }
    }

    pub fn model_for(&self, tier: ResolutionTier) -> &str {
        match tier {
            ResolutionTier::Standard => &self.standard,
            ResolutionTier::High => &self.high,
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub completion: CompletionConfig,
    pub render: RenderClientConfig,
    pub models: ModelConfig,
    pub poll: PollConfig,
    pub watermark: WatermarkConfig,
    /// Where packaged downloads are written
    pub download_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            render: RenderClientConfig::default(),
            models: ModelConfig::default(),
            poll: PollConfig::default(),
            watermark: WatermarkConfig::default(),
            download_dir: PathBuf::from("./downloads"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            completion: CompletionConfig::from_env(),
            render: RenderClientConfig::from_env(),
            models: ModelConfig::from_env(),
            poll: PollConfig::from_env(),
            watermark: WatermarkConfig::from_env(),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./downloads")),
        }
    }
}
