//! Video generation worker.
//!
//! This crate provides:
//! - Prompt enhancement with a local fallback
//! - Job submission and status polling against the rendering service
//! - Watermarked download into a local directory
//! - Structured job logging and metrics

pub mod config;
pub mod enhancer;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod poller;
pub mod submitter;

pub use config::{ModelConfig, PollConfig, WorkerConfig};
pub use enhancer::{fallback_prompt, PromptCompleter, PromptEnhancer};
pub use error::{Remediation, WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::{
    DownloadOutcome, DownloadService, GenerationOutcome, GenerationPipeline, LoggingRecordSink,
    VideoRecordSink,
};
pub use poller::{interpret_status, JobPoller, PollState};
pub use submitter::{classify_submission, JobSubmitter, RenderService};
