//! Shared data models for the video generation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests, prompt instructions and reference images
//! - Finalized prompts and where they came from
//! - Job handles, job status and generation results
//! - Probed video metadata and orientation
//! - Encoding configuration for the watermark re-encode
//! - Per-tier generation cost and the generated-video record

pub mod credit_cost;
pub mod encoding;
pub mod enhancement;
pub mod job;
pub mod media;
pub mod record;
pub mod request;

// Re-export common types
pub use credit_cost::GenerationCost;
pub use encoding::EncodingConfig;
pub use enhancement::{EnhancementResult, EnhancementSource};
pub use job::{GenerationResult, JobHandle, JobId, JobStatus};
pub use media::{Orientation, VideoMetadata};
pub use record::GeneratedVideoRecord;
pub use request::{
    AspectRatio, GenerationRequest, ModelParseError, PromptInstructions, ReferenceImage,
    ResolutionTier,
};
