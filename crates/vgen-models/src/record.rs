//! Record handed to the persistence collaborator after a successful job.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AspectRatio, GenerationCost, GenerationResult, JobId, ResolutionTier};

/// A generated video, ready to be saved by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedVideoRecord {
    /// Local record ID
    pub id: String,
    /// Owner (opaque; supplied by the identity layer)
    pub user_id: String,
    /// Remote job ID
    pub job_id: JobId,
    /// Prompt as typed by the user
    pub raw_prompt: String,
    /// Prompt actually submitted (after enhancement)
    pub submitted_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub tier: ResolutionTier,
    /// Result locators from the rendering service
    pub video_urls: Vec<String>,
    pub cost: GenerationCost,
    pub created_at: DateTime<Utc>,
}

impl GeneratedVideoRecord {
    pub fn new(
        user_id: impl Into<String>,
        raw_prompt: impl Into<String>,
        submitted_prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
        tier: ResolutionTier,
        result: &GenerationResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            job_id: result.job_id.clone(),
            raw_prompt: raw_prompt.into(),
            submitted_prompt: submitted_prompt.into(),
            aspect_ratio,
            tier,
            video_urls: result.locators().to_vec(),
            cost: GenerationCost::for_tier(tier),
            created_at: Utc::now(),
        }
    }
}
