//! Token cost of a generation.
//!
//! The core never debits a balance itself; the cost is handed to the caller
//! together with the generated-video record.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ResolutionTier;

/// Tokens charged for a standard-tier generation.
pub const STANDARD_GENERATION_COST: u32 = 10;
/// Tokens charged for a high-tier generation.
pub const HIGH_GENERATION_COST: u32 = 20;

/// Cost breakdown for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationCost {
    pub tier: ResolutionTier,
    pub tokens: u32,
}

impl GenerationCost {
    pub fn for_tier(tier: ResolutionTier) -> Self {
        let tokens = match tier {
            ResolutionTier::Standard => STANDARD_GENERATION_COST,
            ResolutionTier::High => HIGH_GENERATION_COST,
        };
        Self { tier, tokens }
    }

    /// Human-readable description for balance history.
    ///
    /// Format: "Video generation (high) - 20 tokens"
    pub fn to_description(&self) -> String {
        format!("Video generation ({}) - {} tokens", self.tier, self.tokens)
    }
}
