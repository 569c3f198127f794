//! Prompt enhancement output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where a finalized prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementSource {
    /// Rewritten by the completion service
    Remote,
    /// Built locally from the instructions and the raw prompt
    Fallback,
}

impl EnhancementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementSource::Remote => "remote",
            EnhancementSource::Fallback => "fallback",
        }
    }
}

/// The prompt that will be submitted for rendering. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnhancementResult {
    pub prompt: String,
    pub source: EnhancementSource,
}

impl EnhancementResult {
    pub fn remote(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source: EnhancementSource::Remote,
        }
    }

    pub fn fallback(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source: EnhancementSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == EnhancementSource::Fallback
    }
}
