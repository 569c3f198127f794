//! Prompt enhancement with a deterministic local fallback.
//!
//! The completion service rewrites the raw prompt plus instructions into a
//! single production-ready prompt. Nothing here returns an error: when the
//! service is unconfigured, unreachable, or answers with anything but a
//! usable `final_prompt`, the prompt is assembled locally instead.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use vgen_client::{ClientResult, CompletionClient};
use vgen_models::{EnhancementResult, PromptInstructions};

/// Marker used in the fallback when no instructions were given.
pub const FREE_MARKER: &str = "free";
/// Separator between instruction summary items.
const SUMMARY_SEPARATOR: &str = " | ";
/// Separator between the summary and the raw prompt.
const PROMPT_JOINER: &str = ". ";

const SYSTEM_INSTRUCTION: &str = r#"You are a prompt writer for a text-to-video model.
Rewrite the user's idea into one vivid, concrete video prompt.
Honour every instruction that is present: theme, music mood, camera style,
aspect ratio, language and target duration. Describe subject, action,
setting, lighting and camera movement in a single paragraph.
Return ONLY a JSON object with exactly one field:
{"final_prompt": "<the prompt>"}"#;

/// Text-completion backend.
#[async_trait]
pub trait PromptCompleter: Send + Sync {
    /// Whether a call can be attempted at all.
    fn is_configured(&self) -> bool {
        true
    }

    /// Return the raw assistant text for a system + user message pair.
    async fn complete_json(&self, system: &str, user: &str) -> ClientResult<String>;
}

#[async_trait]
impl PromptCompleter for CompletionClient {
    fn is_configured(&self) -> bool {
        CompletionClient::is_configured(self)
    }

    async fn complete_json(&self, system: &str, user: &str) -> ClientResult<String> {
        CompletionClient::complete_json(self, system, user).await
    }
}

#[derive(Debug, Deserialize)]
struct CompletionPayload {
    #[serde(default)]
    final_prompt: Option<String>,
}

/// Turns raw prompts into submitted prompts.
#[derive(Clone)]
pub struct PromptEnhancer {
    completer: Arc<dyn PromptCompleter>,
}

impl PromptEnhancer {
    pub fn new(completer: Arc<dyn PromptCompleter>) -> Self {
        Self { completer }
    }

    /// Finalize `raw_prompt`. Always yields a non-empty prompt.
    pub async fn enhance(&self, raw_prompt: &str, instructions: &PromptInstructions) -> EnhancementResult {
        if !self.completer.is_configured() {
            debug!("Completion service not configured, using local prompt");
            return EnhancementResult::fallback(fallback_prompt(raw_prompt, instructions));
        }

        let user = build_user_payload(raw_prompt, instructions);

        match self.completer.complete_json(SYSTEM_INSTRUCTION, &user).await {
            Ok(text) => match parse_final_prompt(&text) {
                Some(prompt) => {
                    info!(chars = prompt.len(), "Prompt enhanced by completion service");
                    EnhancementResult::remote(prompt)
                }
                None => {
                    warn!("Completion response had no usable final_prompt, using local prompt");
                    EnhancementResult::fallback(fallback_prompt(raw_prompt, instructions))
                }
            },
            Err(e) => {
                warn!(error = %e, "Prompt enhancement failed, using local prompt");
                EnhancementResult::fallback(fallback_prompt(raw_prompt, instructions))
            }
        }
    }
}

impl std::fmt::Debug for PromptEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEnhancer")
            .field("configured", &self.completer.is_configured())
            .finish()
    }
}

/// User message: raw prompt plus the instructions that were set.
fn build_user_payload(raw_prompt: &str, instructions: &PromptInstructions) -> String {
    json!({
        "prompt": raw_prompt,
        "theme": instructions.theme,
        "music": instructions.music,
        "style": instructions.style,
        "aspect_ratio": instructions.aspect_ratio.as_str(),
        "language": instructions.language,
        "duration_secs": instructions.duration_secs,
    })
    .to_string()
}

/// Extract a non-empty `final_prompt`, tolerating markdown fences.
fn parse_final_prompt(text: &str) -> Option<String> {
    let text = strip_code_fence(text);
    let payload: CompletionPayload = serde_json::from_str(text).ok()?;
    payload
        .final_prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// `"Theme: X | Mood: Y | Camera: Z. <raw>"`, or `"free. <raw>"`.
pub fn fallback_prompt(raw_prompt: &str, instructions: &PromptInstructions) -> String {
    let labelled = [
        ("Theme", &instructions.theme),
        ("Mood", &instructions.music),
        ("Camera", &instructions.style),
    ];

    let parts: Vec<String> = labelled
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}", label, v))
        })
        .collect();

    let summary = if parts.is_empty() {
        FREE_MARKER.to_string()
    } else {
        parts.join(SUMMARY_SEPARATOR)
    };

    format!("{}{}{}", summary, PROMPT_JOINER, raw_prompt)
}
