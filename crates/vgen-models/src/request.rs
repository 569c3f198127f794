//! Generation request types.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::media::Orientation;

/// Aspect ratios supported by the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    /// 16:9 landscape
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (Shorts/Reels)
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }

    /// Orientation implied by this ratio.
    pub fn orientation(&self) -> Orientation {
        match self {
            AspectRatio::Landscape => Orientation::Landscape,
            AspectRatio::Portrait => Orientation::Portrait,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" | "landscape" => Ok(AspectRatio::Landscape),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            other => Err(ModelParseError::AspectRatio(other.to_string())),
        }
    }
}

/// Output resolution tier.
///
/// Each tier maps to a distinct rendering model on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// 720p, fast model
    #[default]
    Standard,
    /// 1080p, quality model
    High,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::Standard => "standard",
            ResolutionTier::High => "high",
        }
    }

    /// Short edge in pixels.
    pub fn short_edge(&self) -> u32 {
        match self {
            ResolutionTier::Standard => 720,
            ResolutionTier::High => 1080,
        }
    }

    /// Reference frame size (width, height) for an aspect ratio.
    ///
    /// Used when the real video dimensions cannot be measured.
    pub fn reference_size(&self, aspect: AspectRatio) -> (u32, u32) {
        let short = self.short_edge();
        let long = short * 16 / 9;
        match aspect {
            AspectRatio::Landscape => (long, short),
            AspectRatio::Portrait => (short, long),
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionTier {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "720p" => Ok(ResolutionTier::Standard),
            "high" | "1080p" => Ok(ResolutionTier::High),
            other => Err(ModelParseError::ResolutionTier(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelParseError {
    #[error("Unsupported aspect ratio: {0}, expected '16:9' or '9:16'")]
    AspectRatio(String),

    #[error("Unsupported resolution tier: {0}, expected 'standard' or 'high'")]
    ResolutionTier(String),
}

/// Reference image for image-guided generation.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReferenceImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// MIME type (e.g. "image/png")
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Guess the MIME type from a file extension.
    pub fn mime_for_extension(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => "image/png",
        }
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Optional instructions used to enrich a raw prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PromptInstructions {
    /// Visual theme (e.g. "cyberpunk")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Music / mood hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
    /// Camera or visual style hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Target aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Output language for the enhanced prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Target clip duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

impl PromptInstructions {
    /// True when no theme, music or style was chosen.
    pub fn is_empty(&self) -> bool {
        [&self.theme, &self.music, &self.style]
            .iter()
            .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

/// A single user request to generate a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct GenerationRequest {
    /// Raw prompt as typed by the user
    #[validate(length(min = 1, max = 5000))]
    pub prompt: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    #[serde(default)]
    pub tier: ResolutionTier,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<ReferenceImage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 60))]
    pub duration_secs: Option<u32>,
}

impl GenerationRequest {
    /// Create a request with defaults for everything but the prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            theme: None,
            music: None,
            style: None,
            aspect_ratio: AspectRatio::default(),
            tier: ResolutionTier::default(),
            reference_image: None,
            language: None,
            duration_secs: None,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_tier(mut self, tier: ResolutionTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn with_music(mut self, music: impl Into<String>) -> Self {
        self.music = Some(music.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_image = Some(image);
        self
    }

    /// Instruction set handed to the prompt enhancer.
    pub fn instructions(&self) -> PromptInstructions {
        PromptInstructions {
            theme: self.theme.clone(),
            music: self.music.clone(),
            style: self.style.clone(),
            aspect_ratio: self.aspect_ratio,
            language: self.language.clone(),
            duration_secs: self.duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parse_and_display() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert!("4:3".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::Portrait.to_string(), "9:16");
    }

    #[test]
    fn test_aspect_ratio_serde_uses_ratio_strings() {
        let json = serde_json::to_string(&AspectRatio::Portrait).unwrap();
        assert_eq!(json, "\"9:16\"");
    }

    #[test]
    fn test_reference_sizes() {
        assert_eq!(
            ResolutionTier::Standard.reference_size(AspectRatio::Landscape),
            (1280, 720)
        );
        assert_eq!(
            ResolutionTier::High.reference_size(AspectRatio::Portrait),
            (1080, 1920)
        );
    }

    #[test]
    fn test_instructions_empty() {
        let request = GenerationRequest::new("cat skateboarding");
        assert!(request.instructions().is_empty());

        let request = request.with_theme("  ");
        assert!(request.instructions().is_empty());

        let request = request.with_music("lofi");
        assert!(!request.instructions().is_empty());
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new("a dog").validate().is_ok());
        assert!(GenerationRequest::new("").validate().is_err());
    }

    #[test]
    fn test_reference_image_debug_hides_bytes() {
        let image = ReferenceImage::new(vec![0u8; 4096], "image/png");
        let debug = format!("{:?}", image);
        assert!(debug.contains("4096"));
        assert!(!debug.contains("[0, 0"));
    }
}
