//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid watermark image: {0}")]
    InvalidImage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Captured stderr tail of a failed FFmpeg/FFprobe run.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref().map(str::trim).filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }
}

/// Failure taxonomy of the compositing engine.
///
/// Only [`CompositeError::SourceFetch`] is fatal; every other variant
/// degrades to returning the untouched source.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Source fetch failed: {0}")]
    SourceFetch(#[source] MediaError),

    #[error("Metadata probe failed: {0}")]
    MetadataProbe(#[source] MediaError),

    #[error("Watermark asset unavailable: {0}")]
    WatermarkAssetMissing(#[source] MediaError),

    #[error("Encoding engine failed: {0}")]
    EncodingEngine(#[source] MediaError),

    #[error("Temporary file cleanup failed: {0}")]
    Cleanup(#[source] std::io::Error),
}

impl CompositeError {
    /// Encoder or probe stderr behind this failure, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CompositeError::SourceFetch(e)
            | CompositeError::MetadataProbe(e)
            | CompositeError::WatermarkAssetMissing(e)
            | CompositeError::EncodingEngine(e) => e.stderr(),
            CompositeError::Cleanup(_) => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CompositeError::SourceFetch(_) => "source_fetch",
            CompositeError::MetadataProbe(_) => "metadata_probe",
            CompositeError::WatermarkAssetMissing(_) => "watermark_asset_missing",
            CompositeError::EncodingEngine(_) => "encoding_engine",
            CompositeError::Cleanup(_) => "cleanup",
        }
    }
}
