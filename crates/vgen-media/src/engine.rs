//! Lazily loaded encoding engine.
//!
//! The engine is resolved once per process: the first caller locates the
//! FFmpeg/FFprobe binaries and checks that FFmpeg runs, concurrent callers
//! await that same initialisation, and later calls reuse the result. A
//! failed load leaves the cell empty so the next call tries again.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::info;

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// A resolved FFmpeg installation.
#[derive(Debug, Clone)]
pub struct EncoderEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    version: String,
}

impl EncoderEngine {
    /// Build an engine from known binary paths without probing them.
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            version: "unknown".to_string(),
        }
    }

    /// Locate FFmpeg/FFprobe on PATH and verify FFmpeg starts.
    pub async fn load() -> MediaResult<Self> {
        let ffmpeg = check_ffmpeg()?;
        let ffprobe = check_ffprobe()?;

        let output = Command::new(&ffmpeg)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to start FFmpeg: {}", e), None, None))?;

        if !output.status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg version check failed",
                Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                output.status.code(),
            ));
        }

        let version = parse_version(&String::from_utf8_lossy(&output.stdout))
            .unwrap_or_else(|| "unknown".to_string());

        info!(ffmpeg = %ffmpeg.display(), version = %version, "Encoding engine loaded");

        Ok(Self {
            ffmpeg,
            ffprobe,
            version,
        })
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Runner bound to this engine's FFmpeg binary.
    pub fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new(&self.ffmpeg)
    }
}

/// Shared, lazily initialised handle to the encoding engine.
///
/// Cloning is cheap; all clones share the same engine.
#[derive(Debug, Clone, Default)]
pub struct SharedEncoder {
    cell: Arc<OnceCell<EncoderEngine>>,
}

impl SharedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle around an engine that is already loaded.
    pub fn preloaded(engine: EncoderEngine) -> Self {
        Self {
            cell: Arc::new(OnceCell::new_with(Some(engine))),
        }
    }

    /// Get the engine, loading it on first use.
    pub async fn get(&self) -> MediaResult<&EncoderEngine> {
        self.get_with(EncoderEngine::load).await
    }

    /// Get the engine, loading it with `load` on first use.
    pub async fn get_with<F, Fut>(&self, load: F) -> MediaResult<&EncoderEngine>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MediaResult<EncoderEngine>>,
    {
        self.cell.get_or_try_init(load).await
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

/// Extract "6.1.1" from "ffmpeg version 6.1.1 Copyright ...".
fn parse_version(stdout: &str) -> Option<String> {
    let first_line = stdout.lines().next()?;
    let mut words = first_line.split_whitespace();
    while let Some(word) = words.next() {
        if word == "version" {
            return words.next().map(str::to_string);
        }
    }
    None
}
