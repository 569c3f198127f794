//! Moving watermark overlay for downloads.
//!
//! [`Compositor::composite`] fetches a generated video, measures it, and
//! re-encodes it with the brand mark travelling around the frame. The only
//! outcome that fails the download is a source that cannot be fetched; every
//! later problem hands back the original bytes unchanged.
//!
//! # Architecture
//!
//! - `WatermarkConfig`: asset location and opacity
//! - [`geometry::WatermarkPlan`]: overlay size and margins for a frame
//! - [`trajectory::Trajectory`]: four-phase motion path with jitter
//! - [`filter`]: composition graph and encoder command
//! - `Compositor`: orchestration and degrade-to-original handling

pub mod filter;
pub mod geometry;
pub mod trajectory;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vgen_models::{AspectRatio, EncodingConfig, Orientation, ResolutionTier, VideoMetadata};

use crate::engine::SharedEncoder;
use crate::error::{CompositeError, MediaError, MediaResult};
use crate::fetch::fetch_source;
use crate::metrics;
use crate::packager::derive_file_name;
use crate::probe::probe_metadata;
use crate::progress::FfmpegProgress;

pub use filter::AudioPlan;
pub use geometry::WatermarkPlan;
pub use trajectory::{Expr, Trajectory};

// =============================================================================
// Constants
// =============================================================================

/// Default watermark asset path in production container.
pub const DEFAULT_WATERMARK_PATH: &str = "/app/assets/watermark.png";

/// Development fallback paths to check.
const DEV_WATERMARK_PATHS: &[&str] = &[
    "./assets/watermark.png",
    "../assets/watermark.png",
    "../../assets/watermark.png",
];

/// Default overlay opacity.
pub const DEFAULT_OPACITY: f32 = 0.9;

/// Default encoder timeout.
pub const DEFAULT_ENCODE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// Configuration
// =============================================================================

/// Watermark asset and overlay settings.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Path to watermark image (PNG with transparency)
    pub image_path: PathBuf,
    /// Opacity (0.0 to 1.0)
    pub opacity: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            image_path: resolve_watermark_path(),
            opacity: DEFAULT_OPACITY,
        }
    }
}

impl WatermarkConfig {
    /// `WATERMARK_PATH` if set, otherwise the production/dev fallbacks.
    pub fn from_env() -> Self {
        match std::env::var("WATERMARK_PATH") {
            Ok(path) if !path.trim().is_empty() => Self::default().with_image_path(path.trim()),
            _ => Self::default(),
        }
    }

    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = path.into();
        self
    }

    /// Set watermark opacity (0.0 = invisible, 1.0 = fully opaque).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Check if the watermark image exists.
    pub fn is_available(&self) -> bool {
        self.image_path.is_file()
    }

    /// Pixel size of the asset.
    pub fn asset_dimensions(&self) -> MediaResult<(u32, u32)> {
        if !self.is_available() {
            return Err(MediaError::FileNotFound(self.image_path.clone()));
        }
        let (width, height) = image::image_dimensions(&self.image_path)
            .map_err(|e| MediaError::InvalidImage(format!("{}: {}", self.image_path.display(), e)))?;
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidImage(format!(
                "{} has zero size",
                self.image_path.display()
            )));
        }
        Ok((width, height))
    }
}

/// Resolve watermark path, checking dev fallbacks if production path missing.
fn resolve_watermark_path() -> PathBuf {
    if Path::new(DEFAULT_WATERMARK_PATH).exists() {
        return PathBuf::from(DEFAULT_WATERMARK_PATH);
    }

    for path in DEV_WATERMARK_PATHS {
        if Path::new(path).exists() {
            debug!(path = path, "Found watermark at dev fallback path");
            return PathBuf::from(path);
        }
    }

    // Missing asset degrades at composite time
    PathBuf::from(DEFAULT_WATERMARK_PATH)
}

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Caller hints for one compositing call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeOptions {
    /// Reference size used only when the probe fails
    pub tier: ResolutionTier,
    /// Reference aspect used only when the probe fails
    pub aspect_hint: AspectRatio,
    /// Preferred output file name
    pub file_name: Option<String>,
}

impl CompositeOptions {
    pub fn new(tier: ResolutionTier, aspect_hint: AspectRatio) -> Self {
        Self {
            tier,
            aspect_hint,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// Outcome of a compositing call that fetched its source.
#[derive(Debug, Clone)]
pub struct CompositingResult {
    /// Final artifact: watermarked, or the untouched source
    pub data: Vec<u8>,
    pub file_name: String,
    pub watermark_applied: bool,
    /// Aspect measured from the video, or from the hints when unmeasured
    pub orientation: Orientation,
    pub target_width: u32,
    pub target_height: u32,
    /// Source duration in seconds, when probed
    pub duration: Option<f64>,
    /// Ordered diagnostic messages
    pub log: Vec<String>,
}

/// Ordered diagnostics, mirrored to tracing.
#[derive(Debug, Default)]
struct DiagnosticLog {
    entries: Vec<String>,
}

impl DiagnosticLog {
    fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.entries.push(message);
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.entries.push(message);
    }

    fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Frame facts known so far; starts from the caller's hints.
#[derive(Debug, Clone, Copy)]
struct FrameFacts {
    width: u32,
    height: u32,
    duration: Option<f64>,
    /// `None` until a probe succeeds
    has_audio: Option<bool>,
}

impl FrameFacts {
    fn from_hints(options: &CompositeOptions) -> Self {
        let (width, height) = options.tier.reference_size(options.aspect_hint);
        Self {
            width,
            height,
            duration: None,
            has_audio: None,
        }
    }

    fn measured(&mut self, meta: &VideoMetadata) {
        self.width = meta.width;
        self.height = meta.height;
        self.duration = (meta.duration > 0.0).then_some(meta.duration);
        self.has_audio = Some(meta.has_audio);
    }

    fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(self.width, self.height)
    }
}

// =============================================================================
// Compositor
// =============================================================================

/// Applies the moving watermark to generated videos.
#[derive(Debug, Clone)]
pub struct Compositor {
    http: reqwest::Client,
    encoder: SharedEncoder,
    watermark: WatermarkConfig,
    encoding: EncodingConfig,
    encode_timeout_secs: u64,
}

impl Compositor {
    pub fn new(encoder: SharedEncoder, watermark: WatermarkConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            encoder,
            watermark,
            encoding: EncodingConfig::default(),
            encode_timeout_secs: DEFAULT_ENCODE_TIMEOUT_SECS,
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_encode_timeout(mut self, secs: u64) -> Self {
        self.encode_timeout_secs = secs;
        self
    }

    pub fn watermark(&self) -> &WatermarkConfig {
        &self.watermark
    }

    /// Produce a watermarked copy of the video at `locator`.
    ///
    /// Returns `None` only when the source cannot be fetched. Any later
    /// failure yields the original bytes with `watermark_applied = false`.
    pub async fn composite(&self, locator: &str, options: &CompositeOptions) -> Option<CompositingResult> {
        let started = Instant::now();
        let mut log = DiagnosticLog::default();
        log.info(format!("Compositing watermark for {}", locator));

        let source = match fetch_source(&self.http, locator).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = CompositeError::SourceFetch(e);
                log.warn(err.to_string());
                metrics::record_composite("fetch_failed", err.kind(), started.elapsed().as_secs_f64());
                return None;
            }
        };
        log.info(format!("Fetched {} bytes", source.len()));

        let mut facts = FrameFacts::from_hints(options);
        let rendered = match tempfile::Builder::new().prefix("vgen-watermark-").tempdir() {
            Ok(workdir) => {
                let rendered = self
                    .render(&source, workdir.path(), &mut facts, &mut log)
                    .await;
                if let Err(e) = workdir.close() {
                    log.warn(CompositeError::Cleanup(e).to_string());
                }
                rendered
            }
            Err(e) => Err(CompositeError::EncodingEngine(MediaError::Io(e))),
        };

        let elapsed = started.elapsed().as_secs_f64();
        let (data, watermark_applied) = match rendered {
            Ok(data) => {
                log.info(format!("Watermark applied in {:.2}s", elapsed));
                metrics::record_composite("applied", "none", elapsed);
                (data, true)
            }
            Err(err) => {
                log.warn(format!("{}; returning original video", err));
                if let Some(stderr) = err.stderr() {
                    log.warn(format!("Encoder output: {}", stderr));
                }
                metrics::record_composite("degraded", err.kind(), elapsed);
                (source, false)
            }
        };

        Some(CompositingResult {
            data,
            file_name: derive_file_name(options.file_name.as_deref(), locator, watermark_applied),
            watermark_applied,
            orientation: facts.orientation(),
            target_width: facts.width,
            target_height: facts.height,
            duration: facts.duration,
            log: log.into_entries(),
        })
    }

    /// Steps after a successful fetch. Any error means "serve the original".
    async fn render(
        &self,
        source: &[u8],
        workdir: &Path,
        facts: &mut FrameFacts,
        log: &mut DiagnosticLog,
    ) -> Result<Vec<u8>, CompositeError> {
        let engine = self
            .encoder
            .get()
            .await
            .map_err(CompositeError::EncodingEngine)?;

        let source_path = workdir.join("source.mp4");
        tokio::fs::write(&source_path, source)
            .await
            .map_err(|e| CompositeError::EncodingEngine(MediaError::Io(e)))?;

        match probe_metadata(engine.ffprobe(), &source_path).await {
            Ok(meta) => {
                facts.measured(&meta);
                log.info(format!(
                    "Probed {}x{} {} ({:.2}s, audio: {})",
                    meta.width,
                    meta.height,
                    meta.orientation(),
                    meta.duration,
                    meta.has_audio
                ));
            }
            Err(e) => {
                let err = CompositeError::MetadataProbe(e);
                log.warn(format!(
                    "{}; using {}x{} reference size",
                    err, facts.width, facts.height
                ));
                if let Some(stderr) = err.stderr() {
                    log.warn(format!("Probe output: {}", stderr));
                }
            }
        }

        let (asset_width, asset_height) = self
            .watermark
            .asset_dimensions()
            .map_err(CompositeError::WatermarkAssetMissing)?;

        let plan = WatermarkPlan::compute(facts.width, facts.height, asset_width, asset_height);
        let audio = AudioPlan::from_probe(facts.has_audio);
        log.info(format!(
            "Overlay {}x{} on {} frame, margin {:.1}px, jitter {:.1}px, audio {}",
            plan.overlay_width,
            plan.overlay_height,
            plan.orientation,
            plan.margin,
            plan.jitter,
            audio.as_str()
        ));

        let output_path = workdir.join("watermarked.mp4");
        let cmd = filter::build_composite_command(
            &source_path,
            &self.watermark.image_path,
            &output_path,
            &plan,
            self.watermark.opacity,
            audio,
            &self.encoding,
        );

        debug!(version = engine.version(), "Encoding with FFmpeg");
        let encode_started = Instant::now();
        let run = engine
            .runner()
            .with_timeout(self.encode_timeout_secs)
            .run(&cmd)
            .await;
        metrics::record_ffmpeg(encode_started.elapsed().as_secs_f64(), run.is_ok());
        let progress = run.map_err(CompositeError::EncodingEngine)?;
        log.info(encode_summary(&progress, facts.duration));

        let data = tokio::fs::read(&output_path)
            .await
            .map_err(|e| CompositeError::EncodingEngine(MediaError::Io(e)))?;
        if data.is_empty() {
            return Err(CompositeError::EncodingEngine(MediaError::InvalidVideo(
                "Encoder produced an empty file".to_string(),
            )));
        }

        Ok(data)
    }
}

/// "Encoded N frames", with coverage of the probed duration when known.
fn encode_summary(progress: &FfmpegProgress, duration: Option<f64>) -> String {
    match duration {
        Some(secs) => format!(
            "Encoded {} frames, {:.0}% of the probed duration",
            progress.frame,
            progress.percentage((secs * 1000.0).round() as i64)
        ),
        None => format!("Encoded {} frames", progress.frame),
    }
}

// =============================================================================
// Tests
// =============================================================================
