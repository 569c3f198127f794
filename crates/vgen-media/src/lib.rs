#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for the watermark download path.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe metadata probing with multi-signal audio detection
//! - A lazily loaded, shared encoding engine
//! - The moving-watermark compositor with degrade-to-original handling
//! - Output packaging into a download directory

pub mod command;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod packager;
pub mod probe;
pub mod progress;
pub mod watermark;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use engine::{EncoderEngine, SharedEncoder};
pub use error::{CompositeError, MediaError, MediaResult};
pub use fetch::{fetch_source, SourceLocator};
pub use packager::{derive_file_name, sanitize_file_name, OutputPackager};
pub use probe::{parse_probe_output, probe_metadata};
pub use progress::FfmpegProgress;
pub use watermark::{
    AudioPlan, CompositeOptions, CompositingResult, Compositor, WatermarkConfig, WatermarkPlan,
};
