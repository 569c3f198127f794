//! FFprobe metadata probe.
//!
//! Audio presence is decided by several independent signals from the probe
//! output; the track is assumed present when any of them fires.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use vgen_models::VideoMetadata;

use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    nb_streams: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    channel_layout: Option<String>,
}

impl FfprobeStream {
    fn is_video(&self) -> bool {
        self.codec_type.as_deref() == Some("video")
    }
}

/// Probe a video file for duration, dimensions and audio presence.
pub async fn probe_metadata(ffprobe: &Path, path: &Path) -> MediaResult<VideoMetadata> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json: &[u8]) -> MediaResult<VideoMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.is_video())
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "Video stream has no usable dimensions ({}x{})",
            width, height
        )));
    }

    // Container duration first, video stream duration as fallback
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds)
        .or_else(|| video_stream.duration.as_deref().and_then(parse_seconds))
        .unwrap_or(0.0);

    Ok(VideoMetadata {
        duration,
        width,
        height,
        has_audio: detect_audio(&probe.streams, probe.format.as_ref().and_then(|f| f.nb_streams)),
    })
}

/// OR of independent audio signals.
fn detect_audio(streams: &[FfprobeStream], container_streams: Option<usize>) -> bool {
    let declared_audio = streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let has_channels = streams
        .iter()
        .filter(|s| !s.is_video())
        .any(|s| s.channels.unwrap_or(0) > 0);

    let has_sample_rate = streams.iter().filter(|s| !s.is_video()).any(|s| {
        s.sample_rate
            .as_deref()
            .and_then(|r| r.parse::<u32>().ok())
            .unwrap_or(0)
            > 0
    });

    let has_layout = streams
        .iter()
        .any(|s| s.channel_layout.as_deref().is_some_and(|l| !l.is_empty()));

    // Container lists more streams than the probe could classify as non-audio
    let known_non_audio = streams
        .iter()
        .filter(|s| {
            matches!(
                s.codec_type.as_deref(),
                Some("video" | "data" | "subtitle" | "attachment")
            )
        })
        .count();
    let unaccounted_streams = container_streams.is_some_and(|n| n > known_non_audio);

    declared_audio || has_channels || has_sample_rate || has_layout || unaccounted_streams
}

fn parse_seconds(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}
