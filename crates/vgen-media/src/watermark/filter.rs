//! Composition graph and encoder invocation for the moving watermark.

use std::path::Path;

use vgen_models::EncodingConfig;

use super::geometry::WatermarkPlan;
use crate::command::FfmpegCommand;

/// How the source audio is carried into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPlan {
    /// Audio detected: optional map, stream copy.
    Copy,
    /// Probe found no audio: `-an`.
    Omit,
    /// Probe failed: map audio if it exists, stream copy.
    CopyIfPresent,
}

impl AudioPlan {
    /// `None` means the probe did not succeed.
    pub fn from_probe(has_audio: Option<bool>) -> Self {
        match has_audio {
            Some(true) => AudioPlan::Copy,
            Some(false) => AudioPlan::Omit,
            None => AudioPlan::CopyIfPresent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioPlan::Copy => "copy",
            AudioPlan::Omit => "omit",
            AudioPlan::CopyIfPresent => "copy_if_present",
        }
    }
}

/// Build the `-filter_complex` graph.
///
/// Source colour format is normalised to yuv420p, the watermark is scaled
/// to the planned overlay size and faded to `opacity`,
/// then overlaid at the per-frame trajectory position.
pub fn build_overlay_graph(plan: &WatermarkPlan, opacity: f32) -> String {
    let x = plan.trajectory.x_expr();
    let y = plan.trajectory.y_expr();

    format!(
        "[0:v]format=yuv420p[base];\
         [1:v]scale={}:{},format=rgba,colorchannelmixer=aa={:.2}[wm];\
         [base][wm]overlay=x='{}':y='{}':format=auto[vout]",
        plan.overlay_width,
        plan.overlay_height,
        opacity.clamp(0.0, 1.0),
        x,
        y
    )
}

/// Full encoder command for one compositing run.
pub fn build_composite_command(
    source: &Path,
    watermark: &Path,
    output: &Path,
    plan: &WatermarkPlan,
    opacity: f32,
    audio: AudioPlan,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    // The still image is looped so the overlay lasts the whole video
    let cmd = FfmpegCommand::new(output)
        .input(source)
        .input_with_args(["-loop", "1"], watermark)
        .filter_complex(build_overlay_graph(plan, opacity))
        .map("[vout]");

    let cmd = match audio {
        AudioPlan::Copy | AudioPlan::CopyIfPresent => cmd.map("0:a?").audio_codec("copy"),
        AudioPlan::Omit => cmd.no_audio(),
    };

    // Looped image input never ends on its own
    cmd.output_args(encoding.to_video_args()).output_arg("-shortest")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> WatermarkPlan {
        WatermarkPlan::compute(1280, 720, 400, 100)
    }

    fn args_for(audio: AudioPlan) -> Vec<String> {
        build_composite_command(
            Path::new("/tmp/in.mp4"),
            Path::new("/tmp/wm.png"),
            Path::new("/tmp/out.mp4"),
            &plan(),
            0.9,
            audio,
            &EncodingConfig::default(),
        )
        .build_args()
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_audio_plan_from_probe() {
        assert_eq!(AudioPlan::from_probe(Some(true)), AudioPlan::Copy);
        assert_eq!(AudioPlan::from_probe(Some(false)), AudioPlan::Omit);
        assert_eq!(AudioPlan::from_probe(None), AudioPlan::CopyIfPresent);
    }

    #[test]
    fn test_graph_shape() {
        let graph = build_overlay_graph(&plan(), 0.9);
        assert!(graph.starts_with("[0:v]format=yuv420p[base];"));
        assert!(graph.contains("[1:v]scale=178:44,format=rgba,colorchannelmixer=aa=0.90[wm]"));
        assert!(graph.contains("[base][wm]overlay=x='"));
        assert!(graph.ends_with(":format=auto[vout]"));
    }

    #[test]
    fn test_detected_audio_is_copied() {
        let args = args_for(AudioPlan::Copy);
        assert!(has_pair(&args, "-map", "0:a?"));
        assert!(!has_pair(&args, "-map", "0:a"));
        assert!(has_pair(&args, "-c:a", "copy"));
        assert!(!args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_missing_audio_is_dropped() {
        let args = args_for(AudioPlan::Omit);
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("0:a")));
    }

    #[test]
    fn test_unknown_audio_is_optional() {
        let args = args_for(AudioPlan::CopyIfPresent);
        assert!(has_pair(&args, "-map", "0:a?"));
        assert!(has_pair(&args, "-c:a", "copy"));
    }

    #[test]
    fn test_video_encoding_profile() {
        let args = args_for(AudioPlan::Copy);
        assert!(has_pair(&args, "-map", "[vout]"));
        assert!(has_pair(&args, "-c:v", "libx264"));
        assert!(has_pair(&args, "-preset", "veryfast"));
        assert!(has_pair(&args, "-crf", "24"));
        assert!(has_pair(&args, "-movflags", "+faststart"));
        assert!(has_pair(&args, "-loop", "1"));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }
}
