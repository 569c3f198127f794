//! Overlay sizing and placement derived from the target frame.

use vgen_models::Orientation;

use super::trajectory::{
    Trajectory, DEFAULT_SEGMENT_SECS, JITTER_PERIOD_X, JITTER_PERIOD_Y, PHASE_COUNT,
};

/// Overlay width as a fraction of frame width, portrait frames.
pub const PORTRAIT_WIDTH_RATIO: f64 = 0.18;
/// Overlay width as a fraction of frame width, landscape frames.
pub const LANDSCAPE_WIDTH_RATIO: f64 = 0.14;

const MARGIN_RATIO: f64 = 0.03;
const MARGIN_MIN: f64 = 16.0;
const MARGIN_MAX: f64 = 48.0;

const JITTER_RATIO: f64 = 0.006;
const JITTER_MIN: f64 = 2.0;
const JITTER_MAX: f64 = 8.0;

/// Size, margins and motion of the watermark for one target frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkPlan {
    pub orientation: Orientation,
    pub target_width: u32,
    pub target_height: u32,
    pub overlay_width: u32,
    pub overlay_height: u32,
    pub margin: f64,
    pub jitter: f64,
    pub segment_secs: f64,
    pub cycle_secs: f64,
    pub trajectory: Trajectory,
}

impl WatermarkPlan {
    /// Plan for a `target_width`×`target_height` frame and an asset of the
    /// given pixel size.
    pub fn compute(target_width: u32, target_height: u32, asset_width: u32, asset_height: u32) -> Self {
        let orientation = Orientation::from_dimensions(target_width, target_height);
        let width = target_width as f64;
        let height = target_height as f64;

        let ratio = match orientation {
            Orientation::Portrait => PORTRAIT_WIDTH_RATIO,
            Orientation::Landscape => LANDSCAPE_WIDTH_RATIO,
        };
        let overlay_width = even((width * ratio).round().max(2.0));

        let asset_aspect = if asset_width == 0 {
            1.0
        } else {
            asset_height as f64 / asset_width as f64
        };
        let overlay_height = even((overlay_width as f64 * asset_aspect).round().max(2.0));

        let margin = (width * MARGIN_RATIO).clamp(MARGIN_MIN, MARGIN_MAX);
        let jitter = (width * JITTER_RATIO).clamp(JITTER_MIN, JITTER_MAX);

        // Far edges never cross the near ones on tiny frames
        let right = (width - margin - overlay_width as f64).max(margin);
        let bottom = (height - margin - overlay_height as f64).max(margin);

        let trajectory = Trajectory {
            left: margin,
            right,
            top: margin,
            bottom,
            segment_secs: DEFAULT_SEGMENT_SECS,
            jitter,
            jitter_period_x: JITTER_PERIOD_X,
            jitter_period_y: JITTER_PERIOD_Y,
        };

        Self {
            orientation,
            target_width,
            target_height,
            overlay_width,
            overlay_height,
            margin,
            jitter,
            segment_secs: DEFAULT_SEGMENT_SECS,
            cycle_secs: DEFAULT_SEGMENT_SECS * PHASE_COUNT as f64,
            trajectory,
        }
    }
}

/// Round down to an even pixel count (min 2).
fn even(v: f64) -> u32 {
    let v = v as u32;
    (v - v % 2).max(2)
}
