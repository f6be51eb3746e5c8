use crate::cluster::MeanShiftParams;
use crate::fit::LineFitParams;
use crate::segment::HsvRange;
use crate::skeleton::SkeletonParams;
use croprow_core::{FrameSize, LineSpace, RoiOffset, RoiSize};
use serde::{Deserialize, Serialize};

/// Configuration for the crop row detector.
///
/// Every field has a default, so partial JSON configs deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRowParams {
    /// Size every input frame must have.
    pub frame: FrameSize,
    /// Bird's-eye image size.
    pub roi: RoiSize,
    /// Camera-space top-left corner of the ROI trapezoid.
    pub offset: RoiOffset,
    /// Vegetation color range.
    pub hsv: HsvRange,
    pub skeleton: SkeletonParams,
    /// Adaptive mean-shift pass.
    pub mean_shift: MeanShiftParams,
    /// Pass used when the adaptive one degenerates.
    pub fallback_mean_shift: MeanShiftParams,
    pub line_fit: LineFitParams,
    /// Space of the returned lines. The overlay is always in camera space.
    pub line_space: LineSpace,
    pub overlay_color: [u8; 3],
    /// Keep intermediate images and clustering in the result.
    pub debug: bool,
}

impl Default for CropRowParams {
    fn default() -> Self {
        Self {
            frame: FrameSize::default(),
            roi: RoiSize::default(),
            offset: RoiOffset::default(),
            hsv: HsvRange::default(),
            skeleton: SkeletonParams::default(),
            mean_shift: MeanShiftParams::default(),
            fallback_mean_shift: MeanShiftParams::fallback(),
            line_fit: LineFitParams::default(),
            line_space: LineSpace::Camera,
            overlay_color: [255, 0, 0],
            debug: false,
        }
    }
}
