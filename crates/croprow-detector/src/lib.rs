//! Crop row detection in overhead field images.
//!
//! Stages, in pipeline order:
//! - [`segment_vegetation`]: HSV range test on the camera frame,
//! - [`BirdsEyeRectifier::warp_mask`](croprow_core::BirdsEyeRectifier::warp_mask):
//!   perspective warp of the ROI trapezoid,
//! - [`skeletonize`]: morphological skeleton,
//! - [`cluster_skeleton`]: 1-D mean-shift over skeleton columns,
//! - [`fit_row_lines`]: least-squares line per tall cluster.
//!
//! [`CropRowDetector`] runs them all and draws the rows back onto the frame.

mod cluster;
mod detector;
mod fit;
mod io;
mod morphology;
mod plot;
mod segment;
mod skeleton;

pub use cluster::{
    cluster_points, cluster_skeleton, estimate_bandwidth, mean_shift, ClusterStrategy, Clustering,
    ClusteringDegenerate, MeanShiftOutcome, MeanShiftParams,
};
pub use detector::{
    crop_row_detect, CropRowDebug, CropRowDetectionResult, CropRowDetector, CropRowError,
    CropRowParams,
};
pub use fit::{fit_line, fit_row_lines, FittedRow, LineFit, LineFitFailure, LineFitParams};
pub use io::{CropRowDetectConfig, CropRowDetectReport, CropRowFrameReport, CropRowIoError};
pub use morphology::{dilate_cross, erode_cross};
pub use plot::{label_color, render_cluster_plot};
pub use segment::{rgb_to_hsv, segment_vegetation, HsvRange};
pub use skeleton::{max_skeleton_iterations, skeletonize, Skeleton, SkeletonParams};
