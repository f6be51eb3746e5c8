//! Crop row detection pipeline.
//!
//! Segmentation, bird's-eye warp, skeleton, clustering and line fitting run
//! in sequence on one frame; lines are mapped back to the camera and drawn
//! onto a copy of the input.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::CropRowError;
pub use params::CropRowParams;
pub use pipeline::{crop_row_detect, CropRowDetector};
pub use result::{CropRowDebug, CropRowDetectionResult};
