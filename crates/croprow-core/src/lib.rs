//! Core types and geometry for crop row detection.
//!
//! Plain row-major image buffers, a 4-point homography, bird's-eye
//! rectification of the camera ROI, and row line primitives. Nothing here
//! knows about vegetation or clustering.

mod homography;
mod image;
mod line;
mod logger;
mod rectify;

pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{
    sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, RgbImage, RgbImageView,
};
pub use line::{clip_segment_to_rect, draw_segment_rgb, LineSpace, RowLine};
pub use rectify::{
    birdseye_corners, camera_roi_corners, BirdsEyeRectifier, FrameSize, RectifyError, RoiOffset,
    RoiSize,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
