//! High-level facade crate for the `croprow-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core geometry crate and the detector crate
//! - (feature-gated) helpers that run the detector on `image::RgbImage`
//!   frames or raw RGB buffers
//! - (feature `cli`) the `croprow` binary, which processes a directory of
//!   frames and writes overlays and a JSON report
//!
//! ## Quickstart
//!
//! ```no_run
//! use croprow::detect;
//! use croprow::CropRowParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = CropRowParams::default();
//! let img = image::open("field.png")?.to_rgb8();
//! let img = detect::resize_to_frame(&img, params.frame);
//!
//! let result = detect::detect_crop_rows(&img, &params)?;
//! println!("detected {} rows", result.lines.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `croprow::core`: image buffers, homographies, bird's-eye rectifier, row lines.
//! - `croprow::detector`: segmentation, skeleton, mean-shift clustering, line fits, pipeline.
//! - `croprow::detect` (feature `image`): helpers from `image::RgbImage`.

pub use croprow_core as core;
pub use croprow_detector as detector;

pub use croprow_core::{FrameSize, LineSpace, RoiOffset, RoiSize, RowLine};
pub use croprow_detector::{
    crop_row_detect, CropRowDetectionResult, CropRowDetector, CropRowError, CropRowParams,
};

#[cfg(feature = "image")]
pub mod detect;
