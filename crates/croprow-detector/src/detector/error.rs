use croprow_core::{FrameSize, RectifyError};

/// Errors returned by the crop row detector.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CropRowError {
    #[error("invalid ROI configuration: {0}")]
    Configuration(#[from] RectifyError),
    #[error(
        "frame is {}x{}, detector expects {}x{}",
        .got.width, .got.height, .expected.width, .expected.height
    )]
    FrameSize { expected: FrameSize, got: FrameSize },
}
