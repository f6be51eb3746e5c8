use crate::cluster::{ClusterStrategy, Clustering};
use crate::fit::FittedRow;
use croprow_core::{GrayImage, LineSpace, RgbImage, RowLine};

/// Intermediate products of one detection run.
#[derive(Clone, Debug)]
pub struct CropRowDebug {
    /// Vegetation mask warped into bird's-eye space.
    pub birdseye_mask: GrayImage,
    pub skeleton: GrayImage,
    pub skeleton_iterations: usize,
    pub clustering: Clustering,
    /// Fits in bird's-eye space, sorted like the lines.
    pub fitted: Vec<FittedRow>,
}

impl CropRowDebug {
    #[inline]
    pub fn strategy(&self) -> ClusterStrategy {
        self.clustering.strategy
    }

    #[inline]
    pub fn bandwidth(&self) -> f64 {
        self.clustering.bandwidth
    }
}

/// Output of a crop row detection run.
#[derive(Clone, Debug)]
pub struct CropRowDetectionResult {
    /// Input frame with the rows drawn in camera perspective.
    pub overlay: RgbImage,
    /// Detected rows, ordered by bird's-eye top column.
    pub lines: Vec<RowLine>,
    /// Space `lines` are expressed in.
    pub space: LineSpace,
    pub debug: Option<CropRowDebug>,
}
