use super::{CropRowDebug, CropRowDetectionResult, CropRowError, CropRowParams};
use crate::cluster::cluster_skeleton;
use crate::fit::fit_row_lines;
use crate::segment::segment_vegetation;
use crate::skeleton::skeletonize;
use croprow_core::{BirdsEyeRectifier, FrameSize, LineSpace, RgbImageView, RowLine};
use log::{debug, info};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Crop row detector for frames of one fixed size and ROI geometry.
///
/// Construction validates the geometry; the detector is immutable afterwards
/// and can be shared across threads.
#[derive(Clone, Debug)]
pub struct CropRowDetector {
    params: CropRowParams,
    rectifier: BirdsEyeRectifier,
}

impl CropRowDetector {
    pub fn new(params: CropRowParams) -> Result<Self, CropRowError> {
        let rectifier = BirdsEyeRectifier::new(params.frame, params.roi, params.offset)?;
        Ok(Self { params, rectifier })
    }

    #[inline]
    pub fn params(&self) -> &CropRowParams {
        &self.params
    }

    #[inline]
    pub fn rectifier(&self) -> &BirdsEyeRectifier {
        &self.rectifier
    }

    /// Detect crop rows in one RGB frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn detect(
        &self,
        frame: &RgbImageView<'_>,
    ) -> Result<CropRowDetectionResult, CropRowError> {
        let expected = self.params.frame;
        if frame.width != expected.width
            || frame.height != expected.height
            || frame.data.len() != frame.width * frame.height * 3
        {
            return Err(CropRowError::FrameSize {
                expected,
                got: FrameSize {
                    width: frame.width,
                    height: frame.height,
                },
            });
        }

        let mask = segment_vegetation(frame, &self.params.hsv);
        let birdseye_mask = self.rectifier.warp_mask(&mask.view());
        let skeleton = skeletonize(&birdseye_mask, &self.params.skeleton);
        debug!(
            "foreground: {} px, bird's-eye: {} px, skeleton: {} px after {} passes",
            mask.count_nonzero(),
            birdseye_mask.count_nonzero(),
            skeleton.mask.count_nonzero(),
            skeleton.iterations
        );

        let clustering = cluster_skeleton(
            &skeleton.mask,
            &self.params.mean_shift,
            &self.params.fallback_mean_shift,
        );
        let fitted = fit_row_lines(&clustering, self.params.roi.height, &self.params.line_fit);
        info!(
            "{} clusters ({:?}, bandwidth {:.3}), {} rows",
            clustering.num_clusters(),
            clustering.strategy,
            clustering.bandwidth,
            fitted.len()
        );

        let birdseye_lines: Vec<RowLine> = fitted.iter().map(|f| f.line).collect();
        let overlay = self
            .rectifier
            .render_overlay(frame, &birdseye_lines, self.params.overlay_color);

        let lines = match self.params.line_space {
            LineSpace::BirdsEye => birdseye_lines,
            LineSpace::Camera => birdseye_lines
                .iter()
                .map(|l| self.rectifier.line_to_camera(l))
                .collect(),
        };

        let debug = self.params.debug.then(|| CropRowDebug {
            birdseye_mask,
            skeleton: skeleton.mask,
            skeleton_iterations: skeleton.iterations,
            clustering,
            fitted,
        });

        Ok(CropRowDetectionResult {
            overlay,
            lines,
            space: self.params.line_space,
            debug,
        })
    }
}

/// Build a detector for `params` and run it on `frame`.
pub fn crop_row_detect(
    frame: &RgbImageView<'_>,
    params: &CropRowParams,
) -> Result<CropRowDetectionResult, CropRowError> {
    CropRowDetector::new(params.clone())?.detect(frame)
}
