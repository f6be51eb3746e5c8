//! Bird's-eye rectification of the camera ROI.
//!
//! The ROI is a trapezoid in the camera frame: its top edge starts at
//! `offset` and is `roi.width` pixels long, its bottom edge spans the whole
//! frame width at row `offset.y + roi.height`. It is mapped onto a
//! `roi.width x roi.height` rectangle. Forward and inverse mappings are built
//! from the same four correspondences, so they are exact inverses of each
//! other.

use crate::{
    clip_segment_to_rect, draw_segment_rgb, homography_from_4pt, warp_perspective_gray,
    GrayImage, GrayImageView, Homography, RgbImage, RgbImageView, RowLine,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Camera frame dimensions every frame is expected to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: usize,
    pub height: usize,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

/// Size of the rectified (bird's-eye) image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiSize {
    pub width: usize,
    pub height: usize,
}

impl Default for RoiSize {
    fn default() -> Self {
        Self {
            width: 140,
            height: 171,
        }
    }
}

/// Camera-space position of the top-left ROI corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiOffset {
    pub x: usize,
    pub y: usize,
}

impl Default for RoiOffset {
    fn default() -> Self {
        Self { x: 68, y: 85 }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    #[error("ROI must have a non-zero size (got {width}x{height})")]
    EmptyRoi { width: usize, height: usize },
    #[error("frame must have a non-zero size (got {width}x{height})")]
    EmptyFrame { width: usize, height: usize },
    #[error("ROI source points are collinear")]
    CollinearSourcePoints,
    #[error("homography estimation failed")]
    HomographyFailed,
    #[error("homography not invertible")]
    NonInvertible,
}

/// Forward/inverse perspective mapping between camera frame and bird's-eye ROI.
#[derive(Clone, Debug)]
pub struct BirdsEyeRectifier {
    frame: FrameSize,
    roi: RoiSize,
    offset: RoiOffset,
    h_birdseye_from_camera: Homography,
    h_camera_from_birdseye: Homography,
}

/// Camera-space ROI corners in correspondence order: top-left, top-right,
/// bottom-left, bottom-right.
pub fn camera_roi_corners(frame: FrameSize, roi: RoiSize, offset: RoiOffset) -> [Point2<f32>; 4] {
    let top = offset.y as f32;
    let bottom = (offset.y + roi.height) as f32;
    [
        Point2::new(offset.x as f32, top),
        Point2::new((offset.x + roi.width) as f32, top),
        Point2::new(0.0, bottom),
        Point2::new(frame.width.saturating_sub(1) as f32, bottom),
    ]
}

/// Bird's-eye corners matching [`camera_roi_corners`].
pub fn birdseye_corners(roi: RoiSize) -> [Point2<f32>; 4] {
    let (w, h) = (roi.width as f32, roi.height as f32);
    [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(0.0, h),
        Point2::new(w, h),
    ]
}

fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f64 {
    let (ax, ay) = ((a.x - o.x) as f64, (a.y - o.y) as f64);
    let (bx, by) = ((b.x - o.x) as f64, (b.y - o.y) as f64);
    ax * by - ay * bx
}

// Every triple of a quadrilateral is consecutive in its cyclic order.
fn check_source_quad(corners: &[Point2<f32>; 4]) -> Result<(), RectifyError> {
    let [tl, tr, bl, br] = *corners;
    let ring = [tl, tr, br, bl];
    let degenerate = (0..4)
        .map(|i| cross(ring[i], ring[(i + 1) % 4], ring[(i + 2) % 4]))
        .any(|t| t.abs() < 1e-6);
    if degenerate {
        return Err(RectifyError::CollinearSourcePoints);
    }
    Ok(())
}

impl BirdsEyeRectifier {
    /// Validate the geometry and build both mappings.
    pub fn new(frame: FrameSize, roi: RoiSize, offset: RoiOffset) -> Result<Self, RectifyError> {
        if roi.width == 0 || roi.height == 0 {
            return Err(RectifyError::EmptyRoi {
                width: roi.width,
                height: roi.height,
            });
        }
        if frame.width == 0 || frame.height == 0 {
            return Err(RectifyError::EmptyFrame {
                width: frame.width,
                height: frame.height,
            });
        }

        let src = camera_roi_corners(frame, roi, offset);
        check_source_quad(&src)?;
        let dst = birdseye_corners(roi);

        let h_birdseye_from_camera =
            homography_from_4pt(&src, &dst).ok_or(RectifyError::HomographyFailed)?;
        let h_camera_from_birdseye = h_birdseye_from_camera
            .inverse()
            .ok_or(RectifyError::NonInvertible)?;

        Ok(Self {
            frame,
            roi,
            offset,
            h_birdseye_from_camera,
            h_camera_from_birdseye,
        })
    }

    #[inline]
    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    #[inline]
    pub fn roi(&self) -> RoiSize {
        self.roi
    }

    #[inline]
    pub fn offset(&self) -> RoiOffset {
        self.offset
    }

    #[inline]
    pub fn h_birdseye_from_camera(&self) -> Homography {
        self.h_birdseye_from_camera
    }

    #[inline]
    pub fn h_camera_from_birdseye(&self) -> Homography {
        self.h_camera_from_birdseye
    }

    /// Camera point -> bird's-eye point.
    #[inline]
    pub fn project_point(&self, p_camera: Point2<f32>) -> Point2<f32> {
        self.h_birdseye_from_camera.apply(p_camera)
    }

    /// Bird's-eye point -> camera point.
    #[inline]
    pub fn unproject_point(&self, p_birdseye: Point2<f32>) -> Point2<f32> {
        self.h_camera_from_birdseye.apply(p_birdseye)
    }

    /// Warp a camera-space binary mask into the bird's-eye ROI.
    ///
    /// The bilinear samples are re-binarized at 128 so the output stays a
    /// 0/255 mask.
    pub fn warp_mask(&self, mask: &GrayImageView<'_>) -> GrayImage {
        let mut out = warp_perspective_gray(
            mask,
            self.h_camera_from_birdseye,
            self.roi.width,
            self.roi.height,
        );
        for v in out.data.iter_mut() {
            *v = if *v >= 128 { 255 } else { 0 };
        }
        out
    }

    /// Map a bird's-eye line into camera space.
    pub fn line_to_camera(&self, line: &RowLine) -> RowLine {
        line.map(|p| self.unproject_point(p))
    }

    /// Copy of `frame` with `lines_birdseye` drawn in camera perspective.
    ///
    /// Each line is clipped to the bird's-eye rectangle before it is mapped
    /// back, so nothing outside the ROI is touched. With no lines the result
    /// equals `frame`.
    pub fn render_overlay(
        &self,
        frame: &RgbImageView<'_>,
        lines_birdseye: &[RowLine],
        color: [u8; 3],
    ) -> RgbImage {
        let mut overlay = frame.to_image();
        for line in lines_birdseye {
            let Some((a, b)) =
                clip_segment_to_rect(line.top, line.bottom, self.roi.width, self.roi.height)
            else {
                continue;
            };
            draw_segment_rgb(
                &mut overlay,
                self.unproject_point(a),
                self.unproject_point(b),
                color,
            );
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rectifier(roi: (usize, usize), offset: (usize, usize)) -> BirdsEyeRectifier {
        BirdsEyeRectifier::new(
            FrameSize::default(),
            RoiSize {
                width: roi.0,
                height: roi.1,
            },
            RoiOffset {
                x: offset.0,
                y: offset.1,
            },
        )
        .expect("valid geometry")
    }

    #[test]
    fn corners_map_onto_rectangle() {
        let r = rectifier((140, 171), (68, 85));
        let src = camera_roi_corners(r.frame(), r.roi(), r.offset());
        let dst = birdseye_corners(r.roi());
        for (s, d) in src.iter().zip(&dst) {
            let p = r.project_point(*s);
            assert!((p.x - d.x).abs() < 1e-2 && (p.y - d.y).abs() < 1e-2);
        }
    }

    #[test]
    fn round_trip_within_tolerance_for_several_geometries() {
        let configs = [
            ((140, 171), (68, 85)),
            ((100, 100), (110, 60)),
            ((200, 80), (60, 120)),
            ((60, 150), (130, 40)),
            ((250, 60), (30, 170)),
            ((32, 200), (144, 20)),
        ];
        for (roi, offset) in configs {
            let r = rectifier(roi, offset);
            let corners = camera_roi_corners(r.frame(), r.roi(), r.offset());
            // Interior points of the trapezoid: blends of its corners.
            for (wa, wb, wc, wd) in [
                (0.25, 0.25, 0.25, 0.25),
                (0.7, 0.1, 0.1, 0.1),
                (0.1, 0.1, 0.1, 0.7),
                (0.4, 0.4, 0.1, 0.1),
            ] {
                let p = Point2::new(
                    wa * corners[0].x + wb * corners[1].x + wc * corners[2].x + wd * corners[3].x,
                    wa * corners[0].y + wb * corners[1].y + wc * corners[2].y + wd * corners[3].y,
                );
                let back = r.unproject_point(r.project_point(p));
                assert!(
                    (back.x - p.x).abs() < 1e-2 && (back.y - p.y).abs() < 1e-2,
                    "roi={roi:?} offset={offset:?}: {p:?} -> {back:?}"
                );
            }
        }
    }

    #[test]
    fn zero_sized_roi_is_a_configuration_error() {
        let err = BirdsEyeRectifier::new(
            FrameSize::default(),
            RoiSize {
                width: 0,
                height: 171,
            },
            RoiOffset::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RectifyError::EmptyRoi {
                width: 0,
                height: 171
            }
        );
    }

    #[test]
    fn single_column_frame_collapses_bottom_edge() {
        // Bottom-left and bottom-right coincide at x = 0.
        let err = BirdsEyeRectifier::new(
            FrameSize {
                width: 1,
                height: 240,
            },
            RoiSize {
                width: 1,
                height: 100,
            },
            RoiOffset { x: 0, y: 10 },
        )
        .unwrap_err();
        assert_eq!(err, RectifyError::CollinearSourcePoints);
    }

    #[test]
    fn warp_mask_stays_binary() {
        let r = rectifier((140, 171), (68, 85));
        let frame = FrameSize::default();
        let mut mask = GrayImage::new(frame.width, frame.height);
        for y in 100..200 {
            for x in 120..160 {
                mask.set(x, y, 255);
            }
        }
        let warped = r.warp_mask(&mask.view());
        assert_eq!((warped.width, warped.height), (140, 171));
        assert!(warped.data.iter().all(|&v| v == 0 || v == 255));
        assert!(warped.count_nonzero() > 0);
    }

    #[test]
    fn overlay_without_lines_equals_frame() {
        let r = rectifier((140, 171), (68, 85));
        let frame = RgbImage::filled(320, 240, [120, 80, 40]);
        let overlay = r.render_overlay(&frame.view(), &[], [255, 0, 0]);
        assert_eq!(overlay, frame);
    }
}
