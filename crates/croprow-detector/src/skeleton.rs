//! Morphological skeleton by repeated erosion.
//!
//! Each pass keeps the boundary layer `image & !dilate(erode(image))` and
//! continues on the eroded image until it is empty.

use crate::morphology::{dilate_cross, erode_cross};
use croprow_core::GrayImage;
use log::warn;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonParams {
    /// Hard cap on erosion passes. `None` uses `ceil(min(w, h) / 2)`, which
    /// every input reaches zero foreground within.
    pub max_iterations: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skeleton {
    pub mask: GrayImage,
    /// Erosion passes performed.
    pub iterations: usize,
}

/// Upper bound on erosion passes for a `width x height` image.
#[inline]
pub fn max_skeleton_iterations(width: usize, height: usize) -> usize {
    width.min(height).div_ceil(2)
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(mask, params), fields(width = mask.width, height = mask.height))
)]
pub fn skeletonize(mask: &GrayImage, params: &SkeletonParams) -> Skeleton {
    let mut skeleton = GrayImage::new(mask.width, mask.height);
    let limit = params
        .max_iterations
        .unwrap_or_else(|| max_skeleton_iterations(mask.width, mask.height));

    if mask.count_nonzero() == 0 {
        return Skeleton {
            mask: skeleton,
            iterations: 0,
        };
    }

    let mut current = mask.clone();
    let mut iterations = 0;
    loop {
        if iterations >= limit {
            warn!(
                "skeletonization stopped at the iteration cap ({limit}) with {} pixels left",
                current.count_nonzero()
            );
            break;
        }
        let eroded = erode_cross(&current);
        let opened = dilate_cross(&eroded);
        for ((s, &c), &o) in skeleton
            .data
            .iter_mut()
            .zip(&current.data)
            .zip(&opened.data)
        {
            if c != 0 && o == 0 {
                *s = 255;
            }
        }
        iterations += 1;
        if eroded.count_nonzero() == 0 {
            break;
        }
        current = eroded;
    }

    Skeleton {
        mask: skeleton,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in y0..y1 {
            for x in x0..x1 {
                img.set(x, y, 255);
            }
        }
        img
    }

    fn row_width(img: &GrayImage, y: usize) -> usize {
        (0..img.width).filter(|&x| img.get(x, y) != 0).count()
    }

    #[test]
    fn empty_mask_gives_empty_skeleton() {
        let mask = GrayImage::new(40, 30);
        let s = skeletonize(&mask, &SkeletonParams::default());
        assert_eq!(s.mask.count_nonzero(), 0);
        assert_eq!(s.iterations, 0);
    }

    #[test]
    fn filled_rectangle_has_thin_nonempty_skeleton() {
        let mask = filled_rect(60, 50, 10, 5, 25, 45);
        let s = skeletonize(&mask, &SkeletonParams::default());
        assert!(s.mask.count_nonzero() > 0);
        for y in 0..mask.height {
            assert!(row_width(&s.mask, y) <= row_width(&mask, y));
        }
        // Skeleton stays within the shape.
        for (k, m) in s.mask.data.iter().zip(&mask.data) {
            assert!(*k == 0 || *m != 0);
        }
    }

    #[test]
    fn full_image_terminates_within_bound() {
        for (w, h) in [(1, 1), (7, 3), (31, 64), (140, 171)] {
            let mask = filled_rect(w, h, 0, 0, w, h);
            let s = skeletonize(&mask, &SkeletonParams::default());
            assert!(
                s.iterations <= max_skeleton_iterations(w, h),
                "{w}x{h}: {} iterations",
                s.iterations
            );
            assert!(s.mask.count_nonzero() > 0);
        }
    }

    #[test]
    fn iteration_cap_returns_partial_skeleton() {
        let mask = filled_rect(40, 40, 0, 0, 40, 40);
        let s = skeletonize(
            &mask,
            &SkeletonParams {
                max_iterations: Some(2),
            },
        );
        assert_eq!(s.iterations, 2);
        assert!(s.mask.count_nonzero() > 0);
    }
}
