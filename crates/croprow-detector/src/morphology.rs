//! Binary erosion and dilation with the 3x3 cross structuring element.
//!
//! Pixels outside the image count as background for both operations.

use croprow_core::GrayImage;

const CROSS: [(isize, isize); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

#[inline]
fn is_set(img: &GrayImage, x: isize, y: isize) -> bool {
    x >= 0
        && y >= 0
        && (x as usize) < img.width
        && (y as usize) < img.height
        && img.data[y as usize * img.width + x as usize] != 0
}

/// A pixel survives if it and its four neighbours are all set.
pub fn erode_cross(img: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            let (xi, yi) = (x as isize, y as isize);
            if CROSS.iter().all(|&(dx, dy)| is_set(img, xi + dx, yi + dy)) {
                out.data[y * img.width + x] = 255;
            }
        }
    }
    out
}

/// A pixel is set if it or any of its four neighbours is set.
pub fn dilate_cross(img: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            let (xi, yi) = (x as isize, y as isize);
            if CROSS.iter().any(|&(dx, dy)| is_set(img, xi + dx, yi + dy)) {
                out.data[y * img.width + x] = 255;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in y0..y1 {
            for x in x0..x1 {
                img.set(x, y, 255);
            }
        }
        img
    }

    #[test]
    fn erosion_peels_one_layer() {
        let img = block(7, 7, 1, 1, 6, 6);
        assert_eq!(erode_cross(&img), block(7, 7, 2, 2, 5, 5));
    }

    #[test]
    fn border_touching_shapes_erode_from_the_edge() {
        let img = block(4, 4, 0, 0, 4, 4);
        assert_eq!(erode_cross(&img), block(4, 4, 1, 1, 3, 3));
    }

    #[test]
    fn dilation_grows_a_single_pixel_into_a_cross() {
        let img = block(5, 5, 2, 2, 3, 3);
        let d = dilate_cross(&img);
        assert_eq!(d.count_nonzero(), 5);
        assert_eq!(d.get(2, 1), 255);
        assert_eq!(d.get(1, 1), 0);
    }
}
