//! Synthetic field frames built from stripes defined in bird's-eye space.

use croprow::core::{BirdsEyeRectifier, RgbImage};
use nalgebra::Point2;

pub const GREEN: [u8; 3] = [40, 160, 40];
pub const SOIL: [u8; 3] = [139, 90, 43];

/// Soil frame with vertical bird's-eye stripes `|x - c| <= half_width` painted green.
///
/// Every camera pixel is mapped into bird's-eye space, so the stripes appear
/// as converging rows in the camera frame.
pub fn striped_frame(rectifier: &BirdsEyeRectifier, centers: &[f32], half_width: f32) -> RgbImage {
    let frame = rectifier.frame();
    let mut img = RgbImage::filled(frame.width, frame.height, SOIL);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let p = rectifier.project_point(Point2::new(x as f32, y as f32));
            if !(p.x.is_finite() && p.y.is_finite()) {
                continue;
            }
            if centers.iter().any(|c| (p.x - c).abs() <= half_width) {
                img.put_pixel(x, y, GREEN);
            }
        }
    }
    img
}

pub fn soil_frame(width: usize, height: usize) -> RgbImage {
    RgbImage::filled(width, height, SOIL)
}
