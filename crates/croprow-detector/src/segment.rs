//! Vegetation segmentation by an HSV range test.

use croprow_core::{GrayImage, RgbImageView};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Inclusive HSV range on the 8-bit scale (hue 0..180, saturation and value 0..255).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for HsvRange {
    fn default() -> Self {
        Self {
            lower: [37, 0, 0],
            upper: [150, 255, 255],
        }
    }
}

impl HsvRange {
    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// Convert one RGB pixel to 8-bit HSV.
///
/// Hue is in degrees halved (0..180), so it fits a byte. Grays have hue 0.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(i32::from);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = if v == 0 {
        0
    } else {
        (255.0 * diff as f32 / v as f32).round() as i32
    };

    let h = if diff == 0 {
        0.0
    } else if v == r {
        60.0 * (g - b) as f32 / diff as f32
    } else if v == g {
        120.0 + 60.0 * (b - r) as f32 / diff as f32
    } else {
        240.0 + 60.0 * (r - g) as f32 / diff as f32
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    let h = ((h / 2.0).round() as i32).rem_euclid(180);

    [h as u8, s.clamp(0, 255) as u8, v as u8]
}

/// Binary vegetation mask (255 = foreground) with the frame's dimensions.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame, range), fields(width = frame.width, height = frame.height))
)]
pub fn segment_vegetation(frame: &RgbImageView<'_>, range: &HsvRange) -> GrayImage {
    let mut mask = GrayImage::new(frame.width, frame.height);
    for (dst, px) in mask.data.iter_mut().zip(frame.data.chunks_exact(3)) {
        if range.contains(rgb_to_hsv([px[0], px[1], px[2]])) {
            *dst = 255;
        }
    }
    mask
}
