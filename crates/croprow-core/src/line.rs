use crate::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Coordinate space a [`RowLine`] is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSpace {
    /// Rectified top-down ROI image (`roi.width x roi.height`).
    BirdsEye,
    /// Camera frame as captured.
    #[default]
    Camera,
}

/// Crop row segment between its top and bottom endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowLine {
    pub top: Point2<f32>,
    pub bottom: Point2<f32>,
}

impl RowLine {
    pub fn new(top: Point2<f32>, bottom: Point2<f32>) -> Self {
        Self { top, bottom }
    }

    /// Horizontal change per unit of vertical change (`dx/dy`).
    ///
    /// Rows are close to vertical, so this stays finite where `dy/dx` would not.
    pub fn dx_dy(&self) -> f32 {
        let dy = self.bottom.y - self.top.y;
        if dy.abs() < f32::EPSILON {
            return f32::INFINITY;
        }
        (self.bottom.x - self.top.x) / dy
    }

    /// Column of the line at row `y` (linear interpolation / extrapolation).
    pub fn x_at(&self, y: f32) -> f32 {
        self.top.x + (y - self.top.y) * self.dx_dy()
    }

    pub fn map(&self, f: impl Fn(Point2<f32>) -> Point2<f32>) -> Self {
        Self::new(f(self.top), f(self.bottom))
    }
}

/// Clip the segment `a-b` to `[0, width-1] x [0, height-1]` (Liang-Barsky).
pub fn clip_segment_to_rect(
    a: Point2<f32>,
    b: Point2<f32>,
    width: usize,
    height: usize,
) -> Option<(Point2<f32>, Point2<f32>)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x_max, y_max) = ((width - 1) as f32, (height - 1) as f32);
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;
    for (p, q) in [
        (-dx, a.x),
        (dx, x_max - a.x),
        (-dy, a.y),
        (dy, y_max - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    if !(t0.is_finite() && t1.is_finite()) {
        return None;
    }

    Some((
        Point2::new(a.x + t0 * dx, a.y + t0 * dy),
        Point2::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}

/// Rasterize `a-b` into `img` with Bresenham; pixels outside the image are skipped.
pub fn draw_segment_rgb(img: &mut RgbImage, a: Point2<f32>, b: Point2<f32>, color: [u8; 3]) {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return;
    }
    let Some((a, b)) = clip_segment_to_rect(a, b, img.width, img.height) else {
        return;
    };
    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 && (x0 as usize) < img.width && (y0 as usize) < img.height {
            img.put_pixel(x0 as usize, y0 as usize, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
