use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Planar projective transform acting on homogeneous pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let q = self.apply_f64(p.x as f64, p.y as f64);
        Point2::new(q.x as f32, q.y as f32)
    }

    /// Same as [`Homography::apply`] but keeps double precision.
    #[inline]
    pub fn apply_f64(&self, x: f64, y: f64) -> Point2<f64> {
        let v = self.h * Vector3::new(x, y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    pub fn inverse(&self) -> Option<Self> {
        let inv = self.h.try_inverse()?;
        let inv = normalize_homography(inv)?;
        inv.iter().all(|v| v.is_finite()).then(|| Self::new(inv))
    }

    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

// Translate to centroid, scale so the mean distance is sqrt(2).
fn normalize_points4(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;

    let mean_dist = pts
        .iter()
        .map(|p| {
            let dx = p.x as f64 - cx;
            let dy = p.y as f64 - cy;
            (dx * dx + dy * dy).sqrt()
        })
        .sum::<f64>()
        / 4.0;

    let t = hartley_normalization(cx, cy, mean_dist);

    let mut out = [Point2::new(0.0_f64, 0.0_f64); 4];
    for (o, p) in out.iter_mut().zip(pts) {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        *o = Point2::new(v[0], v[1]);
    }

    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

/// Compute H such that `dst ~ H * src` from exactly four correspondences.
///
/// Returns `None` when the linear system is singular or the solution is not
/// finite. Callers that need a precise reason should validate the point
/// configuration first.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    // (x,y)->(u,v):
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let x = src_n[k].x;
        let y = src_n[k].y;
        let u = dst_n[k].x;
        let v = dst_n[k].y;

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    // H = T_dst^-1 * Hn * T_src
    let h_den = t_dst.try_inverse()? * hn * t_src;
    let h_den = normalize_homography(h_den)?;

    let h = Homography::new(h_den);
    h.is_finite().then_some(h)
}

/// Warp `src` into an `out_w x out_h` image.
///
/// Every output pixel `(x, y)` is mapped through `h_src_from_dst` at its
/// integer coordinate and bilinearly sampled; points that land outside `src`
/// read as 0.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, h_src_from_dst), fields(src_w = src.width, src_h = src.height))
)]
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            let ps = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
            out.data[y * out_w + x] = sample_bilinear_u8(src, ps.x, ps.y);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn inverse_maps_rectangle_back_onto_trapezoid() {
        let trapezoid = [
            Point2::new(40.0_f32, 60.0),
            Point2::new(140.0, 60.0),
            Point2::new(0.0, 220.0),
            Point2::new(239.0, 220.0),
        ];
        let rect = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(0.0, 160.0),
            Point2::new(100.0, 160.0),
        ];
        let h = homography_from_4pt(&trapezoid, &rect).expect("non-degenerate");
        let inv = h.inverse().expect("invertible");
        for (s, d) in trapezoid.iter().zip(&rect) {
            assert_close(inv.apply(*d), *s, 1e-2);
        }
        // Rectangle center lands inside the trapezoid, between its edges.
        let c = inv.apply(Point2::new(50.0, 80.0));
        assert!(c.y > 60.0 && c.y < 220.0, "{c:?}");
        assert!(c.x > 0.0 && c.x < 239.0, "{c:?}");
    }

    #[test]
    fn trapezoid_maps_onto_rectangle_corners() {
        let trapezoid = [
            Point2::new(68.0_f32, 85.0),
            Point2::new(208.0, 85.0),
            Point2::new(0.0, 256.0),
            Point2::new(319.0, 256.0),
        ];
        let rect = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(140.0, 0.0),
            Point2::new(0.0, 171.0),
            Point2::new(140.0, 171.0),
        ];
        let h = homography_from_4pt(&trapezoid, &rect).expect("non-degenerate");
        for (s, d) in trapezoid.iter().zip(&rect) {
            assert_close(h.apply(*s), *d, 1e-3);
        }
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let h = Homography::new(Matrix3::new(
            1.0, 2.0, 3.0, //
            2.0, 4.0, 6.0, //
            0.0, 0.0, 1.0,
        ));
        assert!(h.inverse().is_none());
    }

    #[test]
    fn identity_warp_copies_pixels() {
        let src = GrayImage {
            width: 3,
            height: 2,
            data: vec![0, 255, 0, 255, 0, 255],
        };
        let out = warp_perspective_gray(&src.view(), Homography::identity(), 3, 2);
        assert_eq!(out, src);
    }
}
