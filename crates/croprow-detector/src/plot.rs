//! Cluster diagnostics rendered in bird's-eye space.

use crate::detector::CropRowDebug;
use croprow_core::{draw_segment_rgb, RgbImage};

const PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
];
const NOISE: [u8; 3] = [128, 128, 128];
const LINE: [u8; 3] = [255, 255, 255];

#[inline]
pub fn label_color(label: Option<usize>) -> [u8; 3] {
    label.map_or(NOISE, |l| PALETTE[l % PALETTE.len()])
}

/// Skeleton pixels colored by cluster (noise gray) with the fitted lines in white.
pub fn render_cluster_plot(debug: &CropRowDebug) -> RgbImage {
    let (w, h) = (debug.skeleton.width, debug.skeleton.height);
    let mut plot = RgbImage::new(w, h);
    let clustering = &debug.clustering;
    for (&(row, col), &label) in clustering.points.iter().zip(&clustering.labels) {
        if row < h && col < w {
            plot.put_pixel(col, row, label_color(label));
        }
    }
    for fitted in &debug.fitted {
        draw_segment_rgb(&mut plot, fitted.line.top, fitted.line.bottom, LINE);
    }
    plot
}
