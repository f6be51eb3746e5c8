//! Straight-line fits of row clusters, column as a function of row.

use crate::cluster::Clustering;
use croprow_core::RowLine;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFitParams {
    /// Clusters spanning this many rows or fewer are not fitted.
    pub min_vertical_extent: usize,
}

impl Default for LineFitParams {
    fn default() -> Self {
        Self {
            min_vertical_extent: 70,
        }
    }
}

/// `col = slope * row + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    #[inline]
    pub fn col_at(&self, row: f64) -> f64 {
        self.slope * row + self.intercept
    }

    /// Segment from row 0 to row `height - 1`.
    pub fn to_row_line(&self, height: usize) -> RowLine {
        let bottom = height.saturating_sub(1) as f64;
        RowLine::new(
            Point2::new(self.col_at(0.0) as f32, 0.0),
            Point2::new(self.col_at(bottom) as f32, bottom as f32),
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum LineFitFailure {
    #[error("need at least two points, got {count}")]
    TooFewPoints { count: usize },
    #[error("all points lie on one row")]
    ZeroRowVariance,
    #[error("fit produced non-finite coefficients")]
    NonFinite,
}

/// A fitted cluster in bird's-eye space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FittedRow {
    pub label: usize,
    pub fit: LineFit,
    pub line: RowLine,
    pub point_count: usize,
}

/// Least-squares fit of column against row over `(row, col)` points.
pub fn fit_line(points: &[(usize, usize)]) -> Result<LineFit, LineFitFailure> {
    let n = points.len();
    if n < 2 {
        return Err(LineFitFailure::TooFewPoints { count: n });
    }
    let nf = n as f64;
    let mean_r = points.iter().map(|&(r, _)| r as f64).sum::<f64>() / nf;
    let mean_c = points.iter().map(|&(_, c)| c as f64).sum::<f64>() / nf;

    let (mut srr, mut src) = (0.0, 0.0);
    for &(r, c) in points {
        let dr = r as f64 - mean_r;
        srr += dr * dr;
        src += dr * (c as f64 - mean_c);
    }
    if srr <= f64::EPSILON {
        return Err(LineFitFailure::ZeroRowVariance);
    }

    let slope = src / srr;
    let intercept = mean_c - slope * mean_r;
    if !(slope.is_finite() && intercept.is_finite()) {
        return Err(LineFitFailure::NonFinite);
    }
    Ok(LineFit { slope, intercept })
}

/// Fit every cluster tall enough and extend it over a `height`-row image.
///
/// Clusters that fail the extent test or the fit are skipped. The result is
/// sorted by the column of the top endpoint.
pub fn fit_row_lines(
    clustering: &Clustering,
    height: usize,
    params: &LineFitParams,
) -> Vec<FittedRow> {
    let mut rows = Vec::new();
    for label in 0..clustering.num_clusters() {
        let members = clustering.members(label);
        let rows_of = members.iter().map(|&(r, _)| r);
        let (Some(min_r), Some(max_r)) = (rows_of.clone().min(), rows_of.max()) else {
            continue;
        };
        if max_r - min_r <= params.min_vertical_extent {
            debug!(
                "cluster {label}: vertical extent {} too short, skipped",
                max_r - min_r
            );
            continue;
        }
        match fit_line(&members) {
            Ok(fit) => rows.push(FittedRow {
                label,
                fit,
                line: fit.to_row_line(height),
                point_count: members.len(),
            }),
            Err(err) => debug!("cluster {label}: line fit failed ({err}), skipped"),
        }
    }
    rows.sort_by(|a, b| a.line.top.x.total_cmp(&b.line.top.x));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterStrategy, Clustering};
    use approx::assert_relative_eq;

    fn clustering_of(groups: Vec<Vec<(usize, usize)>>) -> Clustering {
        let mut points = Vec::new();
        let mut labels = Vec::new();
        let mut modes = Vec::new();
        for (label, group) in groups.into_iter().enumerate() {
            modes.push(group[0].1 as f64);
            labels.extend(std::iter::repeat_n(Some(label), group.len()));
            points.extend(group);
        }
        Clustering {
            points,
            labels,
            modes,
            bandwidth: 1.0,
            strategy: ClusterStrategy::Adaptive,
        }
    }

    #[test]
    fn slanted_segment_gives_analytic_endpoints() {
        let col = |r: usize| 0.2 * r as f64 + 15.0;
        let pts: Vec<(usize, usize)> = (10..=300).map(|r| (r, col(r).round() as usize)).collect();
        let rows = fit_row_lines(&clustering_of(vec![pts]), 320, &LineFitParams::default());
        assert_eq!(rows.len(), 1);
        let line = rows[0].line;
        assert_relative_eq!(line.top.x as f64, col(0), epsilon = 1.0);
        assert_relative_eq!(line.bottom.x as f64, col(319), epsilon = 1.0);
        assert_relative_eq!(line.top.y, 0.0);
        assert_relative_eq!(line.bottom.y, 319.0);
    }

    #[test]
    fn short_cluster_is_rejected() {
        let pts: Vec<(usize, usize)> = (100..120).map(|r| (r, 50)).collect();
        let rows = fit_row_lines(&clustering_of(vec![pts]), 320, &LineFitParams::default());
        assert!(rows.is_empty());
    }

    #[test]
    fn failing_cluster_does_not_drop_the_others() {
        let tall: Vec<(usize, usize)> = (0..150).map(|r| (r, 80)).collect();
        let short: Vec<(usize, usize)> = vec![(5, 10)];
        let rows = fit_row_lines(
            &clustering_of(vec![short, tall]),
            171,
            &LineFitParams::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, 1);
        assert_relative_eq!(rows[0].fit.slope, 0.0);
    }

    #[test]
    fn degenerate_inputs_report_a_reason() {
        assert_eq!(
            fit_line(&[(3, 4)]),
            Err(LineFitFailure::TooFewPoints { count: 1 })
        );
        assert_eq!(
            fit_line(&[(3, 4), (3, 9)]),
            Err(LineFitFailure::ZeroRowVariance)
        );
    }

    #[test]
    fn lines_are_sorted_by_top_column() {
        let right: Vec<(usize, usize)> = (0..100).map(|r| (r, 120)).collect();
        let left: Vec<(usize, usize)> = (0..100).map(|r| (r, 30)).collect();
        let rows = fit_row_lines(
            &clustering_of(vec![right, left]),
            100,
            &LineFitParams::default(),
        );
        let tops: Vec<f32> = rows.iter().map(|r| r.line.top.x).collect();
        assert_eq!(tops.len(), 2);
        assert!(tops[0] < tops[1]);
    }
}
