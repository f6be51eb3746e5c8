//! Row clustering of skeleton pixels by 1-D mean-shift over their columns.
//!
//! The primary pass estimates its bandwidth from the data and seeds from a
//! coarse histogram, so sparse columns end up as noise. When that pass has
//! nothing to work with (zero bandwidth, no populated bin, no converged mode)
//! a second pass with every point as a seed and a floored bandwidth labels
//! everything.

use croprow_core::GrayImage;
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Mean-shift configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanShiftParams {
    /// Fraction of the points used as the neighbour count of the bandwidth estimate.
    pub quantile: f64,
    /// Seed from histogram bins of width `bandwidth` instead of every point.
    pub bin_seeding: bool,
    /// Minimum population of a bin to become a seed.
    pub min_bin_freq: usize,
    /// Label every point, including ones farther than `bandwidth` from all modes.
    pub cluster_all: bool,
    pub max_iterations: usize,
    /// Lower bound applied to the estimated bandwidth.
    pub min_bandwidth: f64,
}

impl Default for MeanShiftParams {
    fn default() -> Self {
        Self {
            quantile: 0.15,
            bin_seeding: true,
            min_bin_freq: 15,
            cluster_all: false,
            max_iterations: 300,
            min_bandwidth: 0.0,
        }
    }
}

impl MeanShiftParams {
    /// Permissive settings used after the primary pass degenerates.
    pub fn fallback() -> Self {
        Self {
            quantile: 0.3,
            bin_seeding: false,
            min_bin_freq: 1,
            cluster_all: true,
            max_iterations: 300,
            min_bandwidth: 1.0,
        }
    }
}

/// Why a mean-shift pass produced no clustering.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ClusteringDegenerate {
    #[error("no points to cluster")]
    NoPoints,
    #[error("bandwidth {bandwidth} is not usable")]
    ZeroBandwidth { bandwidth: f64 },
    #[error("no bin reached the minimum frequency")]
    NoSeeds,
    #[error("no seed converged to a populated mode")]
    NoModes,
}

/// Which pass produced the labels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClusterStrategy {
    Adaptive,
    Fallback { reason: ClusteringDegenerate },
}

/// Modes and per-point labels of one mean-shift pass.
#[derive(Clone, Debug, PartialEq)]
pub struct MeanShiftOutcome {
    /// Kept modes, most populated first.
    pub modes: Vec<f64>,
    /// Index into `modes`; `None` marks noise.
    pub labels: Vec<Option<usize>>,
    pub bandwidth: f64,
}

/// Clustered skeleton pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Clustering {
    /// `(row, col)` of every skeleton pixel, row-major.
    pub points: Vec<(usize, usize)>,
    pub labels: Vec<Option<usize>>,
    /// Column of each cluster's mode; labels index into this.
    pub modes: Vec<f64>,
    pub bandwidth: f64,
    pub strategy: ClusterStrategy,
}

impl Clustering {
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            labels: Vec::new(),
            modes: Vec::new(),
            bandwidth: 0.0,
            strategy: ClusterStrategy::Adaptive,
        }
    }

    #[inline]
    pub fn num_clusters(&self) -> usize {
        self.modes.len()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }

    /// Points carrying `label`.
    pub fn members(&self, label: usize) -> Vec<(usize, usize)> {
        self.points
            .iter()
            .zip(&self.labels)
            .filter(|(_, l)| **l == Some(label))
            .map(|(p, _)| *p)
            .collect()
    }
}

/// Sorted samples with prefix sums for window queries.
struct SortedSamples {
    values: Vec<f64>,
    prefix: Vec<f64>,
}

impl SortedSamples {
    fn new(points: &[f64]) -> Self {
        let mut values = points.to_vec();
        values.sort_by(f64::total_cmp);
        let mut prefix = Vec::with_capacity(values.len() + 1);
        prefix.push(0.0);
        let mut acc = 0.0;
        for v in &values {
            acc += v;
            prefix.push(acc);
        }
        Self { values, prefix }
    }

    /// Count and sum of samples with `|x - center| <= radius`.
    fn window(&self, center: f64, radius: f64) -> (usize, f64) {
        let lo = self.values.partition_point(|&v| v < center - radius);
        let hi = self.values.partition_point(|&v| v <= center + radius);
        if hi <= lo {
            return (0, 0.0);
        }
        (hi - lo, self.prefix[hi] - self.prefix[lo])
    }
}

/// Mean distance from each point to its `k`-th nearest neighbour, the point
/// itself included, with `k = max(1, floor(n * quantile))`.
pub fn estimate_bandwidth(points: &[f64], quantile: f64) -> f64 {
    let n = points.len();
    if n == 0 {
        return 0.0;
    }
    let k = ((n as f64 * quantile).floor() as usize).clamp(1, n);

    let mut sorted = points.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut total = 0.0;
    for i in 0..n {
        // In 1-D the k nearest samples form a window around i; grow it by
        // the closer side until it holds k samples.
        let (mut left, mut right) = (i, i);
        let mut kth = 0.0;
        for _ in 1..k {
            let dl = (left > 0).then(|| sorted[i] - sorted[left - 1]);
            let dr = (right + 1 < n).then(|| sorted[right + 1] - sorted[i]);
            match (dl, dr) {
                (Some(l), Some(r)) if l <= r => {
                    left -= 1;
                    kth = l;
                }
                (_, Some(r)) => {
                    right += 1;
                    kth = r;
                }
                (Some(l), None) => {
                    left -= 1;
                    kth = l;
                }
                (None, None) => break,
            }
        }
        total += kth;
    }
    total / n as f64
}

fn bin_seeds(points: &[f64], bandwidth: f64, min_bin_freq: usize) -> Vec<f64> {
    let mut bins: Vec<(i64, usize)> = Vec::new();
    let mut keys: Vec<i64> = points
        .iter()
        .map(|x| (x / bandwidth).round_ties_even() as i64)
        .collect();
    keys.sort_unstable();
    for key in keys {
        match bins.last_mut() {
            Some((k, count)) if *k == key => *count += 1,
            _ => bins.push((key, 1)),
        }
    }

    let seeds: Vec<f64> = bins
        .iter()
        .filter(|(_, count)| *count >= min_bin_freq)
        .map(|(k, _)| *k as f64 * bandwidth)
        .collect();
    if seeds.len() == points.len() {
        // Binning did not coarsen anything.
        return points.to_vec();
    }
    seeds
}

/// Shift `seed` to the local density peak. Returns the mode and the
/// population of its last window, or `None` if the window emptied.
fn climb(
    samples: &SortedSamples,
    seed: f64,
    bandwidth: f64,
    max_iterations: usize,
) -> Option<(f64, usize)> {
    let stop = 1e-3 * bandwidth;
    let mut mean = seed;
    let mut iterations = 0;
    loop {
        let (count, sum) = samples.window(mean, bandwidth);
        if count == 0 {
            return None;
        }
        let previous = mean;
        mean = sum / count as f64;
        if (mean - previous).abs() <= stop || iterations == max_iterations {
            return Some((mean, count));
        }
        iterations += 1;
    }
}

/// One mean-shift pass over 1-D samples.
pub fn mean_shift(
    points: &[f64],
    params: &MeanShiftParams,
) -> Result<MeanShiftOutcome, ClusteringDegenerate> {
    if points.is_empty() {
        return Err(ClusteringDegenerate::NoPoints);
    }

    let bandwidth = estimate_bandwidth(points, params.quantile).max(params.min_bandwidth);
    if !(bandwidth.is_finite() && bandwidth > 0.0) {
        return Err(ClusteringDegenerate::ZeroBandwidth { bandwidth });
    }

    let seeds = if params.bin_seeding {
        bin_seeds(points, bandwidth, params.min_bin_freq)
    } else {
        points.to_vec()
    };
    if seeds.is_empty() {
        return Err(ClusteringDegenerate::NoSeeds);
    }

    let samples = SortedSamples::new(points);
    let mut candidates: Vec<(f64, usize)> = seeds
        .iter()
        .filter_map(|&s| climb(&samples, s, bandwidth, params.max_iterations))
        .collect();
    if candidates.is_empty() {
        return Err(ClusteringDegenerate::NoModes);
    }

    // Most populated first; ties go to the larger position.
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.total_cmp(&a.0)));
    let mut modes: Vec<f64> = Vec::new();
    for (mode, _) in candidates {
        if modes.iter().all(|m| (m - mode).abs() > bandwidth) {
            modes.push(mode);
        }
    }

    let labels = points
        .iter()
        .map(|&x| {
            let (idx, dist) = modes
                .iter()
                .enumerate()
                .map(|(i, m)| (i, (x - m).abs()))
                .fold((0, f64::INFINITY), |best, cur| {
                    if cur.1 < best.1 {
                        cur
                    } else {
                        best
                    }
                });
            (params.cluster_all || dist <= bandwidth).then_some(idx)
        })
        .collect();

    Ok(MeanShiftOutcome {
        modes,
        labels,
        bandwidth,
    })
}

/// Cluster `(row, col)` points by column.
///
/// Runs `primary` and, if it degenerates, `fallback`. Empty input gives an
/// empty clustering.
pub fn cluster_points(
    points: Vec<(usize, usize)>,
    primary: &MeanShiftParams,
    fallback: &MeanShiftParams,
) -> Clustering {
    if points.is_empty() {
        return Clustering::empty();
    }
    let cols: Vec<f64> = points.iter().map(|&(_, c)| c as f64).collect();

    let (outcome, strategy) = match mean_shift(&cols, primary) {
        Ok(outcome) => (Ok(outcome), ClusterStrategy::Adaptive),
        Err(reason) => {
            debug!("adaptive mean-shift degenerate ({reason}), using fallback");
            (
                mean_shift(&cols, fallback),
                ClusterStrategy::Fallback { reason },
            )
        }
    };

    match outcome {
        Ok(outcome) => Clustering {
            points,
            labels: outcome.labels,
            modes: outcome.modes,
            bandwidth: outcome.bandwidth,
            strategy,
        },
        Err(reason) => {
            debug!("fallback mean-shift degenerate ({reason}), all points are noise");
            let n = points.len();
            Clustering {
                points,
                labels: vec![None; n],
                modes: Vec::new(),
                bandwidth: 0.0,
                strategy,
            }
        }
    }
}

/// Cluster the foreground pixels of a skeleton.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(width = skeleton.width, height = skeleton.height))
)]
pub fn cluster_skeleton(
    skeleton: &GrayImage,
    primary: &MeanShiftParams,
    fallback: &MeanShiftParams,
) -> Clustering {
    cluster_points(skeleton.nonzero_coords(), primary, fallback)
}
