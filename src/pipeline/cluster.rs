//! Cluster engine: flat-kernel mean-shift over embedding vectors.
//!
//! Mean-shift is mode-seeking: every point climbs the estimated density
//! surface until it settles on a mode, and points that settle on the same
//! mode share a label. The number of clusters falls out of the data — it is
//! discovered, never supplied — and singleton clusters are legal output.
//!
//! The implementation is fully deterministic: seeds are the input points in
//! input order, there is no random sampling, and every tie-break is by index.
//! Identical inputs with identical parameters always produce identical
//! labels.
//!
//! Bandwidth defaults to a deterministic estimate (mean distance to the
//! ⌈0.3·n⌉ nearest neighbours, averaged over all points); callers may pin it
//! instead. Whether two near-duplicate topics end up in one cluster or two is
//! governed entirely by this value.

use tracing::debug;

/// Convergence threshold as a fraction of the bandwidth.
const CONVERGENCE_FACTOR: f32 = 1e-3;
/// Iteration cap per seed; mean-shift converges long before this in practice.
const MAX_ITERATIONS: usize = 300;
/// Fraction of the input used as the neighbour count in bandwidth estimation.
const ESTIMATE_QUANTILE: f32 = 0.3;

/// Cluster the vectors, returning one label per input vector (positional).
///
/// Labels are dense integers starting at 0, ordered by mode strength (the
/// mode covering the most points gets label 0). Degenerate inputs terminate
/// without panicking: an empty input yields no labels, and a single vector or
/// an all-identical set yields a single shared label.
pub fn mean_shift(vectors: &[Vec<f32>], bandwidth: Option<f32>) -> Vec<usize> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    let bandwidth = bandwidth.unwrap_or_else(|| estimate_bandwidth(vectors));
    debug!("mean-shift over {n} vectors, bandwidth {bandwidth}");

    // Zero bandwidth means the density surface has no usable scale — all
    // points are coincident (or the caller pinned 0). One cluster.
    if bandwidth <= f32::EPSILON {
        return vec![0; n];
    }

    let tolerance = bandwidth * CONVERGENCE_FACTOR;

    // Climb from every input point.
    let modes: Vec<Vec<f32>> = vectors
        .iter()
        .map(|seed| climb(seed, vectors, bandwidth, tolerance))
        .collect();

    // Merge modes closer than the bandwidth, strongest first. Strength is
    // the number of input points within one bandwidth of the mode; ties
    // break on seed index so the result is stable.
    let mut order: Vec<usize> = (0..n).collect();
    let strength: Vec<usize> = modes
        .iter()
        .map(|m| vectors.iter().filter(|v| euclidean(m, v) <= bandwidth).count())
        .collect();
    order.sort_by(|&a, &b| strength[b].cmp(&strength[a]).then(a.cmp(&b)));

    let mut centers: Vec<Vec<f32>> = Vec::new();
    for &i in &order {
        if !centers.iter().any(|c| euclidean(c, &modes[i]) < bandwidth) {
            centers.push(modes[i].clone());
        }
    }

    debug!("mean-shift found {} cluster(s)", centers.len());

    // Label every point by its nearest surviving center.
    vectors
        .iter()
        .map(|v| nearest(v, &centers))
        .collect()
}

/// Shift a seed to its local mode under a flat kernel.
fn climb(seed: &[f32], vectors: &[Vec<f32>], bandwidth: f32, tolerance: f32) -> Vec<f32> {
    let mut mean = seed.to_vec();

    for _ in 0..MAX_ITERATIONS {
        let mut acc = vec![0.0f32; mean.len()];
        let mut count = 0usize;
        for v in vectors {
            if euclidean(&mean, v) <= bandwidth {
                for (a, x) in acc.iter_mut().zip(v) {
                    *a += x;
                }
                count += 1;
            }
        }
        // The window always contains the seed itself, but guard anyway.
        if count == 0 {
            break;
        }
        for a in acc.iter_mut() {
            *a /= count as f32;
        }
        let shift = euclidean(&mean, &acc);
        mean = acc;
        if shift < tolerance {
            break;
        }
    }

    mean
}

/// Deterministic bandwidth estimate: for each point, the mean distance to
/// its k nearest neighbours (k = ⌈quantile·n⌉), averaged over all points.
fn estimate_bandwidth(vectors: &[Vec<f32>]) -> f32 {
    let n = vectors.len();
    let k = ((n as f32 * ESTIMATE_QUANTILE).ceil() as usize).clamp(1, n - 1);

    let mut total = 0.0f32;
    for (i, v) in vectors.iter().enumerate() {
        let mut dists: Vec<f32> = vectors
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, u)| euclidean(v, u))
            .collect();
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let knn: f32 = dists.iter().take(k).sum::<f32>() / k as f32;
        total += knn;
    }
    total / n as f32
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn nearest(v: &[f32], centers: &[Vec<f32>]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f32::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = euclidean(v, c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}
