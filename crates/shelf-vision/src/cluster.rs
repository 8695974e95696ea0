//! One-dimensional k-means used to split detection centers into shelves.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    #[error("k must be at least 1")]
    ZeroClusters,
    #[error("k={k} exceeds number of values ({n})")]
    TooFewValues { k: usize, n: usize },
    #[error("non-finite value at index {0}")]
    NonFinite(usize),
    #[error("centroid {0} diverged")]
    Diverged(usize),
}

/// Deterministic partition of scalars into `k` labelled groups.
pub trait Cluster1d {
    /// Returns one label in `0..k` per input value, in input order.
    fn assign(&self, values: &[f64], k: usize) -> Result<Vec<usize>, ClusterError>;
}

/// Lloyd's algorithm on a line. Centroids are seeded from evenly spaced
/// quantiles of the sorted input, so there is no randomness at all.
#[derive(Debug, Clone, Copy)]
pub struct Lloyd1d {
    pub max_iterations: usize,
}

impl Default for Lloyd1d {
    fn default() -> Self {
        Self { max_iterations: 300 }
    }
}

impl Cluster1d for Lloyd1d {
    fn assign(&self, values: &[f64], k: usize) -> Result<Vec<usize>, ClusterError> {
        if k == 0 {
            return Err(ClusterError::ZeroClusters);
        }
        if k > values.len() {
            return Err(ClusterError::TooFewValues { k, n: values.len() });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ClusterError::NonFinite(i));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let n = sorted.len();
        let mut centroids: Vec<f64> = (0..k).map(|i| sorted[(2 * i + 1) * n / (2 * k)]).collect();

        let mut labels = vec![0usize; values.len()];
        for iter in 0..self.max_iterations.max(1) {
            let mut changed = iter == 0;
            for (label, &v) in labels.iter_mut().zip(values) {
                let nearest = nearest_centroid(&centroids, v);
                if nearest != *label {
                    *label = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![0.0f64; k];
            let mut counts = vec![0usize; k];
            for (&label, &v) in labels.iter().zip(values) {
                sums[label] += v;
                counts[label] += 1;
            }
            for c in 0..k {
                // empty groups keep their previous centroid
                if counts[c] > 0 {
                    centroids[c] = sums[c] / counts[c] as f64;
                }
                if !centroids[c].is_finite() {
                    return Err(ClusterError::Diverged(c));
                }
            }
        }
        Ok(labels)
    }
}

// Ties go to the lower index.
fn nearest_centroid(centroids: &[f64], v: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = (v - c).abs();
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}
