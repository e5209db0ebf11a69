//! K-means with k-means++ initialization.
//!
//! Lloyd iterations on squared Euclidean distance. Each fit runs `n_init`
//! times from independent k-means++ seeds drawn from one seeded RNG and keeps
//! the run with the lowest inertia, so a fixed seed gives a fixed result.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::{ClusterError, Result};

pub const DEFAULT_SEED: u64 = 42;

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster id per input point.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
}

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iter: usize,
    tol: f64,
    n_init: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&self, data: &[Vec<f32>]) -> Result<KMeansFit> {
        let n = data.len();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if self.k == 0 || self.k > n {
            return Err(ClusterError::InvalidClusterCount { k: self.k, n });
        }
        let d = data[0].len();
        if let Some(bad) = data.iter().find(|p| p.len() != d) {
            return Err(ClusterError::DimensionMismatch {
                expected: d,
                found: bad.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init {
            let fit = self.lloyd(data, &mut rng);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or(ClusterError::EmptyInput)
    }

    fn init_centroids(&self, data: &[Vec<f32>], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let n = data.len();
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(data[rng.gen_range(0..n)].clone());

        let mut dist: Vec<f64> = data
            .iter()
            .map(|p| squared_distance(p, &centroids[0]))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = dist.iter().sum();
            let next = if total == 0.0 {
                rng.gen_range(0..n)
            } else {
                let threshold = rng.r#gen::<f64>() * total;
                let mut cumsum = 0.0;
                let mut selected = n - 1;
                for (j, d) in dist.iter().enumerate() {
                    cumsum += d;
                    if cumsum >= threshold {
                        selected = j;
                        break;
                    }
                }
                selected
            };
            let c = data[next].clone();
            for (p, d) in data.iter().zip(dist.iter_mut()) {
                *d = d.min(squared_distance(p, &c));
            }
            centroids.push(c);
        }
        centroids
    }

    fn lloyd(&self, data: &[Vec<f32>], rng: &mut StdRng) -> KMeansFit {
        let n = data.len();
        let d = data[0].len();
        let mut centroids = self.init_centroids(data, rng);
        let mut labels = vec![0usize; n];

        for _ in 0..self.max_iter {
            for (p, label) in data.iter().zip(labels.iter_mut()) {
                *label = nearest(p, &centroids).0;
            }

            let mut sums = vec![vec![0f64; d]; self.k];
            let mut counts = vec![0usize; self.k];
            for (p, &l) in data.iter().zip(&labels) {
                for (s, x) in sums[l].iter_mut().zip(p) {
                    *s += *x as f64;
                }
                counts[l] += 1;
            }

            let mut shift = 0.0;
            for c in 0..self.k {
                let updated: Vec<f32> = if counts[c] > 0 {
                    sums[c].iter().map(|s| (s / counts[c] as f64) as f32).collect()
                } else {
                    // Empty cluster: restart it on a random point.
                    data[rng.gen_range(0..n)].clone()
                };
                shift += squared_distance(&updated, &centroids[c]);
                centroids[c] = updated;
            }
            if shift <= self.tol {
                break;
            }
        }

        let mut inertia = 0.0;
        for (p, label) in data.iter().zip(labels.iter_mut()) {
            let (c, dist) = nearest(p, &centroids);
            *label = c;
            inertia += dist;
        }
        KMeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}

fn nearest(p: &[f32], centroids: &[Vec<f32>]) -> (usize, f64) {
    let mut best = (0, f64::MAX);
    for (i, c) in centroids.iter().enumerate() {
        let dist = squared_distance(p, c);
        if dist < best.1 {
            best = (i, dist);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        let mut v = Vec::new();
        for i in 0..10 {
            let j = i as f32 * 0.01;
            v.push(vec![0.0 + j, 0.0 - j]);
            v.push(vec![10.0 + j, 10.0 - j]);
            v.push(vec![-10.0 - j, 10.0 + j]);
        }
        v
    }

    #[test]
    fn separates_obvious_blobs() {
        let data = blobs();
        let fit = KMeans::new(3).fit(&data).unwrap();
        for chunk in fit.labels.chunks(3) {
            assert_eq!(chunk[0], fit.labels[0]);
            assert_eq!(chunk[1], fit.labels[1]);
            assert_eq!(chunk[2], fit.labels[2]);
        }
        assert_ne!(fit.labels[0], fit.labels[1]);
        assert_ne!(fit.labels[1], fit.labels[2]);
        assert_ne!(fit.labels[0], fit.labels[2]);
    }

    #[test]
    fn same_seed_same_result() {
        let data = blobs();
        let a = KMeans::new(4).with_seed(7).fit(&data).unwrap();
        let b = KMeans::new(4).with_seed(7).fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_k() {
        let data = vec![vec![1.0], vec![2.0]];
        assert_eq!(
            KMeans::new(3).fit(&data).unwrap_err(),
            ClusterError::InvalidClusterCount { k: 3, n: 2 }
        );
        assert!(KMeans::new(0).fit(&data).is_err());
        assert_eq!(KMeans::new(1).fit(&[]).unwrap_err(), ClusterError::EmptyInput);
    }

    #[test]
    fn identical_points_do_not_panic() {
        let data = vec![vec![1.0, 1.0]; 5];
        let fit = KMeans::new(2).fit(&data).unwrap();
        assert_eq!(fit.labels.len(), 5);
        assert_eq!(fit.inertia, 0.0);
    }
}
