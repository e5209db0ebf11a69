//! Automatic choice of the cluster count.

use tracing::{debug, warn};

use crate::error::{ClusterError, Result};
use crate::kmeans::KMeans;
use crate::silhouette::silhouette_score;

/// Inputs smaller than this skip the search and use `min(2, n)` clusters.
pub const MIN_SEARCH_POINTS: usize = 10;

/// Cluster count used when the search yields nothing usable.
pub const FALLBACK_K: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectOptions {
    /// Upper bound (exclusive) on candidate k.
    pub max_clusters: usize,
    /// When the best score is below this floor, fall back to [`FALLBACK_K`].
    pub min_silhouette: Option<f32>,
    pub seed: u64,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            max_clusters: 20,
            min_silhouette: None,
            seed: crate::kmeans::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub k: usize,
    /// Silhouette score of every candidate that could be scored.
    pub scores: Vec<(usize, f32)>,
    /// True when `k` is the fallback rather than a scored winner.
    pub fallback: bool,
}

/// Pick `k` for `data`.
///
/// Candidates are `2..min(max_clusters, n / 5 + 1)`; the highest silhouette
/// wins and ties go to the smallest `k`. Candidates that cannot be fitted or
/// scored are dropped.
pub fn choose_k(data: &[Vec<f32>], opts: &SelectOptions) -> Result<Selection> {
    let n = data.len();
    if n == 0 {
        return Err(ClusterError::EmptyInput);
    }
    if n < MIN_SEARCH_POINTS {
        return Ok(Selection {
            k: n.min(2),
            scores: Vec::new(),
            fallback: false,
        });
    }

    let upper = opts.max_clusters.min(n / 5 + 1);
    let mut scores = Vec::new();
    let mut best: Option<(usize, f32)> = None;
    for k in 2..upper {
        let score = KMeans::new(k)
            .with_seed(opts.seed)
            .fit(data)
            .and_then(|fit| silhouette_score(data, &fit.labels));
        match score {
            Ok(s) => {
                debug!(k, silhouette = s, "scored candidate");
                scores.push((k, s));
                if best.is_none_or(|(_, b)| s > b) {
                    best = Some((k, s));
                }
            }
            Err(e) => warn!(k, error = %e, "candidate dropped"),
        }
    }

    let Some((k, score)) = best else {
        warn!(n, upper, "no usable candidate, falling back");
        return Ok(Selection {
            k: FALLBACK_K,
            scores,
            fallback: true,
        });
    };
    match opts.min_silhouette {
        Some(floor) if score < floor => {
            warn!(k, silhouette = score, floor, "best score below floor, falling back");
            return Ok(Selection {
                k: FALLBACK_K,
                scores,
                fallback: true,
            });
        }
        _ => {}
    }
    Ok(Selection {
        k,
        scores,
        fallback: false,
    })
}

/// Final assignment of points to clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub k: usize,
    pub labels: Vec<usize>,
    /// Silhouette of the final fit, when defined.
    pub silhouette: Option<f32>,
    pub selection: Selection,
}

impl Clustering {
    /// Indices of the points in each cluster.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.k];
        for (i, &c) in self.labels.iter().enumerate() {
            out[c].push(i);
        }
        out
    }
}

/// Choose `k` and fit the final clustering. A single point is cluster 0.
pub fn cluster(data: &[Vec<f32>], opts: &SelectOptions) -> Result<Clustering> {
    if data.len() == 1 {
        return Ok(Clustering {
            k: 1,
            labels: vec![0],
            silhouette: None,
            selection: Selection {
                k: 1,
                scores: Vec::new(),
                fallback: false,
            },
        });
    }
    let selection = choose_k(data, opts)?;
    let fit = KMeans::new(selection.k).with_seed(opts.seed).fit(data)?;
    let silhouette = silhouette_score(data, &fit.labels).ok();
    Ok(Clustering {
        k: selection.k,
        labels: fit.labels,
        silhouette,
        selection,
    })
}
