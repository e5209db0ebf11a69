use crate::error::{ClusterError, Result};
use crate::kmeans::squared_distance;

/// Mean silhouette coefficient over all points, Euclidean distance.
///
/// Points alone in their cluster score 0. Fails when the labeling has fewer
/// than 2 clusters or as many clusters as points, where the coefficient is
/// undefined.
pub fn silhouette_score(data: &[Vec<f32>], labels: &[usize]) -> Result<f32> {
    let n = data.len();
    if n == 0 {
        return Err(ClusterError::EmptyInput);
    }
    if labels.len() != n {
        return Err(ClusterError::Degenerate(format!(
            "{} labels for {n} points",
            labels.len()
        )));
    }

    let k = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    let used = sizes.iter().filter(|s| **s > 0).count();
    if used < 2 || used >= n {
        return Err(ClusterError::Degenerate(format!(
            "{used} non-empty clusters for {n} points"
        )));
    }

    let mut total = 0.0f64;
    let mut sums = vec![0f64; k];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += squared_distance(&data[i], &data[j]).sqrt();
            }
        }
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|c| *c != own && sizes[*c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok((total / n as f64) as f32)
}
