use crate::error::{ClusterError, Result};

/// Dot product with f64 accumulation.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum::<f64>() as f32
}

/// Cosine similarity of two vectors, in `[-1, 1]`. Returns 0 when either
/// vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut d: f64 = 0.0;
    let mut na: f64 = 0.0;
    let mut nb: f64 = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        d += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (d / denom).clamp(-1.0, 1.0) as f32
}

/// Return `v` scaled to unit length. Zero vectors are rejected; `index` is
/// reported in the error.
pub fn l2_normalize(v: &[f32], index: usize) -> Result<Vec<f32>> {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(ClusterError::ZeroNorm(index));
    }
    let scale = 1.0 / norm;
    Ok(v.iter().map(|x| (*x as f64 * scale) as f32).collect())
}

/// Normalize every vector and check they share one dimension.
pub fn normalize_all(vectors: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
    let Some(first) = vectors.first() else {
        return Ok(Vec::new());
    };
    let dim = first.len();
    vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if v.len() != dim {
                return Err(ClusterError::DimensionMismatch {
                    expected: dim,
                    found: v.len(),
                });
            }
            l2_normalize(v, i)
        })
        .collect()
}

/// Index and similarity of the candidate closest to `query`. All inputs must
/// already be unit length. Ties go to the lowest index.
pub fn best_match(query: &[f32], candidates: &[Vec<f32>]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, c) in candidates.iter().enumerate() {
        let s = dot(query, c).clamp(-1.0, 1.0);
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_orthogonal_opposite() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let a = [0.3, -1.2, 4.0, 0.0];
        let b = [2.5, 0.1, -0.7, 9.0];
        let ab = cosine_similarity(&a, &b);
        assert_eq!(ab, cosine_similarity(&b, &a));
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn normalize_unit_length() {
        let v = l2_normalize(&[3.0, 4.0], 0).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_is_error() {
        assert_eq!(l2_normalize(&[0.0, 0.0], 3), Err(ClusterError::ZeroNorm(3)));
        let err = normalize_all(&[vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap_err();
        assert_eq!(err, ClusterError::ZeroNorm(1));
    }

    #[test]
    fn normalize_all_checks_dimension() {
        let err = normalize_all(&[vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, ClusterError::DimensionMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn best_match_prefers_lowest_index_on_tie() {
        let tags = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let (i, s) = best_match(&[1.0, 0.0], &tags).unwrap();
        assert_eq!(i, 1);
        assert!((s - 1.0).abs() < 1e-6);
        assert!(best_match(&[1.0, 0.0], &[]).is_none());
    }
}
