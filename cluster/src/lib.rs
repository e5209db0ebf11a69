//! Vector math and clustering for taxonomy construction.
//!
//! - [`similarity`]: cosine similarity, L2 normalization, best match.
//! - [`kmeans`]: seeded k-means++ with multiple restarts.
//! - [`silhouette`]: mean silhouette coefficient.
//! - [`select`]: silhouette search over k and the final fit.

pub mod error;
pub mod kmeans;
pub mod select;
pub mod silhouette;
pub mod similarity;

pub use error::ClusterError;
pub use kmeans::{KMeans, KMeansFit};
pub use select::{Clustering, SelectOptions, Selection, choose_k, cluster};
pub use silhouette::silhouette_score;
pub use similarity::{best_match, cosine_similarity, dot, l2_normalize, normalize_all};
