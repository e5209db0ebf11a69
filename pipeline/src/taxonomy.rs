//! Initial taxonomy construction from the sample vocabulary.

use serde::Serialize;
use tracing::{info, warn};

use tagloop_cluster::cluster;
use tagloop_embed::Embedder;
use tagloop_store::{NewTag, RecordStore, VectorStore};

use crate::config::PipelineConfig;
use crate::embedding::embed_texts;
use crate::error::{PipelineError, Result};
use crate::labeling::valid_labels;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxonomyReport {
    /// Labels offered to the builder.
    pub labels: usize,
    pub k: usize,
    /// Tags written as `initial`.
    pub inserted: usize,
    pub silhouette: Option<f32>,
    /// Candidate k and its silhouette score.
    pub scores: Vec<(usize, f32)>,
    pub fallback: bool,
    /// Labels grouped by cluster id.
    pub clusters: Vec<Vec<String>>,
}

/// Cluster `labels` (with their `vectors`) and store them as the new
/// `initial` tag set. Empty input is a no-op.
pub fn build_taxonomy(
    store: &dyn VectorStore,
    labels: &[String],
    vectors: &[Vec<f32>],
    cfg: &PipelineConfig,
) -> Result<TaxonomyReport> {
    if labels.len() != vectors.len() {
        return Err(PipelineError::LengthMismatch {
            texts: labels.len(),
            vectors: vectors.len(),
        });
    }
    if labels.is_empty() {
        info!("no labels, taxonomy unchanged");
        return Ok(TaxonomyReport::default());
    }

    let clustering = cluster(vectors, &cfg.select_options())?;
    let clusters: Vec<Vec<String>> = clustering
        .members()
        .into_iter()
        .map(|m| m.into_iter().map(|i| labels[i].clone()).collect())
        .collect();

    let tags: Vec<NewTag> = labels
        .iter()
        .zip(vectors)
        .zip(&clustering.labels)
        .map(|((label, vector), &c)| NewTag {
            label: label.clone(),
            embedding: vector.clone(),
            cluster_id: Some(c),
        })
        .collect();
    let inserted = store.replace_initial_tags(&tags)?;
    if inserted < tags.len() {
        warn!(
            skipped = tags.len() - inserted,
            "labels already held by iterative tags"
        );
    }

    for (id, members) in clusters.iter().enumerate() {
        info!(cluster = id, size = members.len(), labels = ?members, "cluster");
    }
    info!(
        labels = labels.len(),
        k = clustering.k,
        inserted,
        silhouette = ?clustering.silhouette,
        fallback = clustering.selection.fallback,
        "taxonomy built"
    );

    Ok(TaxonomyReport {
        labels: labels.len(),
        k: clustering.k,
        inserted,
        silhouette: clustering.silhouette,
        scores: clustering.selection.scores,
        fallback: clustering.selection.fallback,
        clusters,
    })
}

/// Embed the valid sample labels and build the taxonomy from them.
pub async fn build_from_samples(
    records: &dyn RecordStore,
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    cfg: &PipelineConfig,
) -> Result<TaxonomyReport> {
    let labels = valid_labels(records)?;
    let vectors = embed_texts(embedder, &labels, cfg).await?;
    build_taxonomy(store, &labels, &vectors, cfg)
}
