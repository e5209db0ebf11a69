//! Edge-case escalation: label a share of unresolved edge records and grow
//! the taxonomy with the labels it does not know yet.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use tagloop_embed::Embedder;
use tagloop_label::{Labeler, generate_label};
use tagloop_store::{NewTag, RecordStore, VectorStore};

use crate::config::PipelineConfig;
use crate::embedding::embed_texts;
use crate::error::Result;
use crate::sampler::{rng, sample_size};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EscalationReport {
    pub unresolved: usize,
    pub sampled: usize,
    /// Distinct labels obtained for the sampled edges.
    pub distinct: usize,
    /// Distinct labels not yet in the taxonomy.
    pub new_labels: usize,
    /// Tags actually inserted.
    pub inserted: usize,
}

pub async fn escalate(
    records: &dyn RecordStore,
    vectors: &dyn VectorStore,
    labeler: &dyn Labeler,
    embedder: &dyn Embedder,
    cfg: &PipelineConfig,
) -> Result<EscalationReport> {
    let unresolved = records.unresolved_edges()?;
    let mut report = EscalationReport {
        unresolved: unresolved.len(),
        ..Default::default()
    };
    if unresolved.is_empty() {
        info!("no unresolved edge records");
        return Ok(report);
    }

    let k = sample_size(unresolved.len(), cfg.edge_sample_rate);
    let mut rng = rng(cfg.seed);
    let mut picked: Vec<_> = unresolved.choose_multiple(&mut rng, k).collect();
    picked.sort_by_key(|e| e.record_id);
    report.sampled = picked.len();

    let timeout = cfg.label_timeout();
    let labels: Vec<(u64, String)> = stream::iter(picked)
        .map(|e| async move {
            let label = generate_label(labeler, &e.content_clean, timeout).await;
            (e.record_id, label)
        })
        .buffered(cfg.concurrency)
        .collect()
        .await;
    for chunk in labels.chunks(cfg.batch_size) {
        records.set_edge_labels(chunk)?;
    }

    let distinct: BTreeSet<&str> = labels.iter().map(|(_, l)| l.as_str()).collect();
    report.distinct = distinct.len();

    let existing = vectors.labels()?;
    let fresh: Vec<String> = distinct
        .into_iter()
        .filter(|l| !existing.contains(*l))
        .map(str::to_string)
        .collect();
    report.new_labels = fresh.len();
    debug!(distinct = report.distinct, new = fresh.len(), "escalated labels");

    if !fresh.is_empty() {
        let embeddings = embed_texts(embedder, &fresh, cfg).await?;
        let tags: Vec<NewTag> = fresh
            .into_iter()
            .zip(embeddings)
            .map(|(label, embedding)| NewTag {
                label,
                embedding,
                cluster_id: None,
            })
            .collect();
        report.inserted = vectors.insert_iterative_tags(&tags)?;
    }

    info!(
        unresolved = report.unresolved,
        sampled = report.sampled,
        new_labels = report.new_labels,
        inserted = report.inserted,
        "escalation done"
    );
    Ok(report)
}
