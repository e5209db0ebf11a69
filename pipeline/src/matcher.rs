//! Embedding-based matching of records against the tag set.
//!
//! Two passes: records without an embedding row are embedded and upserted,
//! then every embedding row is compared against the tags and routed to
//! `matched` or `edge` through [`commit_batch`].

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use tagloop_cluster::{best_match, l2_normalize, normalize_all};
use tagloop_embed::Embedder;
use tagloop_store::{MatchUpdate, Outcome, RecordEmbedding, RecordStore, Tag, VectorStore};

use crate::config::PipelineConfig;
use crate::embedding::embed_texts;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchReport {
    /// Records embedded on this run.
    pub embedded: usize,
    /// Records skipped for empty cleaned text.
    pub skipped: usize,
    pub processed: usize,
    pub matched: usize,
    pub edge: usize,
    pub batches: usize,
}

/// Write one batch of match outcomes to both stores.
///
/// Vector-store rows go first. If the record-store write then fails, the
/// vector rows are left as they are; the next run recomputes them
/// identically before retrying the record-store side.
pub fn commit_batch(
    records: &dyn RecordStore,
    vectors: &dyn VectorStore,
    outcomes: &[Outcome],
) -> Result<()> {
    if outcomes.is_empty() {
        return Ok(());
    }
    let updates: Vec<MatchUpdate> = outcomes.iter().map(Outcome::match_update).collect();
    vectors.record_matches(&updates)?;
    records.apply_outcomes(outcomes)?;
    Ok(())
}

/// Embed every record that has no embedding row yet.
/// Returns (embedded, skipped).
pub async fn embed_missing(
    records: &dyn RecordStore,
    vectors: &dyn VectorStore,
    embedder: &dyn Embedder,
    cfg: &PipelineConfig,
) -> Result<(usize, usize)> {
    let done: HashSet<u64> = vectors.embedded_ids()?;
    let mut embedded = 0;
    let mut skipped = 0;
    let mut after = None;
    loop {
        let page = records.list_records(after, cfg.batch_size)?;
        let Some(last) = page.last() else { break };
        after = Some(last.id);
        let full = page.len() == cfg.batch_size;

        let mut ids = Vec::new();
        let mut texts = Vec::new();
        for r in page {
            if done.contains(&r.id) {
                continue;
            }
            if r.content_clean.trim().is_empty() {
                warn!(record_id = r.id, "empty cleaned text, skipped");
                skipped += 1;
                continue;
            }
            ids.push(r.id);
            texts.push(r.content_clean);
        }

        if !texts.is_empty() {
            let embeddings = embed_texts(embedder, &texts, cfg).await?;
            let rows: Vec<(u64, String, Vec<f32>)> = ids
                .into_iter()
                .zip(texts)
                .zip(embeddings)
                .map(|((id, text), v)| (id, text, v))
                .collect();
            vectors.upsert_embeddings(&rows)?;
            embedded += rows.len();
            debug!(count = rows.len(), "embeddings stored");
        }
        if !full {
            break;
        }
    }
    Ok((embedded, skipped))
}

/// Normalized tag vectors, in tag id order.
struct TagSet {
    tags: Vec<Tag>,
    unit: Vec<Vec<f32>>,
    dim: usize,
}

impl TagSet {
    fn load(vectors: &dyn VectorStore) -> Result<Self> {
        let tags = vectors.tags()?;
        if tags.is_empty() {
            return Err(PipelineError::EmptyTaxonomy);
        }
        let raw: Vec<Vec<f32>> = tags.iter().map(|t| t.embedding.clone()).collect();
        let unit = normalize_all(&raw)?;
        let dim = unit[0].len();
        Ok(Self { tags, unit, dim })
    }

    fn classify(&self, row: &RecordEmbedding, threshold: f32) -> Result<Outcome> {
        if row.embedding.len() != self.dim {
            return Err(PipelineError::DimensionMismatch {
                record_id: row.record_id,
                got: row.embedding.len(),
                want: self.dim,
            });
        }
        let query = l2_normalize(&row.embedding, row.record_id as usize)?;
        let (i, similarity) = best_match(&query, &self.unit).ok_or(PipelineError::EmptyTaxonomy)?;
        let tag = &self.tags[i];
        if similarity >= threshold {
            Ok(Outcome::Matched {
                record_id: row.record_id,
                tag_id: tag.id,
                label: tag.label.clone(),
                similarity,
            })
        } else {
            Ok(Outcome::Edge {
                record_id: row.record_id,
                content_clean: row.content_clean.clone(),
                best: Some((tag.id, similarity)),
            })
        }
    }
}

/// Match every embedded record against the current tag set.
pub fn match_embedded(
    records: &dyn RecordStore,
    vectors: &dyn VectorStore,
    cfg: &PipelineConfig,
) -> Result<MatchReport> {
    let tags = TagSet::load(vectors)?;
    let mut report = MatchReport::default();
    let mut after = None;
    loop {
        let page = vectors.list_embeddings(after, cfg.batch_size)?;
        let Some(last) = page.last() else { break };
        after = Some(last.record_id);
        let full = page.len() == cfg.batch_size;

        let outcomes = page
            .iter()
            .map(|row| tags.classify(row, cfg.similarity_threshold))
            .collect::<Result<Vec<_>>>()?;
        commit_batch(records, vectors, &outcomes)?;

        for o in &outcomes {
            match o {
                Outcome::Matched { .. } => report.matched += 1,
                Outcome::Edge { .. } => report.edge += 1,
            }
        }
        report.processed += outcomes.len();
        report.batches += 1;
        debug!(batch = report.batches, size = outcomes.len(), "match batch committed");
        if !full {
            break;
        }
    }
    Ok(report)
}

/// Embed missing records, then match everything embedded.
pub async fn run_matcher(
    records: &dyn RecordStore,
    vectors: &dyn VectorStore,
    embedder: &dyn Embedder,
    cfg: &PipelineConfig,
) -> Result<MatchReport> {
    let (embedded, skipped) = embed_missing(records, vectors, embedder, cfg).await?;
    let mut report = match_embedded(records, vectors, cfg)?;
    report.embedded = embedded;
    report.skipped = skipped;
    info!(
        embedded,
        skipped,
        processed = report.processed,
        matched = report.matched,
        edge = report.edge,
        "matching done"
    );
    Ok(report)
}
