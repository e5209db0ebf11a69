//! Label generation for the sample set.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use tagloop_label::{Labeler, UNKNOWN_LABEL, generate_label};
use tagloop_store::RecordStore;

use crate::config::PipelineConfig;
use crate::error::Result;

/// Samples labeled per store commit.
pub const LABEL_COMMIT_CHUNK: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelReport {
    pub samples: usize,
    /// Samples that needed a label on this run.
    pub pending: usize,
    /// Pending samples that still ended up with the sentinel.
    pub unknown: usize,
}

pub(crate) fn needs_label(label: Option<&str>) -> bool {
    label.is_none_or(|l| l == UNKNOWN_LABEL)
}

/// Label every sample whose label is missing or the sentinel, committing
/// every [`LABEL_COMMIT_CHUNK`] samples.
pub async fn label_samples(
    records: &dyn RecordStore,
    labeler: &dyn Labeler,
    cfg: &PipelineConfig,
) -> Result<LabelReport> {
    let samples = records.samples()?;
    let pending: Vec<_> = samples
        .iter()
        .filter(|s| needs_label(s.label.as_deref()))
        .collect();

    let mut report = LabelReport {
        samples: samples.len(),
        pending: pending.len(),
        unknown: 0,
    };
    let timeout = cfg.label_timeout();

    for chunk in pending.chunks(LABEL_COMMIT_CHUNK) {
        let labels: Vec<(u64, String)> = stream::iter(chunk.iter().copied())
            .map(|s| async move {
                let label = generate_label(labeler, &s.content_clean, timeout).await;
                (s.record_id, label)
            })
            .buffered(cfg.concurrency)
            .collect()
            .await;
        report.unknown += labels.iter().filter(|(_, l)| l == UNKNOWN_LABEL).count();
        records.set_sample_labels(&labels)?;
        debug!(count = labels.len(), "sample labels committed");
    }

    info!(
        samples = report.samples,
        labeled = report.pending,
        unknown = report.unknown,
        "samples labeled"
    );
    Ok(report)
}

/// Distinct sample labels usable as taxonomy entries, sorted.
pub fn valid_labels(records: &dyn RecordStore) -> Result<Vec<String>> {
    let mut labels: Vec<String> = records
        .samples()?
        .into_iter()
        .filter_map(|s| s.label)
        .filter(|l| l != UNKNOWN_LABEL)
        .collect();
    labels.sort();
    labels.dedup();
    Ok(labels)
}
