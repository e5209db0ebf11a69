use std::fmt;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;
use tracing::{error, info};

use tagloop_embed::Embedder;
use tagloop_label::Labeler;
use tagloop_store::ingest::{self, IngestReport, RawFeedback};
use tagloop_store::{RecordStats, RecordStore, TagCounts, VectorStore};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::escalation::{EscalationReport, escalate};
use crate::labeling::{LabelReport, label_samples};
use crate::matcher::{MatchReport, run_matcher};
use crate::sampler::{SampleReport, draw_samples};
use crate::taxonomy::{TaxonomyReport, build_from_samples};

/// The five stages, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sample,
    Label,
    Cluster,
    Match,
    Escalate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Sample => "sample",
            Stage::Label => "label",
            Stage::Cluster => "cluster",
            Stage::Match => "match",
            Stage::Escalate => "escalate",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub records: RecordStats,
    pub tags: TagCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub sample: SampleReport,
    pub label: LabelReport,
    pub taxonomy: TaxonomyReport,
    pub matching: MatchReport,
    pub escalation: EscalationReport,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// The tag pipeline over one pair of stores.
///
/// Stages can run one at a time or all in order with [`Pipeline::run`].
pub struct Pipeline {
    cfg: PipelineConfig,
    records: Box<dyn RecordStore>,
    vectors: Box<dyn VectorStore>,
    embedder: Box<dyn Embedder>,
    labeler: Box<dyn Labeler>,
}

impl Pipeline {
    /// Create a pipeline. The config is validated here.
    pub fn new(
        cfg: PipelineConfig,
        records: Box<dyn RecordStore>,
        vectors: Box<dyn VectorStore>,
        embedder: Box<dyn Embedder>,
        labeler: Box<dyn Labeler>,
    ) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            records,
            vectors,
            embedder,
            labeler,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn vectors(&self) -> &dyn VectorStore {
        self.vectors.as_ref()
    }

    pub fn ingest(&self, items: &[RawFeedback]) -> Result<IngestReport> {
        Ok(ingest::ingest(
            self.records.as_ref(),
            items,
            Local::now().naive_local(),
        )?)
    }

    pub fn sample(&self) -> Result<SampleReport> {
        draw_samples(self.records.as_ref(), self.cfg.sample_rate, self.cfg.seed)
    }

    pub async fn label(&self) -> Result<LabelReport> {
        label_samples(self.records.as_ref(), self.labeler.as_ref(), &self.cfg).await
    }

    pub async fn build_taxonomy(&self) -> Result<TaxonomyReport> {
        build_from_samples(
            self.records.as_ref(),
            self.vectors.as_ref(),
            self.embedder.as_ref(),
            &self.cfg,
        )
        .await
    }

    pub async fn match_records(&self) -> Result<MatchReport> {
        run_matcher(
            self.records.as_ref(),
            self.vectors.as_ref(),
            self.embedder.as_ref(),
            &self.cfg,
        )
        .await
    }

    pub async fn escalate(&self) -> Result<EscalationReport> {
        escalate(
            self.records.as_ref(),
            self.vectors.as_ref(),
            self.labeler.as_ref(),
            self.embedder.as_ref(),
            &self.cfg,
        )
        .await
    }

    /// Run all five stages in order. The first failing stage stops the run;
    /// batches committed before it stay committed.
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        info!("pipeline run started");

        let sample = logged(Stage::Sample, async { self.sample() }).await?;
        let label = logged(Stage::Label, self.label()).await?;
        let taxonomy = logged(Stage::Cluster, self.build_taxonomy()).await?;
        let matching = logged(Stage::Match, self.match_records()).await?;
        let escalation = logged(Stage::Escalate, self.escalate()).await?;

        let elapsed = start.elapsed();
        info!(elapsed_secs = elapsed.as_secs_f64(), "pipeline run finished");
        Ok(RunReport {
            sample,
            label,
            taxonomy,
            matching,
            escalation,
            elapsed,
        })
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            records: self.records.stats(Local::now().date_naive())?,
            tags: self.vectors.tag_counts()?,
        })
    }
}

async fn logged<T>(stage: Stage, fut: impl Future<Output = Result<T>>) -> Result<T> {
    info!(%stage, "stage started");
    let start = Instant::now();
    match fut.await {
        Ok(v) => {
            info!(%stage, elapsed_ms = start.elapsed().as_millis() as u64, "stage finished");
            Ok(v)
        }
        Err(e) => {
            error!(%stage, error = %e, "stage failed");
            Err(e)
        }
    }
}
