//! Iterative tag-closure pipeline.
//!
//! Records are sampled per (product, channel) stratum, the samples are
//! labeled, the label vocabulary is clustered into the initial taxonomy,
//! every record is matched to its closest tag by cosine similarity, and
//! records below the threshold are escalated to grow the taxonomy for the
//! next run.
//!
//! ```text
//! sample -> label -> cluster -> match -> escalate
//!                                 ^          |
//!                                 +----------+
//! ```
//!
//! Each stage can run alone; [`Pipeline::run`] runs them in order.

pub mod config;
pub mod embedding;
pub mod error;
pub mod escalation;
pub mod labeling;
pub mod matcher;
pub mod pipeline;
pub mod sampler;
pub mod taxonomy;

pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, Result};
pub use escalation::EscalationReport;
pub use labeling::LabelReport;
pub use matcher::{MatchReport, commit_batch};
pub use pipeline::{Pipeline, RunReport, Stage, Stats};
pub use sampler::{SampleReport, sample_size};
pub use taxonomy::TaxonomyReport;
