use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("pipeline: config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline: store error: {0}")]
    Store(#[from] tagloop_store::StoreError),

    #[error("pipeline: embed error: {0}")]
    Embed(#[from] tagloop_embed::EmbedError),

    #[error("pipeline: cluster error: {0}")]
    Cluster(#[from] tagloop_cluster::ClusterError),

    #[error("pipeline: embedding timed out after {0}s")]
    EmbedTimeout(u64),

    #[error("pipeline: {texts} texts but {vectors} vectors")]
    LengthMismatch { texts: usize, vectors: usize },

    #[error("pipeline: dimension mismatch: record {record_id} has {got}, tags have {want}")]
    DimensionMismatch {
        record_id: u64,
        got: usize,
        want: usize,
    },

    #[error("pipeline: no tags to match against")]
    EmptyTaxonomy,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
