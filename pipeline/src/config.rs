use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tagloop_cluster::SelectOptions;
use tagloop_cluster::kmeans::DEFAULT_SEED;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("similarity_threshold must be in [-1, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("max_clusters must be at least 2, got {0}")]
    TooFewClusters(usize),
}

/// Settings shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of each (product, channel) stratum drawn as samples.
    pub sample_rate: f64,
    /// Fraction of unresolved edge records sent to escalation.
    pub edge_sample_rate: f64,
    /// Minimum cosine similarity for a match.
    pub similarity_threshold: f32,
    /// Exclusive upper bound on the cluster count search.
    pub max_clusters: usize,
    pub batch_size: usize,
    /// Bound on concurrent embedding and label requests.
    pub concurrency: usize,
    pub label_timeout_secs: u64,
    pub embed_timeout_secs: u64,
    /// Fall back to 2 clusters when the best silhouette is below this.
    pub min_silhouette: Option<f32>,
    /// Seed for sampling and clustering. Sampling is unseeded when absent.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 0.01,
            edge_sample_rate: 0.1,
            similarity_threshold: 0.6,
            max_clusters: 20,
            batch_size: 1000,
            concurrency: 4,
            label_timeout_secs: 30,
            embed_timeout_secs: 60,
            min_silhouette: None,
            seed: None,
        }
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("sample_rate", self.sample_rate)?;
        check_rate("edge_sample_rate", self.edge_sample_rate)?;
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold(self.similarity_threshold));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Zero("concurrency"));
        }
        if self.label_timeout_secs == 0 {
            return Err(ConfigError::Zero("label_timeout_secs"));
        }
        if self.embed_timeout_secs == 0 {
            return Err(ConfigError::Zero("embed_timeout_secs"));
        }
        if self.max_clusters < 2 {
            return Err(ConfigError::TooFewClusters(self.max_clusters));
        }
        Ok(())
    }

    pub fn label_timeout(&self) -> Duration {
        Duration::from_secs(self.label_timeout_secs)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    pub fn select_options(&self) -> SelectOptions {
        SelectOptions {
            max_clusters: self.max_clusters,
            min_silhouette: self.min_silhouette,
            seed: self.seed.unwrap_or(DEFAULT_SEED),
        }
    }
}
