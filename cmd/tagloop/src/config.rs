//! CLI configuration file.
//!
//! YAML or JSON, chosen by extension. Default location is
//! `~/.tagloop/config.yaml`; a missing default file means all defaults.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tagloop_embed::EmbedConfig;
use tagloop_label::LabelerConfig;
use tagloop_pipeline::PipelineConfig;

const APP_DIR: &str = ".tagloop";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
    pub embedder: EmbedConfig,
    pub labeler: LabelerConfig,
}

/// redb files for the two stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub records: PathBuf,
    pub vectors: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let dir = app_dir();
        Self {
            records: dir.join("records.redb"),
            vectors: dir.join("vectors.redb"),
        }
    }
}

pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE)
}

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let (path, explicit) = match path {
        Some(p) => (PathBuf::from(p), true),
        None => (default_config_path(), false),
    };
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let mut cfg = parse_config(&path)?;
    cfg.expand_env();
    Ok(cfg)
}

fn parse_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml")
        .to_lowercase();
    let cfg = match ext.as_str() {
        "json" => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    Ok(cfg)
}

impl Config {
    fn expand_env(&mut self) {
        self.embedder.base_url = expand_env(&self.embedder.base_url);
        self.embedder.api_key = expand_env(&self.embedder.api_key);
        match &mut self.labeler {
            LabelerConfig::Openai(c) => {
                c.base_url = expand_env(&c.base_url);
                c.api_key = expand_env(&c.api_key);
            }
            LabelerConfig::Coze(c) => {
                c.url = expand_env(&c.url);
                c.api_key = expand_env(&c.api_key);
                c.app_id = expand_env(&c.app_id);
            }
        }
    }
}

/// Expand a value of the form `$VAR` or `${VAR}` from the environment.
/// Unset variables become empty; other values pass through.
pub fn expand_env(s: &str) -> String {
    let Some(rest) = s.strip_prefix('$') else {
        return s.to_string();
    };
    let name = rest
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(rest);
    std::env::var(name).unwrap_or_default()
}
