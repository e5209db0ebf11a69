use serde::{Deserialize, Serialize};

/// OpenAI embedding models.
pub const MODEL_OPENAI_3_SMALL: &str = "text-embedding-3-small";
pub const MODEL_OPENAI_3_LARGE: &str = "text-embedding-3-large";

/// DashScope embedding models.
pub const MODEL_DASHSCOPE_V4: &str = "text-embedding-v4";
pub const MODEL_DASHSCOPE_V3: &str = "text-embedding-v3";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

const OPENAI_MAX_BATCH: usize = 2048;
const DASHSCOPE_MAX_BATCH: usize = 10;

/// Configuration for an OpenAI-compatible embedding endpoint.
///
/// Zero / empty fields fall back to the OpenAI defaults when the embedder
/// is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Output dimension requested from the API and enforced on responses.
    pub dimension: usize,
    /// Max texts per HTTP request.
    pub max_batch: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: String::new(),
            model: MODEL_OPENAI_3_SMALL.to_string(),
            dimension: 1536,
            max_batch: OPENAI_MAX_BATCH,
            timeout_secs: 60,
        }
    }
}

impl EmbedConfig {
    /// Preset for Aliyun DashScope's OpenAI-compatible mode.
    pub fn dashscope(api_key: &str) -> Self {
        Self {
            base_url: DASHSCOPE_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: MODEL_DASHSCOPE_V4.to_string(),
            dimension: 1024,
            max_batch: DASHSCOPE_MAX_BATCH,
            ..Self::default()
        }
    }

    /// Preset for the OpenAI embeddings API.
    pub fn openai(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        let d = Self::default();
        if self.base_url.is_empty() {
            self.base_url = d.base_url;
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        if self.model.is_empty() {
            self.model = d.model;
        }
        if self.dimension == 0 {
            self.dimension = d.dimension;
        }
        if self.max_batch == 0 {
            self.max_batch = d.max_batch;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = d.timeout_secs;
        }
        self
    }
}
