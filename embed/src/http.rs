use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::EmbedConfig;
use crate::embed::Embedder;
use crate::error::EmbedError;

/// Embedder for any OpenAI-compatible `/embeddings` endpoint
/// (OpenAI, DashScope compatible mode, SiliconFlow, a local m3e server, ...).
pub struct HttpEmbedder {
    client: Client,
    cfg: EmbedConfig,
}

impl HttpEmbedder {
    pub fn new(cfg: EmbedConfig) -> Result<Self, EmbedError> {
        let cfg = cfg.normalized();
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| EmbedError::Api(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.cfg.max_batch) {
            debug!(model = %self.cfg.model, n = chunk.len(), "embedding chunk");
            let vecs = crate::openai_compat::call_embedding_api(
                &self.client,
                &self.cfg.api_key,
                &self.cfg.base_url,
                &self.cfg.model,
                self.cfg.dimension,
                self.cfg.timeout_secs,
                chunk,
            )
            .await?;
            result.extend(vecs);
        }
        Ok(result)
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_batch_is_rejected_without_network() {
        let e = HttpEmbedder::new(EmbedConfig::default().with_base_url("http://127.0.0.1:9"))
            .unwrap();
        assert!(matches!(e.embed_batch(&[]).await, Err(EmbedError::EmptyInput)));
        assert!(matches!(e.embed("").await, Err(EmbedError::EmptyInput)));
    }

    #[test]
    fn dimension_comes_from_config() {
        let e = HttpEmbedder::new(EmbedConfig::default().with_dimension(768)).unwrap();
        assert_eq!(e.dimension(), 768);
        assert_eq!(e.model(), crate::config::MODEL_OPENAI_3_SMALL);
    }
}
