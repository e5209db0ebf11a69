use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use tagloop_embed::Embedder;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Texts per embedding request issued by the pipeline.
pub const EMBED_SUB_BATCH: usize = 64;

/// Embed `texts` in sub-batches, up to `cfg.concurrency` requests in flight,
/// each bounded by the embedding timeout. Output order matches input order.
/// Any failure, timeout or length mismatch fails the whole call.
pub async fn embed_texts(
    embedder: &dyn Embedder,
    texts: &[String],
    cfg: &PipelineConfig,
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let timeout = cfg.embed_timeout();
    let chunks: Vec<Vec<&str>> = texts
        .chunks(EMBED_SUB_BATCH)
        .map(|c| c.iter().map(String::as_str).collect())
        .collect();
    debug!(texts = texts.len(), requests = chunks.len(), "embedding");

    let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks)
        .map(|chunk| async move {
            let vectors = tokio::time::timeout(timeout, embedder.embed_batch(&chunk))
                .await
                .map_err(|_| PipelineError::EmbedTimeout(timeout.as_secs()))??;
            if vectors.len() != chunk.len() {
                return Err(PipelineError::LengthMismatch {
                    texts: chunk.len(),
                    vectors: vectors.len(),
                });
            }
            Ok::<_, PipelineError>(vectors)
        })
        .buffered(cfg.concurrency)
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}
