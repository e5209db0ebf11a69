use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::EmbedError;

/// OpenAI-compatible embedding request body.
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    dimensions: usize,
    encoding_format: &'a str,
}

/// OpenAI-compatible embedding response.
#[derive(Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub(crate) data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
pub(crate) struct EmbeddingData {
    pub(crate) index: usize,
    pub(crate) embedding: Vec<f64>,
}

/// Call an OpenAI-compatible `/embeddings` endpoint for one chunk of texts.
pub(crate) async fn call_embedding_api(
    client: &Client,
    api_key: &str,
    base_url: &str,
    model: &str,
    dimensions: usize,
    timeout_secs: u64,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>, EmbedError> {
    let url = format!("{base_url}/embeddings");
    let body = EmbeddingRequest {
        model,
        input: texts,
        dimensions,
        encoding_format: "float",
    };

    let mut req = client.post(&url).json(&body);
    if !api_key.is_empty() {
        req = req.bearer_auth(api_key);
    }

    let resp = req.send().await.map_err(|e| {
        if e.is_timeout() {
            EmbedError::Timeout(timeout_secs)
        } else {
            EmbedError::Api(e.to_string())
        }
    })?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(EmbedError::Api(format!("HTTP {status}: {body}")));
    }

    let data: EmbeddingResponse = resp
        .json()
        .await
        .map_err(|e| EmbedError::Api(e.to_string()))?;

    assemble(data, texts.len(), dimensions)
}

/// Place response items by index and verify every slot is filled with a
/// vector of the expected dimension.
pub(crate) fn assemble(
    data: EmbeddingResponse,
    batch_size: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    // API may return items out of order.
    let mut vecs: Vec<Option<Vec<f32>>> = vec![None; batch_size];
    for item in data.data {
        if item.index >= batch_size {
            return Err(EmbedError::UnexpectedIndex {
                index: item.index,
                batch_size,
            });
        }
        if item.embedding.len() != dimensions {
            return Err(EmbedError::DimensionMismatch {
                got: item.embedding.len(),
                want: dimensions,
            });
        }
        vecs[item.index] = Some(item.embedding.iter().map(|&v| v as f32).collect());
    }

    vecs.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or(EmbedError::MissingIndex(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> EmbeddingResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn assemble_reorders_by_index() {
        let data = response(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        );
        let vecs = assemble(data, 2, 2).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn assemble_missing_slot() {
        let data = response(r#"{"data": [{"index": 0, "embedding": [1.0, 0.0]}]}"#);
        let err = assemble(data, 2, 2).unwrap_err();
        assert!(matches!(err, EmbedError::MissingIndex(1)));
    }

    #[test]
    fn assemble_out_of_range_index() {
        let data = response(r#"{"data": [{"index": 5, "embedding": [1.0, 0.0]}]}"#);
        let err = assemble(data, 1, 2).unwrap_err();
        assert!(matches!(err, EmbedError::UnexpectedIndex { index: 5, batch_size: 1 }));
    }

    #[test]
    fn assemble_wrong_dimension() {
        let data = response(r#"{"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}"#);
        let err = assemble(data, 1, 2).unwrap_err();
        assert!(matches!(err, EmbedError::DimensionMismatch { got: 3, want: 2 }));
    }
}
