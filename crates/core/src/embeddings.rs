use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_HASHING_DIMENSIONS: usize = 128;

/// Turns text into fixed-length vectors. Transport failures are returned unchanged; no retries.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        self.embed_many(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "embedder".to_string(),
                details: "no vector returned for query".to_string(),
            })
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        (**self).embed_many(texts).await
    }
}

pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/embeddings", base_url.as_ref().trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }

    /// Legacy ada models reject the `dimensions` parameter.
    fn requested_dimensions(&self) -> Option<usize> {
        if self.model.starts_with("text-embedding-ada") {
            None
        } else {
            Some(self.dimensions)
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, batch_size = texts.len(), "embedding batch");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.requested_dimensions(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "openai-embeddings".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(SearchError::BackendResponse {
                backend: "openai-embeddings".to_string(),
                details: format!(
                    "expected {} vectors, received {}",
                    texts.len(),
                    parsed.data.len()
                ),
            });
        }
        if let Some(item) = parsed
            .data
            .iter()
            .find(|item| item.embedding.len() != self.dimensions)
        {
            return Err(SearchError::BackendResponse {
                backend: "openai-embeddings".to_string(),
                details: format!(
                    "expected {}-dimensional vectors, received {}",
                    self.dimensions,
                    item.embedding.len()
                ),
            });
        }
        parsed.data.sort_by_key(|item| item.index);

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Deterministic character-trigram embedder for offline runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    pub dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_HASHING_DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashingEmbedder, OpenAiEmbedder, DEFAULT_EMBEDDING_MODEL};
    use crate::SearchError;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Option<Value>>>;

    /// Local `/embeddings` endpoint recording the last request body. Vectors have the
    /// requested `dimensions`, or `fixed_len` when given.
    async fn mock_embeddings(
        fixed_len: Option<usize>,
    ) -> Result<(String, Captured), Box<dyn std::error::Error>> {
        let captured: Captured = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&captured);
        let app = Router::new().route(
            "/embeddings",
            post(move |Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    let requested = body["dimensions"].as_u64().map(|d| d as usize);
                    let len = fixed_len.or(requested).unwrap_or(1536);
                    let inputs = body["input"].as_array().map(Vec::len).unwrap_or(0);
                    if let Ok(mut slot) = sink.lock() {
                        *slot = Some(body);
                    }
                    let data = (0..inputs)
                        .map(|index| json!({"index": index, "embedding": vec![0.5f32; len]}))
                        .collect::<Vec<_>>();
                    Json(json!({ "data": data }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok((format!("http://{addr}"), captured))
    }

    #[tokio::test]
    async fn configured_dimensions_are_requested() -> Result<(), Box<dyn std::error::Error>> {
        let (base_url, captured) = mock_embeddings(None).await?;
        let embedder = OpenAiEmbedder::new(&base_url, "sk-test", DEFAULT_EMBEDDING_MODEL, 256);

        let vector = embedder.embed_one("hello").await?;
        assert_eq!(vector.len(), 256);

        let body = captured
            .lock()
            .map_err(|_| "poisoned")?
            .clone()
            .ok_or("no request captured")?;
        assert_eq!(body["model"], DEFAULT_EMBEDDING_MODEL);
        assert_eq!(body["input"], json!(["hello"]));
        assert_eq!(body["dimensions"], 256);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_vector_length_is_a_backend_error() -> Result<(), Box<dyn std::error::Error>> {
        let (base_url, _) = mock_embeddings(Some(1536)).await?;
        let embedder = OpenAiEmbedder::new(&base_url, "sk-test", DEFAULT_EMBEDDING_MODEL, 256);

        let result = embedder.embed_many(&["hello".to_string()]).await;
        assert!(matches!(result, Err(SearchError::BackendResponse { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn ada_models_omit_dimensions() -> Result<(), Box<dyn std::error::Error>> {
        let (base_url, captured) = mock_embeddings(None).await?;
        let embedder = OpenAiEmbedder::new(&base_url, "sk-test", "text-embedding-ada-002", 1536);

        embedder.embed_one("hello").await?;
        let body = captured
            .lock()
            .map_err(|_| "poisoned")?
            .clone()
            .ok_or("no request captured")?;
        assert!(body.get("dimensions").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn hashing_embedder_is_deterministic() -> Result<(), crate::SearchError> {
        let embedder = HashingEmbedder::default();
        let first = embedder.embed_one("Graph neural networks").await?;
        let second = embedder.embed_one("Graph neural networks").await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn embed_many_preserves_order_and_length() -> Result<(), crate::SearchError> {
        let embedder = HashingEmbedder { dimensions: 32 };
        let texts = vec!["alpha beta".to_string(), "gamma delta".to_string()];
        let vectors = embedder.embed_many(&texts).await?;
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|vector| vector.len() == 32));
        assert_eq!(vectors[1], embedder.embed_text("gamma delta"));
        Ok(())
    }
}
