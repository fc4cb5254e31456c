use crate::models::Metadata;
use crate::store::{IndexBatch, StoreHit};
use crate::traits::VectorIndex;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

pub struct QdrantStore {
    endpoint: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(endpoint: &str, vector_size: usize) -> Result<Self, SearchError> {
        let parsed = Url::parse(endpoint)?;
        Ok(Self {
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            client: Client::new(),
            vector_size,
        })
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}", self.endpoint, name)
    }
}

/// Qdrant only accepts integer or UUID point ids; derive a stable UUID from the string id.
pub fn point_id(id: &str) -> Uuid {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

fn backend_error(details: impl Into<String>) -> SearchError {
    SearchError::BackendResponse {
        backend: "qdrant".to_string(),
        details: details.into(),
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn create_collection(&self, name: &str) -> Result<(), SearchError> {
        let response = self.client.get(self.collection_url(name)).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response.status().to_string()));
        }

        let response = self
            .client
            .put(self.collection_url(name))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(format!(
                "collection setup failed with {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), SearchError> {
        let response = self.client.delete(self.collection_url(name)).send().await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(backend_error(response.status().to_string()))
    }

    async fn add(&self, collection: &str, batch: IndexBatch) -> Result<(), SearchError> {
        batch.validate()?;
        if batch.is_empty() {
            return Ok(());
        }

        let points = batch
            .into_records()
            .map(|record| {
                if record.vector.len() != self.vector_size {
                    return Err(SearchError::DimensionMismatch {
                        expected: self.vector_size,
                        actual: record.vector.len(),
                    });
                }

                Ok(json!({
                    "id": point_id(&record.id).to_string(),
                    "vector": record.vector,
                    "payload": {
                        "id": record.id,
                        "document": record.document,
                        "metadata": record.metadata,
                    },
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url(collection)))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<StoreHit>, SearchError> {
        if vector.len() != self.vector_size {
            return Err(SearchError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len(),
            });
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url(collection)))
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status().to_string()));
        }

        let parsed: Value = response.json().await?;
        parse_search_hits(&parsed)
    }
}

fn parse_search_hits(parsed: &Value) -> Result<Vec<StoreHit>, SearchError> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .ok_or_else(|| backend_error("search response has no result array"))?;

    hits.iter()
        .map(|hit| {
            let id = hit
                .pointer("/payload/id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let document = hit
                .pointer("/payload/document")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let metadata = match hit.pointer("/payload/metadata") {
                Some(value) => serde_json::from_value::<Metadata>(value.clone()).map_err(|error| {
                    backend_error(format!("point {id} has malformed metadata: {error}"))
                })?,
                None => Metadata::new(),
            };
            let score = hit
                .pointer("/score")
                .and_then(Value::as_f64)
                .ok_or_else(|| backend_error(format!("point {id} has no score")))?;

            Ok(StoreHit {
                id,
                document,
                metadata,
                distance: 1.0 - score,
            })
        })
        .collect()
}
