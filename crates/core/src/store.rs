use crate::error::SearchError;
use crate::models::{Metadata, RetrievedChunk};
use serde::{Deserialize, Serialize};

/// Column-oriented write request: the i-th entry of every vector belongs together.
#[derive(Debug, Clone, Default)]
pub struct IndexBatch {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub metadatas: Vec<Metadata>,
}

impl IndexBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        let expected = self.ids.len();
        if self.documents.len() != expected
            || self.vectors.len() != expected
            || self.metadatas.len() != expected
        {
            return Err(SearchError::Request(format!(
                "index batch columns differ in length: ids={} documents={} vectors={} metadatas={}",
                expected,
                self.documents.len(),
                self.vectors.len(),
                self.metadatas.len()
            )));
        }
        Ok(())
    }

    pub fn into_records(self) -> impl Iterator<Item = StoredRecord> {
        self.ids
            .into_iter()
            .zip(self.documents)
            .zip(self.vectors)
            .zip(self.metadatas)
            .map(|(((id, document), vector), metadata)| StoredRecord {
                id,
                document,
                vector,
                metadata,
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

/// A nearest-neighbour match as reported by a backend; `distance` is cosine distance.
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f64,
}

impl StoreHit {
    pub fn into_retrieved(self) -> RetrievedChunk {
        RetrievedChunk {
            document: self.document,
            metadata: self.metadata,
            distance: Some(self.distance),
        }
    }
}
