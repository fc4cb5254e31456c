use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value accepted by every vector index backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Null and blank strings count as absent.
    pub fn is_present(&self) -> bool {
        match self {
            MetadataValue::Null => false,
            MetadataValue::String(value) => !value.trim().is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Null => Ok(()),
            MetadataValue::Bool(value) => write!(f, "{value}"),
            MetadataValue::Int(value) => write!(f, "{value}"),
            MetadataValue::Float(value) => write!(f, "{value}"),
            MetadataValue::String(value) => f.write_str(value),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<Option<i64>> for MetadataValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(MetadataValue::Null, MetadataValue::Int)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Reduce arbitrary JSON metadata to index-safe scalars.
///
/// Strings, integers, floats, booleans and null pass through; arrays and
/// objects are stored as their JSON text.
pub fn clean_metadata(raw: serde_json::Map<String, Value>) -> Metadata {
    raw.into_iter()
        .map(|(key, value)| (key, clean_value(value)))
        .collect()
}

fn clean_value(value: Value) -> MetadataValue {
    match value {
        Value::Null => MetadataValue::Null,
        Value::Bool(flag) => MetadataValue::Bool(flag),
        Value::Number(number) => number
            .as_i64()
            .map(MetadataValue::Int)
            .or_else(|| number.as_f64().map(MetadataValue::Float))
            .unwrap_or_else(|| MetadataValue::String(number.to_string())),
        Value::String(text) => MetadataValue::String(text),
        other => MetadataValue::String(other.to_string()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: usize,
    pub text: String,
    pub token_count: usize,
    pub metadata: Metadata,
}

impl Chunk {
    /// Metadata stored next to the vector: the paper fields plus chunk position and size.
    pub fn index_metadata(&self) -> Metadata {
        let mut merged = self.metadata.clone();
        merged.insert(
            "chunk_id".to_string(),
            MetadataValue::Int(self.chunk_id as i64),
        );
        merged.insert(
            "token_count".to_string(),
            MetadataValue::Int(self.token_count as i64),
        );
        merged
    }
}

/// One entry of a nearest-neighbour answer, in rank order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub document: String,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub index: usize,
    pub text: String,
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerBody {
    Text(String),
    Structured(Value),
}

impl fmt::Display for AnswerBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerBody::Text(text) => f.write_str(text),
            AnswerBody::Structured(value) => {
                let rendered =
                    serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer: AnswerBody,
    pub citations: Vec<Citation>,
    pub citation_map: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Catalog,
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResponse {
    pub question: String,
    pub intent: QueryIntent,
    pub answer: AnswerBody,
    pub citations: Vec<Citation>,
    pub citation_map: BTreeMap<usize, String>,
    pub retrieved_chunks: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_batch_size: usize,
    pub reset: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            embedding_batch_size: 100,
            reset: false,
        }
    }
}
