//! File-backed vector index: one JSON document per collection, searched by brute-force cosine.

use crate::store::{IndexBatch, StoreHit, StoredRecord};
use crate::traits::VectorIndex;
use crate::SearchError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

type Collection = BTreeMap<String, StoredRecord>;

pub struct LocalVectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, Collection>>,
}

impl LocalVectorStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, SearchError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn collection_path(&self, name: &str) -> Result<PathBuf, SearchError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SearchError::Request(format!(
                "invalid collection name: {name:?}"
            )));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    async fn persist(&self, name: &str, collection: &Collection) -> Result<(), SearchError> {
        let path = self.collection_path(name)?;
        let records = collection.values().collect::<Vec<_>>();
        let encoded = serde_json::to_vec(&records)?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, encoded).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }
}

/// Every record in a collection shares the length of the first vector written to it.
fn collection_dimension(collection: &Collection) -> Option<usize> {
    collection.values().next().map(|record| record.vector.len())
}

fn check_dimension(expected: usize, actual: usize) -> Result<(), SearchError> {
    if expected != actual {
        return Err(SearchError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for LocalVectorStore {
    async fn create_collection(&self, name: &str) -> Result<(), SearchError> {
        let path = self.collection_path(name)?;
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(());
        }

        let collection = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<StoredRecord> = serde_json::from_slice(&bytes)?;
                records
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect()
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Collection::new(),
            Err(error) => return Err(error.into()),
        };

        debug!(collection = name, entries = collection.len(), "opened local collection");
        if !path.exists() {
            self.persist(name, &collection).await?;
        }
        collections.insert(name.to_string(), collection);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), SearchError> {
        let path = self.collection_path(name)?;
        self.collections.write().await.remove(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn add(&self, collection: &str, batch: IndexBatch) -> Result<(), SearchError> {
        batch.validate()?;
        let mut collections = self.collections.write().await;
        let entries = collections.get_mut(collection).ok_or_else(|| {
            SearchError::Request(format!("collection '{collection}' does not exist"))
        })?;

        if let Some(expected) =
            collection_dimension(entries).or_else(|| batch.vectors.first().map(Vec::len))
        {
            for vector in &batch.vectors {
                check_dimension(expected, vector.len())?;
            }
        }

        for record in batch.into_records() {
            entries.insert(record.id.clone(), record);
        }

        self.persist(collection, entries).await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<StoreHit>, SearchError> {
        let collections = self.collections.read().await;
        let entries = collections.get(collection).ok_or_else(|| {
            SearchError::Request(format!("collection '{collection}' does not exist"))
        })?;
        if let Some(expected) = collection_dimension(entries) {
            check_dimension(expected, vector.len())?;
        }

        let mut hits = entries
            .values()
            .map(|record| StoreHit {
                id: record.id.clone(),
                document: record.document.clone(),
                metadata: record.metadata.clone(),
                distance: 1.0 - cosine_similarity(vector, &record.vector),
            })
            .collect::<Vec<_>>();

        hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        hits.truncate(k);
        Ok(hits)
    }
}
