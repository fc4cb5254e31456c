use crate::store::{IndexBatch, StoreHit};
use crate::SearchError;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistent nearest-neighbour index keyed by collection name, cosine space.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Get-or-create; calling it for an existing collection is a no-op.
    async fn create_collection(&self, name: &str) -> Result<(), SearchError>;

    /// Deleting a collection that does not exist is not an error.
    async fn delete_collection(&self, name: &str) -> Result<(), SearchError>;

    /// Writing an id that already exists replaces the stored entry.
    async fn add(&self, collection: &str, batch: IndexBatch) -> Result<(), SearchError>;

    /// Up to `k` entries ranked by ascending cosine distance.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<StoreHit>, SearchError>;
}

#[async_trait]
impl<T: VectorIndex + ?Sized> VectorIndex for Arc<T> {
    async fn create_collection(&self, name: &str) -> Result<(), SearchError> {
        (**self).create_collection(name).await
    }

    async fn delete_collection(&self, name: &str) -> Result<(), SearchError> {
        (**self).delete_collection(name).await
    }

    async fn add(&self, collection: &str, batch: IndexBatch) -> Result<(), SearchError> {
        (**self).add(collection, batch).await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<StoreHit>, SearchError> {
        (**self).query(collection, vector, k).await
    }
}
