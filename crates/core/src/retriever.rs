use crate::embeddings::Embedder;
use crate::models::RetrievedChunk;
use crate::traits::VectorIndex;
use crate::SearchError;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 5;

/// Embeds a query and asks the index for its nearest chunks. Ranking is the index's.
pub struct Retriever<E: Embedder, V: VectorIndex> {
    embedder: E,
    index: V,
    collection: String,
}

impl<E: Embedder, V: VectorIndex> Retriever<E, V> {
    pub fn new(embedder: E, index: V, collection: impl Into<String>) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let vector = self.embedder.embed_one(query).await?;
        let hits = self.index.query(&self.collection, &vector, top_k).await?;
        debug!(collection = %self.collection, top_k, hits = hits.len(), "retrieved chunks");
        Ok(hits.into_iter().map(|hit| hit.into_retrieved()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::models::Metadata;
    use crate::store::IndexBatch;
    use crate::stores::LocalVectorStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn retrieve_returns_most_similar_chunk_first() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let embedder = HashingEmbedder::default();
        let store = LocalVectorStore::open(dir.path()).await?;
        store.create_collection("papers").await?;

        let documents = vec![
            "graph neural networks pass messages between nodes".to_string(),
            "protein folding with attention models".to_string(),
        ];
        let vectors = embedder.embed_many(&documents).await?;
        store
            .add(
                "papers",
                IndexBatch {
                    ids: vec!["p1_chunk_0000".to_string(), "p2_chunk_0000".to_string()],
                    documents: documents.clone(),
                    vectors,
                    metadatas: vec![Metadata::new(), Metadata::new()],
                },
            )
            .await?;

        let retriever = Retriever::new(embedder, store, "papers");
        let chunks = retriever.retrieve("graph neural networks", 1).await?;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document, documents[0]);
        assert!(chunks[0].distance.is_some());
        Ok(())
    }
}
