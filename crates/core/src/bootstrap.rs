//! Turns an [`AppConfig`] into ready-to-use components.

use crate::catalog::Catalog;
use crate::config::{AppConfig, EmbeddingProvider, IndexBackend};
use crate::embeddings::{Embedder, HashingEmbedder, OpenAiEmbedder};
use crate::extractor::LopdfExtractor;
use crate::generator::Generator;
use crate::ingest::CatalogIngestor;
use crate::llm::{LanguageModel, OpenAiChatModel};
use crate::models::IngestionOptions;
use crate::orchestrator::ResearchPipeline;
use crate::prompts::PromptLibrary;
use crate::retriever::Retriever;
use crate::router::MetadataRouter;
use crate::stores::{LocalVectorStore, QdrantStore};
use crate::tokenizer::TiktokenTokenizer;
use crate::traits::VectorIndex;
use crate::{ConfigError, PipelineError, SearchError};
use std::sync::Arc;
use tracing::info;

pub type SharedEmbedder = Arc<dyn Embedder>;
pub type SharedIndex = Arc<dyn VectorIndex>;
pub type SharedModel = Arc<dyn LanguageModel>;

pub type SharedPipeline = ResearchPipeline<SharedEmbedder, SharedIndex, SharedModel>;
pub type SharedIngestor =
    CatalogIngestor<LopdfExtractor, TiktokenTokenizer, SharedEmbedder, SharedIndex>;

pub fn build_embedder(config: &AppConfig) -> Result<SharedEmbedder, ConfigError> {
    match config.embedding_provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder {
            dimensions: config.embedding_dimensions,
        })),
        EmbeddingProvider::OpenAi => Ok(Arc::new(OpenAiEmbedder::new(
            &config.openai_base_url,
            config.require_api_key()?,
            &config.embedding_model,
            config.embedding_dimensions,
        ))),
    }
}

pub fn build_language_model(config: &AppConfig) -> Result<SharedModel, ConfigError> {
    Ok(Arc::new(OpenAiChatModel::new(
        &config.openai_base_url,
        config.require_api_key()?,
        &config.chat_model,
    )))
}

/// Opens the configured index once and makes sure the collection exists.
pub async fn open_index(config: &AppConfig) -> Result<SharedIndex, SearchError> {
    let index: SharedIndex = match &config.index {
        IndexBackend::Local { path } => Arc::new(LocalVectorStore::open(path).await?),
        IndexBackend::Qdrant { url } => {
            Arc::new(QdrantStore::new(url.as_str(), config.embedding_dimensions)?)
        }
    };
    info!(backend = ?config.index, collection = %config.collection, "vector index opened");
    Ok(index)
}

pub async fn build_pipeline(config: &AppConfig) -> Result<SharedPipeline, PipelineError> {
    config.validate()?;
    let catalog = Catalog::load(&config.catalog_path)?;
    let prompts = PromptLibrary::new(&config.prompts_dir);
    prompts.verify()?;

    let index = open_index(config).await?;
    index.create_collection(&config.collection).await?;

    let retriever = Retriever::new(build_embedder(config)?, index, config.collection.clone());
    let generator = Generator::new(build_language_model(config)?, prompts);

    Ok(ResearchPipeline::new(
        MetadataRouter::new()?,
        catalog,
        retriever,
        generator,
        config.top_k,
    ))
}

pub async fn build_ingestor(
    config: &AppConfig,
    options: IngestionOptions,
) -> Result<SharedIngestor, PipelineError> {
    config.validate()?;
    let tokenizer = TiktokenTokenizer::for_model(&config.tokenizer_model)?;
    let index = open_index(config).await?;
    Ok(CatalogIngestor::new(
        LopdfExtractor,
        tokenizer,
        build_embedder(config)?,
        index,
        config.collection.clone(),
        options,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn pipeline_requires_a_credential() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = AppConfig {
            api_key: None,
            index: IndexBackend::Local {
                path: dir.path().join("index"),
            },
            ..AppConfig::default()
        };

        let result = build_pipeline(&config).await;
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::MissingCredential(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn pipeline_requires_every_prompt_asset() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let catalog = dir.path().join("catalog.json");
        fs::write(&catalog, r#"{"papers": []}"#)?;
        let config = AppConfig {
            api_key: Some("sk-test".to_string()),
            catalog_path: catalog,
            prompts_dir: dir.path().join("prompts"),
            index: IndexBackend::Local {
                path: dir.path().join("index"),
            },
            ..AppConfig::default()
        };

        let result = build_pipeline(&config).await;
        assert!(matches!(result, Err(PipelineError::Generate(_))));
        Ok(())
    }

    #[test]
    fn hashing_embedder_uses_configured_dimensions() -> Result<(), ConfigError> {
        let config = AppConfig {
            embedding_provider: EmbeddingProvider::Hashing,
            embedding_dimensions: 64,
            ..AppConfig::default()
        };
        assert_eq!(build_embedder(&config)?.dimensions(), 64);
        Ok(())
    }
}
