pub mod bootstrap;
pub mod catalog;
pub mod chunking;
pub mod cleaning;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod retriever;
pub mod router;
pub mod store;
pub mod stores;
pub mod tokenizer;
pub mod traits;

pub use bootstrap::{
    build_embedder, build_ingestor, build_language_model, build_pipeline, open_index,
    SharedIngestor, SharedPipeline,
};
pub use catalog::{Catalog, CatalogAudit, Paper};
pub use chunking::{ChunkingConfig, TokenChunker};
pub use cleaning::{SectionTrimmer, TextCleaner};
pub use config::{AppConfig, EmbeddingProvider, IndexBackend};
pub use embeddings::{Embedder, HashingEmbedder, OpenAiEmbedder};
pub use error::{ConfigError, GenerateError, IngestError, PipelineError, SearchError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use generator::{format_citations, format_context, Generator, NO_CONTEXT_ANSWER};
pub use ingest::{
    chunk_record_id, discover_pdf_files, CatalogIngestor, IngestionReport, SkippedPdf,
};
pub use llm::{LanguageModel, OpenAiChatModel};
pub use models::{
    clean_metadata, Answer, AnswerBody, Chunk, Citation, IngestionOptions, Metadata,
    MetadataValue, PipelineResponse, QueryIntent, RetrievedChunk,
};
pub use orchestrator::ResearchPipeline;
pub use prompts::{render_prompt, PromptLibrary, Strategy};
pub use retriever::Retriever;
pub use router::{MetadataRouter, RouteDecision};
pub use store::{IndexBatch, StoreHit};
pub use stores::{LocalVectorStore, QdrantStore};
pub use tokenizer::{TiktokenTokenizer, Tokenizer};
pub use traits::VectorIndex;
