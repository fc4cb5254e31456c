use crate::catalog::{Catalog, Paper};
use crate::chunking::{ChunkingConfig, TokenChunker};
use crate::cleaning::{SectionTrimmer, TextCleaner};
use crate::embeddings::Embedder;
use crate::extractor::PdfExtractor;
use crate::store::IndexBatch;
use crate::tokenizer::Tokenizer;
use crate::traits::VectorIndex;
use crate::{IngestError, IngestionOptions};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Index id of one chunk: `{paper_id}_chunk_{chunk_id:04}`.
pub fn chunk_record_id(paper_id: &str, chunk_id: usize) -> String {
    format!("{paper_id}_chunk_{chunk_id:04}")
}

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub paper_id: String,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub papers_total: usize,
    pub processed: usize,
    pub total_chunks: usize,
    pub missing: Vec<SkippedPdf>,
    pub failed: Vec<SkippedPdf>,
}

/// One-shot batch loader: catalog papers in, one index entry per chunk out.
pub struct CatalogIngestor<X, T, E, V>
where
    X: PdfExtractor,
    T: Tokenizer,
    E: Embedder,
    V: VectorIndex,
{
    extractor: X,
    cleaner: TextCleaner,
    trimmer: SectionTrimmer,
    chunker: TokenChunker<T>,
    embedder: E,
    index: V,
    collection: String,
    options: IngestionOptions,
}

impl<X, T, E, V> CatalogIngestor<X, T, E, V>
where
    X: PdfExtractor,
    T: Tokenizer,
    E: Embedder,
    V: VectorIndex,
{
    pub fn new(
        extractor: X,
        tokenizer: T,
        embedder: E,
        index: V,
        collection: impl Into<String>,
        options: IngestionOptions,
    ) -> Result<Self, IngestError> {
        if options.embedding_batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "embedding batch size must be greater than zero".to_string(),
            ));
        }
        let config = ChunkingConfig::try_from(&options)?;
        Ok(Self {
            extractor,
            cleaner: TextCleaner::new()?,
            trimmer: SectionTrimmer::new()?,
            chunker: TokenChunker::new(tokenizer, config),
            embedder,
            index,
            collection: collection.into(),
            options,
        })
    }

    /// Missing PDFs and per-paper failures are logged and reported; only index setup errors abort.
    pub async fn run(
        &self,
        catalog: &Catalog,
        papers_dir: &Path,
    ) -> Result<IngestionReport, IngestError> {
        let started_at = Utc::now();
        info!(
            chunk_size = self.options.chunk_size,
            chunk_overlap = self.options.chunk_overlap,
            papers = catalog.papers.len(),
            "starting ingestion"
        );

        if self.options.reset {
            warn!(collection = %self.collection, "resetting collection");
            self.index.delete_collection(&self.collection).await?;
        }
        self.index.create_collection(&self.collection).await?;

        let mut processed = 0;
        let mut total_chunks = 0;
        let mut missing = Vec::new();
        let mut failed = Vec::new();

        for paper in &catalog.papers {
            let path = paper.pdf_path(papers_dir);
            if !path.is_file() {
                warn!(paper_id = %paper.id, path = %path.display(), "pdf not found, skipping");
                missing.push(SkippedPdf {
                    paper_id: paper.id.clone(),
                    path,
                    reason: "pdf not found".to_string(),
                });
                continue;
            }

            match self.ingest_paper(paper, &path).await {
                Ok(chunk_count) => {
                    info!(paper_id = %paper.id, title = %paper.title, chunks = chunk_count, "paper indexed");
                    processed += 1;
                    total_chunks += chunk_count;
                }
                Err(err) => {
                    error!(paper_id = %paper.id, filename = %paper.filename, error = %err, "failed to process paper");
                    failed.push(SkippedPdf {
                        paper_id: paper.id.clone(),
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let report = IngestionReport {
            started_at,
            finished_at: Utc::now(),
            papers_total: catalog.papers.len(),
            processed,
            total_chunks,
            missing,
            failed,
        };

        info!(
            processed = report.processed,
            total = report.papers_total,
            missing = report.missing.len(),
            failed = report.failed.len(),
            chunks = report.total_chunks,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn ingest_paper(&self, paper: &Paper, path: &Path) -> Result<usize, IngestError> {
        let raw = self.extractor.extract_text(path)?;
        let cleaned = self.cleaner.clean(&raw);
        let body = self.trimmer.trim(&cleaned);
        let chunks = self.chunker.chunk(&body, &paper.base_metadata());

        let mut batch = IndexBatch::default();
        for chunk in &chunks {
            batch.ids.push(chunk_record_id(&paper.id, chunk.chunk_id));
            batch.documents.push(chunk.text.clone());
            batch.metadatas.push(chunk.index_metadata());
        }

        for texts in batch.documents.chunks(self.options.embedding_batch_size) {
            let vectors = self.embedder.embed_many(texts).await?;
            batch.vectors.extend(vectors);
        }

        let count = batch.len();
        if count > 0 {
            self.index.add(&self.collection, batch).await?;
        }
        Ok(count)
    }
}
