use crate::error::IngestError;
use crate::models::{Chunk, IngestionOptions, Metadata};
use crate::tokenizer::Tokenizer;
use tracing::debug;

/// Tokens that may be dropped from each edge of a window whose boundary splits a character.
const MAX_EDGE_TRIM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl TryFrom<&IngestionOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: &IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

/// Splits text into overlapping windows measured in model tokens.
pub struct TokenChunker<T: Tokenizer> {
    tokenizer: T,
    config: ChunkingConfig,
}

impl<T: Tokenizer> TokenChunker<T> {
    pub fn new(tokenizer: T, config: ChunkingConfig) -> Self {
        Self { tokenizer, config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Windows `[cursor, cursor + chunk_size)` advance by `chunk_size - chunk_overlap`.
    /// Blank windows are skipped without consuming a chunk id.
    pub fn chunk(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        let tokens = self.tokenizer.encode(text);
        let mut chunks = Vec::new();
        let mut cursor = 0usize;
        let mut chunk_id = 0usize;

        while cursor < tokens.len() {
            let end = (cursor + self.config.chunk_size).min(tokens.len());
            let window = &tokens[cursor..end];
            let chunk_text = self.decode_window(window);

            if !chunk_text.trim().is_empty() {
                chunks.push(Chunk {
                    chunk_id,
                    text: chunk_text,
                    token_count: window.len(),
                    metadata: metadata.clone(),
                });
                chunk_id += 1;
            }

            cursor += self.config.step();
        }

        chunks
    }

    /// Falls back to a lossy decode, minus edge replacement characters, when no
    /// trimmed variant of the window is valid UTF-8.
    fn decode_window(&self, window: &[u32]) -> String {
        let first_error = match self.tokenizer.decode(window) {
            Ok(text) => return text,
            Err(error) => error,
        };

        for trim_start in 0..=MAX_EDGE_TRIM {
            for trim_end in 0..=MAX_EDGE_TRIM {
                if trim_start + trim_end == 0 || trim_start + trim_end >= window.len() {
                    continue;
                }
                let narrowed = &window[trim_start..window.len() - trim_end];
                if let Ok(text) = self.tokenizer.decode(narrowed) {
                    return text;
                }
            }
        }

        debug!(error = %first_error, tokens = window.len(), "window decoded lossily");
        self.tokenizer
            .decode_lossy(window)
            .trim_matches('\u{FFFD}')
            .to_string()
    }
}
