use crate::error::IngestError;
use tiktoken_rs::CoreBPE;

pub const DEFAULT_TOKENIZER_MODEL: &str = "gpt-4";

pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;
    fn decode(&self, tokens: &[u32]) -> Result<String, IngestError>;

    /// Decodes tokens produced by `encode`, replacing invalid UTF-8 with U+FFFD.
    fn decode_lossy(&self, tokens: &[u32]) -> String;
}

/// BPE tokenizer matching the encoding used by the generation model.
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    pub fn for_model(model: &str) -> Result<Self, IngestError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|error| IngestError::Tokenizer(format!("{model}: {error}")))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, IngestError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|error| IngestError::Tokenizer(error.to_string()))
    }

    fn decode_lossy(&self, tokens: &[u32]) -> String {
        // Tokens come from `encode` on this same encoding, so every rank is known.
        let bytes = self
            .bpe
            ._decode_native_and_split(tokens.to_vec())
            .flatten()
            .collect::<Vec<u8>>();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
