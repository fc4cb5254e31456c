use crate::embeddings::{DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use crate::error::ConfigError;
use crate::llm::DEFAULT_CHAT_MODEL;
use crate::retriever::DEFAULT_TOP_K;
use crate::tokenizer::DEFAULT_TOKENIZER_MODEL;
use std::path::PathBuf;
use url::Url;

pub const API_KEY_VARIABLE: &str = "OPENAI_API_KEY";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_COLLECTION: &str = "papers";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBackend {
    /// File-backed index under the given directory.
    Local { path: PathBuf },
    Qdrant { url: Url },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    OpenAi,
    /// Offline trigram hashing; needs no credential.
    Hashing,
}

/// Process-wide settings, built once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub openai_base_url: String,
    pub papers_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub prompts_dir: PathBuf,
    pub index: IndexBackend,
    pub collection: String,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub chat_model: String,
    pub tokenizer_model: String,
    pub top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            papers_dir: PathBuf::from("papers"),
            catalog_path: PathBuf::from("papers/paper_catalog.json"),
            prompts_dir: PathBuf::from("prompts"),
            index: IndexBackend::Local {
                path: PathBuf::from("vector_index"),
            },
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_provider: EmbeddingProvider::OpenAi,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            tokenizer_model: DEFAULT_TOKENIZER_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl AppConfig {
    /// The provider credential; absent or blank is a fatal configuration error.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential(API_KEY_VARIABLE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidSetting(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.embedding_dimensions == 0 {
            return Err(ConfigError::InvalidSetting(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        parse_url(&self.openai_base_url)?;
        if self.embedding_provider == EmbeddingProvider::OpenAi {
            self.require_api_key()?;
        }
        Ok(())
    }
}

pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Ok(Url::parse(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credential_is_missing() {
        let config = AppConfig {
            api_key: Some("   ".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingCredential(API_KEY_VARIABLE))
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn hashing_provider_runs_without_credential() {
        let config = AppConfig {
            embedding_provider: EmbeddingProvider::Hashing,
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn credential_is_trimmed() -> Result<(), ConfigError> {
        let config = AppConfig {
            api_key: Some(" sk-test \n".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.require_api_key()?, "sk-test");
        Ok(())
    }

    #[test]
    fn urls_are_validated() {
        assert!(parse_url("http://localhost:6333").is_ok());
        assert!(matches!(parse_url("localhost"), Err(ConfigError::InvalidUrl(_))));
    }
}
