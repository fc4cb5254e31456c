use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("catalog file not found: {0}")]
    CatalogMissing(String),

    #[error("catalog could not be parsed: {0}")]
    CatalogMalformed(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unknown prompt strategy: {0}")]
    UnknownStrategy(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("upstream error: {0}")]
    Upstream(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("prompt strategy '{0}' not found")]
    PromptNotFound(String),

    #[error("prompt asset could not be read: {0}")]
    PromptIo(#[from] std::io::Error),

    #[error("language model error: {0}")]
    Model(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl PipelineError {
    /// True when the failure was caused by the caller's input rather than an upstream service.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidQuestion(_)
                | PipelineError::Config(ConfigError::UnknownStrategy(_))
        )
    }
}
