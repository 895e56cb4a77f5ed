//! Error types for the MedRAG core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the generation oracle, configuration, and the literature corpus.
//! Blocked queries, empty retrievals, and generation failures inside a query
//! are not errors: they surface as fields of a well-formed `QueryResult`.

/// Top-level error type for the MedRAG core library.
#[derive(Debug, thiserror::Error)]
pub enum MedRagError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the text-generation oracle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Provider returned an empty answer")]
    EmptyResponse,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Generation credential missing: environment variable {var} is not set")]
    MissingCredential { var: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration load failed: {message}")]
    Load { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load {
            message: err.to_string(),
        }
    }
}

/// Errors from loading a literature corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Corpus parse error: {message}")]
    Parse { message: String },

    #[error("Duplicate PMID in corpus: {pmid}")]
    DuplicatePmid { pmid: String },
}

/// A type alias for results using the top-level `MedRagError`.
pub type Result<T> = std::result::Result<T, MedRagError>;
