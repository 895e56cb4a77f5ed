//! # MedRAG Core
//!
//! Core library for MedRAG, a retrieval-augmented question-answering
//! pipeline over biomedical literature.
//! Provides the risk screener, retrieval filter, context formatter, answer
//! generator, citation verifier, trustworthiness auditor, and the pipeline
//! orchestrator that runs them per query.

pub mod citations;
pub mod config;
pub mod context;
pub mod corpus;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod retrieval;
pub mod risk;
pub mod trust;
pub mod types;

// Re-export commonly used types at the crate root.
pub use citations::{extract_citations, extract_pmids, verify_citations};
pub use config::{ConfigOverrides, GenerationFallback, PipelineConfig, load_config};
pub use context::{NO_LITERATURE_FOUND, format_context};
pub use corpus::{CorpusStats, LiteratureCorpus};
pub use error::{ConfigError, CorpusError, LlmError, MedRagError, Result};
pub use generator::{AnswerGenerator, GeminiGenerator, GenerationOutcome, MockGenerator, TextGenerator};
pub use pipeline::MedicalRagPipeline;
pub use retrieval::{RetrievalFilter, RetrievalOracle, StaticOracle};
pub use risk::RiskScreener;
pub use trust::{ResultBundle, TrustworthinessAuditor};
pub use types::{
    AnswerSafety, Citation, CitationMap, CitationVerification, Document, PipelineStage,
    PipelineStats, QueryResult, ReproducibilityCheck, RetrievalValidation, RiskAssessment,
    RiskLevel, TrustworthinessReport,
};
