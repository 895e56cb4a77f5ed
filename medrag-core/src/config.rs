//! Configuration system for MedRAG.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. Configuration is
//! loaded from `~/.config/medrag/config.toml` and/or `.medrag/config.toml` in
//! the workspace directory.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the MedRAG pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub risk: RiskConfig,
    pub generation: GenerationConfig,
}

/// Configuration for the text-generation oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Only "gemini" is wired by the built-in constructor.
    pub provider: String,
    /// Model identifier (e.g., "gemini-1.5-flash").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Takes precedence over `api_key_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate in an answer.
    pub max_tokens: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: 120,
        }
    }
}

/// Retrieval filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of candidates requested from the retrieval oracle.
    pub top_k: usize,
    /// Inclusive lower bound on `similarity_score` for a document to be kept.
    pub similarity_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_threshold: 0.5,
        }
    }
}

/// Risk screener thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Sources scoring below this are reported as low-confidence.
    pub min_similarity_threshold: f64,
    /// Fewer retrieved documents than this marks retrieval invalid.
    pub min_documents_required: usize,
    /// Answers longer than this (in characters) are flagged.
    pub max_answer_length: usize,
    /// Sources published more than this many years ago are reported as old.
    pub max_source_age_years: i32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            min_similarity_threshold: 0.5,
            min_documents_required: 1,
            max_answer_length: 1000,
            max_source_age_years: 5,
        }
    }
}

/// What the orchestrator puts in `answer` when the generation oracle fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFallback {
    /// `"Error generating answer: <reason>"`.
    #[default]
    ErrorMessage,
    /// An extractive summary of the retrieved abstracts, with PMID markers.
    Extractive,
}

impl std::fmt::Display for GenerationFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationFallback::ErrorMessage => write!(f, "error_message"),
            GenerationFallback::Extractive => write!(f, "extractive"),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub fallback: GenerationFallback,
    /// Maximum number of sources summarized by the extractive fallback.
    pub extractive_max_sources: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            fallback: GenerationFallback::ErrorMessage,
            extractive_max_sources: 3,
        }
    }
}

impl PipelineConfig {
    /// Validate this config and return any warnings.
    ///
    /// Returns an empty Vec if the config is sane. Problems are reported as
    /// human-readable warnings rather than errors.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.retrieval.top_k == 0 {
            warnings.push("retrieval.top_k is 0; every query will find no literature".to_string());
        }
        if !(-1.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            warnings.push(format!(
                "retrieval.similarity_threshold ({}) is outside the range -1.0–1.0",
                self.retrieval.similarity_threshold
            ));
        }
        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            warnings.push(format!(
                "llm.temperature ({}) is outside the typical range 0.0–2.0",
                self.llm.temperature
            ));
        }
        if self.risk.max_source_age_years < 0 {
            warnings.push(format!(
                "risk.max_source_age_years ({}) is negative",
                self.risk.max_source_age_years
            ));
        }
        if self.generation.fallback == GenerationFallback::Extractive
            && self.generation.extractive_max_sources == 0
        {
            warnings.push(
                "generation.extractive_max_sources is 0; extractive answers will summarize one source"
                    .to_string(),
            );
        }
        if self.llm.provider != "gemini" {
            warnings.push(format!(
                "llm.provider ({}) is not supported; only \"gemini\" is available",
                self.llm.provider
            ));
        }
        warnings
    }
}

/// Selective overrides applied above every other configuration layer.
///
/// Only fields that are set are merged; everything else keeps the value
/// resolved from defaults, config files, and the environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub llm: LlmOverrides,
    pub retrieval: RetrievalOverrides,
    pub generation: GenerationOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<GenerationFallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractive_max_sources: Option<usize>,
}

/// Path of the user-level config file, if a home directory can be resolved.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "medrag", "medrag")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".medrag").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (only the fields that are set)
/// 2. Environment variables (prefixed with `MEDRAG_`)
/// 3. Workspace-local config (`.medrag/config.toml`)
/// 4. User config (`~/.config/medrag/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<PipelineConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // MEDRAG_LLM__MODEL, MEDRAG_RETRIEVAL__TOP_K, etc.
    figment = figment.merge(Env::prefixed("MEDRAG_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}
