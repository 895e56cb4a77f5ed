//! CLI subcommand handlers.

use crate::Commands;
use crate::render;
use async_trait::async_trait;
use medrag_core::config::{GenerationFallback, PipelineConfig};
use medrag_core::corpus::LiteratureCorpus;
use medrag_core::error::LlmError;
use medrag_core::generator::TextGenerator;
use medrag_core::pipeline::MedicalRagPipeline;
use medrag_core::risk::RiskScreener;
use std::path::Path;
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, config: PipelineConfig) -> anyhow::Result<()> {
    match command {
        Commands::Ask {
            questions,
            corpus,
            offline,
            json,
        } => handle_ask(config, &corpus, &questions, offline, json).await,
        Commands::Screen { query } => handle_screen(&config, &query),
        Commands::CorpusStats { corpus } => handle_corpus_stats(&corpus),
        Commands::Config => handle_config(&config),
    }
}

/// A generation oracle that is never reachable.
///
/// Paired with the extractive fallback it lets the pipeline answer without
/// credentials or network access.
struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Connection {
            message: "offline mode".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

fn build_pipeline(
    mut config: PipelineConfig,
    corpus: LiteratureCorpus,
    offline: bool,
) -> anyhow::Result<MedicalRagPipeline> {
    let oracle = Arc::new(corpus);
    if offline {
        config.generation.fallback = GenerationFallback::Extractive;
        return Ok(MedicalRagPipeline::new(
            config,
            oracle,
            Arc::new(OfflineGenerator),
        ));
    }
    MedicalRagPipeline::from_config(config, oracle)
        .map_err(|e| anyhow::anyhow!("Failed to initialize pipeline: {}", e))
}

async fn handle_ask(
    config: PipelineConfig,
    corpus_path: &Path,
    questions: &[String],
    offline: bool,
    json: bool,
) -> anyhow::Result<()> {
    let corpus = LiteratureCorpus::load(corpus_path)
        .map_err(|e| anyhow::anyhow!("Failed to load corpus {}: {}", corpus_path.display(), e))?;
    let pipeline = build_pipeline(config, corpus, offline)?;

    let results = pipeline.batch_query(questions).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        println!("{}", render::render_result(result));
        println!("{}", pipeline.auditor().render_report(result));
    }
    let stats = pipeline.statistics();
    println!(
        "Answered {} of {} question(s) with the {} model.",
        stats.total_queries,
        results.len(),
        pipeline.model_name()
    );
    Ok(())
}

fn handle_screen(config: &PipelineConfig, query: &str) -> anyhow::Result<()> {
    let assessment = RiskScreener::new(config.risk.clone()).assess_query(query);
    println!("Risk level: {}", assessment.risk_level);
    println!("Safe to answer: {}", if assessment.safe { "yes" } else { "no" });
    if assessment.warnings.is_empty() {
        println!("No warnings.");
    } else {
        println!("Warnings:");
        for warning in &assessment.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn handle_corpus_stats(corpus_path: &Path) -> anyhow::Result<()> {
    let corpus = LiteratureCorpus::load(corpus_path)
        .map_err(|e| anyhow::anyhow!("Failed to load corpus {}: {}", corpus_path.display(), e))?;
    let stats = corpus.statistics();
    println!("Corpus: {}", corpus_path.display());
    println!("  Documents: {}", stats.total_documents);
    println!("  Embedding dimensions: {}", stats.embedding_dimensions);
    println!("  Specialties:");
    for (specialty, count) in &stats.specialties {
        println!("    {}: {}", specialty, count);
    }
    Ok(())
}

fn handle_config(config: &PipelineConfig) -> anyhow::Result<()> {
    for warning in config.validate() {
        eprintln!("warning: {}", warning);
    }
    println!("{}", redacted_toml(config)?);
    Ok(())
}

/// Serialize the config as TOML with any inline API key masked.
fn redacted_toml(config: &PipelineConfig) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if shown.llm.api_key.is_some() {
        shown.llm.api_key = Some("********".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CORPUS: &str = r#"[
        {
            "pmid": "100",
            "title": "Metformin and lactic acidosis",
            "abstract": "Lactic acidosis with metformin was rare. Risk rose with renal impairment.",
            "journal": "Diabetes Care",
            "specialty": "endocrinology",
            "publication_date": "2022-04-01"
        }
    ]"#;

    #[test]
    fn test_redacted_toml_masks_key() {
        let mut config = PipelineConfig::default();
        config.llm.api_key = Some("super-secret".to_string());
        let out = redacted_toml(&config).unwrap();
        assert!(!out.contains("super-secret"));
        assert!(out.contains("********"));
        assert!(out.contains("[retrieval]"));
    }

    #[tokio::test]
    async fn test_offline_pipeline_answers_extractively() {
        let corpus = LiteratureCorpus::from_json_str(CORPUS).unwrap();
        let mut config = PipelineConfig::default();
        config.retrieval.similarity_threshold = 0.0;
        let pipeline = build_pipeline(config, corpus, true).unwrap();

        let result = pipeline.query("metformin lactic acidosis risk").await;

        assert!(result.generation_failed);
        assert!(result.answer.contains("[PMID: 100]"));
        assert_eq!(pipeline.model_name(), "offline");
    }

    #[tokio::test]
    async fn test_handle_ask_reads_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", CORPUS).unwrap();
        let mut config = PipelineConfig::default();
        config.retrieval.similarity_threshold = 0.0;

        let questions = vec!["metformin lactic acidosis".to_string()];
        let outcome = handle_ask(config, file.path(), &questions, true, true).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_handle_ask_missing_corpus() {
        let questions = vec!["anything".to_string()];
        let outcome = handle_ask(
            PipelineConfig::default(),
            Path::new("/nonexistent/corpus.json"),
            &questions,
            true,
            false,
        )
        .await;
        assert!(outcome.is_err());
    }
}
