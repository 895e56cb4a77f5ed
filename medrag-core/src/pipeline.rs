//! The per-query pipeline: screen, retrieve, format, generate, verify, audit.
//!
//! Each call to [`MedicalRagPipeline::query`] walks a fresh state machine
//! from [`PipelineStage::Screening`] to one of three terminal stages and
//! always returns a structurally complete [`QueryResult`]. The only state
//! shared across queries is the completed-query counter.

use crate::citations::{extract_citations, verify_citations};
use crate::config::{GenerationFallback, PipelineConfig};
use crate::context::{NO_LITERATURE_FOUND, format_context};
use crate::error::{ConfigError, Result};
use crate::generator::{
    AnswerGenerator, GeminiGenerator, GenerationOutcome, TextGenerator, extractive_summary,
    generation_error_message,
};
use crate::retrieval::{RetrievalFilter, RetrievalOracle};
use crate::risk::{EMERGENCY_WARNING, FLAG_UNCERTAINTY, RiskEvent, RiskScreener, log_risk_event};
use crate::trust::{ResultBundle, TrustworthinessAuditor};
use crate::types::{
    CitationMap, Document, PipelineStage, PipelineStats, QueryResult, RiskAssessment,
};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Orchestrates one query at a time over injected retrieval and generation
/// oracles.
pub struct MedicalRagPipeline {
    config: PipelineConfig,
    screener: RiskScreener,
    filter: RetrievalFilter,
    generator: AnswerGenerator,
    oracle: Arc<dyn RetrievalOracle>,
    auditor: TrustworthinessAuditor,
    query_count: AtomicU64,
}

impl MedicalRagPipeline {
    pub fn new(
        config: PipelineConfig,
        oracle: Arc<dyn RetrievalOracle>,
        text_generator: Arc<dyn TextGenerator>,
    ) -> Self {
        for warning in config.validate() {
            warn!(warning = warning.as_str(), "Configuration warning");
        }
        let screener = RiskScreener::new(config.risk.clone());
        Self {
            filter: RetrievalFilter::from_config(&config.retrieval),
            auditor: TrustworthinessAuditor::new(screener.clone()),
            screener,
            generator: AnswerGenerator::new(text_generator),
            oracle,
            config,
            query_count: AtomicU64::new(0),
        }
    }

    /// Build a pipeline backed by the Gemini generation oracle.
    ///
    /// Fails if the provider is not `gemini` or the generation credential
    /// cannot be resolved.
    pub fn from_config(config: PipelineConfig, oracle: Arc<dyn RetrievalOracle>) -> Result<Self> {
        if config.llm.provider != "gemini" {
            return Err(ConfigError::Invalid {
                message: format!("unsupported llm.provider '{}'", config.llm.provider),
            }
            .into());
        }
        let gemini = GeminiGenerator::new(&config.llm)?;
        info!(
            model = config.llm.model.as_str(),
            oracle = oracle.name(),
            "Pipeline initialized"
        );
        Ok(Self::new(config, oracle, Arc::new(gemini)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub fn auditor(&self) -> &TrustworthinessAuditor {
        &self.auditor
    }

    /// Answer a single question.
    pub async fn query(&self, question: &str) -> QueryResult {
        let id = Uuid::new_v4();
        debug!(query_id = %id, stage = %PipelineStage::Screening, "Pipeline stage");
        let assessment = self.screener.assess_query(question);

        if !assessment.safe {
            log_risk_event(&RiskEvent::QueryBlocked {
                question,
                risk_level: assessment.risk_level,
                warnings: &assessment.warnings,
            });
            warn!(
                query_id = %id,
                risk_level = %assessment.risk_level,
                "Query blocked by risk screening"
            );
            return blocked_result(id, question, assessment);
        }

        debug!(query_id = %id, stage = %PipelineStage::Retrieving, "Pipeline stage");
        let sources = self.filter.retrieve(question, self.oracle.as_ref());
        let validation = self.screener.validate_retrieval(&sources);
        if !validation.issues.is_empty() {
            log_risk_event(&RiskEvent::RetrievalIssues {
                question,
                valid: validation.valid,
                issues: &validation.issues,
            });
        }

        if sources.is_empty() {
            info!(query_id = %id, "No literature above similarity threshold");
            return empty_result(id, question, assessment, validation.issues);
        }

        debug!(query_id = %id, stage = %PipelineStage::Formatting, "Pipeline stage");
        let context = format_context(&sources);

        debug!(query_id = %id, stage = %PipelineStage::Generating, "Pipeline stage");
        let (answer, generation_failed) = match self.generator.generate(question, &context).await
        {
            GenerationOutcome::Answer(text) => (text, false),
            GenerationOutcome::Failed { reason } => {
                warn!(
                    query_id = %id,
                    reason = reason.as_str(),
                    fallback = %self.config.generation.fallback,
                    "Answer generation failed"
                );
                let answer = match self.config.generation.fallback {
                    GenerationFallback::ErrorMessage => generation_error_message(&reason),
                    GenerationFallback::Extractive => {
                        extractive_summary(&sources, self.config.generation.extractive_max_sources)
                    }
                };
                (answer, true)
            }
        };

        debug!(query_id = %id, stage = %PipelineStage::Verifying, "Pipeline stage");
        let citations = extract_citations(&answer, &sources);
        let verification = verify_citations(&answer, &sources);

        debug!(query_id = %id, stage = %PipelineStage::Auditing, "Pipeline stage");
        let report = self.auditor.audit(&ResultBundle {
            answer: &answer,
            citations: &citations,
            sources: &sources,
        });
        let flagged = !report.answer_safe
            || report
                .answer_safety_flags
                .iter()
                .any(|f| f != FLAG_UNCERTAINTY);
        if flagged {
            log_risk_event(&RiskEvent::AnswerFlagged {
                question,
                safe: report.answer_safe,
                flags: &report.answer_safety_flags,
            });
        }

        self.query_count.fetch_add(1, Ordering::SeqCst);
        info!(
            query_id = %id,
            risk_level = %assessment.risk_level,
            num_sources = sources.len(),
            citation_accuracy = verification.citation_accuracy,
            transparency = report.transparency_percentage,
            safe = report.answer_safe,
            "Query completed"
        );

        QueryResult {
            id,
            created_at: Utc::now(),
            question: question.to_string(),
            answer,
            citations,
            num_sources: sources.len(),
            sources,
            risk_level: assessment.risk_level,
            warnings: assessment.warnings,
            retrieval_issues: validation.issues,
            answer_safety_flags: report.answer_safety_flags,
            invalid_citations: verification.invalid_citations,
            citation_accuracy: verification.citation_accuracy,
            transparency_score: report.transparency_percentage,
            safe: report.answer_safe,
            generation_failed,
            stage: PipelineStage::Done,
        }
    }

    /// Answer questions one after another, in input order.
    pub async fn batch_query(&self, questions: &[String]) -> Vec<QueryResult> {
        let total = questions.len();
        let mut results = Vec::with_capacity(total);
        for (i, question) in questions.iter().enumerate() {
            info!("[{}/{}] Processing: {}", i + 1, total, question);
            results.push(self.query(question).await);
        }
        results
    }

    /// Cumulative statistics since construction.
    pub fn statistics(&self) -> PipelineStats {
        PipelineStats {
            total_queries: self.query_count.load(Ordering::SeqCst),
            total_cost: 0.0,
            avg_cost_per_query: 0.0,
        }
    }
}

impl std::fmt::Debug for MedicalRagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedicalRagPipeline")
            .field("generator", &self.generator)
            .field("oracle", &self.oracle.name())
            .field("filter", &self.filter)
            .field("query_count", &self.query_count.load(Ordering::SeqCst))
            .finish()
    }
}

fn terminal_result(
    id: Uuid,
    question: &str,
    answer: String,
    assessment: RiskAssessment,
    retrieval_issues: Vec<String>,
    stage: PipelineStage,
) -> QueryResult {
    QueryResult {
        id,
        created_at: Utc::now(),
        question: question.to_string(),
        answer,
        citations: CitationMap::new(),
        sources: Vec::<Document>::new(),
        num_sources: 0,
        risk_level: assessment.risk_level,
        warnings: assessment.warnings,
        retrieval_issues,
        answer_safety_flags: Vec::new(),
        invalid_citations: Vec::new(),
        citation_accuracy: 0.0,
        transparency_score: 0.0,
        safe: false,
        generation_failed: false,
        stage,
    }
}

fn blocked_result(id: Uuid, question: &str, assessment: RiskAssessment) -> QueryResult {
    let answer = assessment
        .warnings
        .first()
        .cloned()
        .unwrap_or_else(|| EMERGENCY_WARNING.to_string());
    terminal_result(id, question, answer, assessment, Vec::new(), PipelineStage::Blocked)
}

fn empty_result(
    id: Uuid,
    question: &str,
    assessment: RiskAssessment,
    retrieval_issues: Vec<String>,
) -> QueryResult {
    terminal_result(
        id,
        question,
        NO_LITERATURE_FOUND.to_string(),
        assessment,
        retrieval_issues,
        PipelineStage::Empty,
    )
}
