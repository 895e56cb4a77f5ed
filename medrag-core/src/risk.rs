//! Risk screener: query triage, retrieval adequacy, and answer safety.
//!
//! Query screening runs in a fixed order:
//! 1. Emergency keywords → `Critical`, `safe = false`; nothing else is checked.
//! 2. Diagnostic phrasing → `High` with a disclaimer.
//! 3. Treatment phrasing → `Medium` with a caution.
//!
//! Steps 2 and 3 are independent and both warnings may be present. Because
//! treatment is evaluated last, a query matching both ends up `Medium`.

use crate::config::RiskConfig;
use crate::types::{AnswerSafety, CitationMap, Document, RetrievalValidation, RiskAssessment, RiskLevel};
use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::warn;

pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "dying",
    "overdose",
    "suicide",
    "severe pain",
];

pub const DIAGNOSTIC_KEYWORDS: &[&str] = &["do i have", "am i", "diagnose me", "what is wrong with me"];

pub const TREATMENT_KEYWORDS: &[&str] = &["should i take", "how much", "dosage", "can i stop"];

pub const ABSOLUTE_WORDS: &[&str] = &["always", "never", "definitely", "certainly", "guaranteed"];

pub const UNCERTAINTY_PHRASES: &[&str] = &[
    "insufficient information",
    "not enough",
    "cannot determine",
    "unclear",
];

pub const EMERGENCY_WARNING: &str =
    "EMERGENCY: This system is not for emergencies. Call 911 or emergency services.";
pub const DIAGNOSTIC_WARNING: &str =
    "WARNING: This system provides information only, not diagnosis.";
pub const TREATMENT_WARNING: &str =
    "CAUTION: Consult healthcare provider for treatment decisions.";

pub const FLAG_NO_CITATIONS: &str = "RISK: Answer has no citations";
pub const FLAG_ABSOLUTE: &str = "WARNING: Answer contains absolute statements";
pub const FLAG_UNCERTAINTY: &str = "INFO: Answer indicates uncertainty (GOOD)";
pub const FLAG_TOO_LONG: &str = "WARNING: Answer unusually long, verify accuracy";

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Screens queries, retrieved sources, and generated answers.
#[derive(Debug, Clone, Default)]
pub struct RiskScreener {
    config: RiskConfig,
}

impl RiskScreener {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Classify a raw query into a risk tier.
    pub fn assess_query(&self, query: &str) -> RiskAssessment {
        let lowered = query.to_lowercase();

        if contains_any(&lowered, EMERGENCY_KEYWORDS) {
            return RiskAssessment {
                safe: false,
                warnings: vec![EMERGENCY_WARNING.to_string()],
                risk_level: RiskLevel::Critical,
            };
        }

        let mut assessment = RiskAssessment::default();

        if contains_any(&lowered, DIAGNOSTIC_KEYWORDS) {
            assessment.warnings.push(DIAGNOSTIC_WARNING.to_string());
            assessment.risk_level = RiskLevel::High;
        }

        if contains_any(&lowered, TREATMENT_KEYWORDS) {
            assessment.warnings.push(TREATMENT_WARNING.to_string());
            assessment.risk_level = RiskLevel::Medium;
        }

        assessment
    }

    /// Check retrieval adequacy against the current calendar year.
    pub fn validate_retrieval(&self, documents: &[Document]) -> RetrievalValidation {
        self.validate_retrieval_at(documents, Utc::now().year())
    }

    /// Check retrieval adequacy against an explicit reference year.
    ///
    /// Only a shortfall in document count sets `valid = false`; the similarity
    /// and age checks add issues without changing validity.
    pub fn validate_retrieval_at(
        &self,
        documents: &[Document],
        current_year: i32,
    ) -> RetrievalValidation {
        let mut validation = RetrievalValidation {
            valid: true,
            issues: Vec::new(),
        };

        if documents.len() < self.config.min_documents_required {
            validation.valid = false;
            validation.issues.push(format!(
                "Insufficient sources: {} found, need {}",
                documents.len(),
                self.config.min_documents_required
            ));
        }

        let low_similarity = documents
            .iter()
            .filter(|d| d.similarity_score < self.config.min_similarity_threshold)
            .count();
        if low_similarity > 0 {
            validation
                .issues
                .push(format!("WARNING: {low_similarity} low-confidence sources"));
        }

        // Undated or malformed dates are skipped here, never fatal.
        let old = documents
            .iter()
            .filter_map(Document::publication_year)
            .filter(|year| current_year - year > self.config.max_source_age_years)
            .count();
        if old > 0 {
            validation.issues.push(format!(
                "INFO: {old} sources older than {} years",
                self.config.max_source_age_years
            ));
        }

        validation
    }

    /// Flag a generated answer. Only a missing citation set makes it unsafe.
    pub fn assess_answer_safety(&self, answer: &str, citations: &CitationMap) -> AnswerSafety {
        let mut safety = AnswerSafety {
            safe: true,
            flags: Vec::new(),
        };

        if citations.is_empty() {
            safety.safe = false;
            safety.flags.push(FLAG_NO_CITATIONS.to_string());
        }

        let lowered = answer.to_lowercase();
        if contains_any(&lowered, ABSOLUTE_WORDS) {
            safety.flags.push(FLAG_ABSOLUTE.to_string());
        }
        if contains_any(&lowered, UNCERTAINTY_PHRASES) {
            safety.flags.push(FLAG_UNCERTAINTY.to_string());
        }
        if answer.chars().count() > self.config.max_answer_length {
            safety.flags.push(FLAG_TOO_LONG.to_string());
        }

        safety
    }
}

/// A risk-relevant occurrence worth surfacing to monitoring.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RiskEvent<'a> {
    QueryBlocked {
        question: &'a str,
        risk_level: RiskLevel,
        warnings: &'a [String],
    },
    RetrievalIssues {
        question: &'a str,
        valid: bool,
        issues: &'a [String],
    },
    AnswerFlagged {
        question: &'a str,
        safe: bool,
        flags: &'a [String],
    },
}

impl RiskEvent<'_> {
    pub fn event_type(&self) -> &'static str {
        match self {
            RiskEvent::QueryBlocked { .. } => "query_blocked",
            RiskEvent::RetrievalIssues { .. } => "retrieval_issues",
            RiskEvent::AnswerFlagged { .. } => "answer_flagged",
        }
    }
}

/// Emit a risk event on the `medrag::risk` tracing target.
pub fn log_risk_event(event: &RiskEvent<'_>) {
    let details = serde_json::to_string(event).unwrap_or_default();
    warn!(
        target: "medrag::risk",
        event_type = event.event_type(),
        details = details.as_str(),
        "Risk event"
    );
}
