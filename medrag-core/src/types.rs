//! Core data model shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Base URL for PubMed record pages.
pub const PUBMED_BASE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// A retrieved literature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub journal: String,
    pub specialty: String,
    /// Year-prefixed date string, e.g. "2021-03-14" or "2019 Jan".
    pub publication_date: String,
    /// Oracle-assigned relevance. Higher is better.
    #[serde(default)]
    pub similarity_score: f64,
}

impl Document {
    /// The leading four-digit year of `publication_date`, if there is one.
    pub fn publication_year(&self) -> Option<i32> {
        let prefix = self.publication_date.trim().get(..4)?;
        if prefix.bytes().all(|b| b.is_ascii_digit()) {
            prefix.parse().ok()
        } else {
            None
        }
    }

    pub fn pubmed_url(&self) -> String {
        pubmed_url(&self.pmid)
    }

    /// Return a copy carrying the given similarity score.
    pub fn with_score(mut self, similarity_score: f64) -> Self {
        self.similarity_score = similarity_score;
        self
    }
}

/// PubMed URL for a PMID.
pub fn pubmed_url(pmid: &str) -> String {
    format!("{PUBMED_BASE_URL}/{pmid}/")
}

/// A verified reference from a generated answer to a retrieved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub pmid: String,
    pub title: String,
    pub journal: String,
    pub publication_date: String,
    pub url: String,
}

impl From<&Document> for Citation {
    fn from(doc: &Document) -> Self {
        Self {
            pmid: doc.pmid.clone(),
            title: doc.title.clone(),
            journal: doc.journal.clone(),
            publication_date: doc.publication_date.clone(),
            url: doc.pubmed_url(),
        }
    }
}

/// Citations keyed by PMID.
pub type CitationMap = BTreeMap<String, Citation>;

/// Risk tier of a query.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of screening a raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub safe: bool,
    pub warnings: Vec<String>,
    pub risk_level: RiskLevel,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            safe: true,
            warnings: Vec::new(),
            risk_level: RiskLevel::Low,
        }
    }
}

/// Advisory adequacy check over a retrieved document set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Safety flags raised against a generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSafety {
    pub safe: bool,
    pub flags: Vec<String>,
}

/// Cross-check of the PMIDs cited in an answer against the retrieved sources.
///
/// `invalid_citations` and `uncited_sources` are sorted so that repeated
/// verification of the same input is byte-for-byte identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationVerification {
    pub valid: bool,
    pub total_citations: usize,
    pub valid_citations: usize,
    pub invalid_citations: Vec<String>,
    pub uncited_sources: Vec<String>,
    /// Percentage in `[0, 100]`; `0` when nothing was cited.
    pub citation_accuracy: f64,
}

/// Transparency and safety audit of a finished answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustworthinessReport {
    pub citation_accuracy: f64,
    /// Rubric points earned, out of `TRANSPARENCY_MAX_POINTS`.
    pub transparency_points: u8,
    pub transparency_percentage: f64,
    pub issues: Vec<String>,
    pub answer_safe: bool,
    pub answer_safety_flags: Vec<String>,
}

/// Whether a result can be independently re-checked by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproducibilityCheck {
    pub query_logged: bool,
    pub sources_available: bool,
    pub citations_linked: bool,
    pub reproducible: bool,
}

/// States of the per-query pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Screening,
    Retrieving,
    Formatting,
    Generating,
    Verifying,
    Auditing,
    /// Terminal: the query was blocked by the risk screener.
    Blocked,
    /// Terminal: nothing passed the similarity threshold.
    Empty,
    /// Terminal: the full pipeline ran.
    Done,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Blocked | PipelineStage::Empty | PipelineStage::Done
        )
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Screening => "screening",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Formatting => "formatting",
            PipelineStage::Generating => "generating",
            PipelineStage::Verifying => "verifying",
            PipelineStage::Auditing => "auditing",
            PipelineStage::Blocked => "blocked",
            PipelineStage::Empty => "empty",
            PipelineStage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// The terminal aggregate returned for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub question: String,
    pub answer: String,
    pub citations: CitationMap,
    pub sources: Vec<Document>,
    pub num_sources: usize,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
    pub retrieval_issues: Vec<String>,
    pub answer_safety_flags: Vec<String>,
    pub invalid_citations: Vec<String>,
    pub citation_accuracy: f64,
    pub transparency_score: f64,
    pub safe: bool,
    pub generation_failed: bool,
    pub stage: PipelineStage,
}

/// Cumulative pipeline statistics since construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_queries: u64,
    pub total_cost: f64,
    pub avg_cost_per_query: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(date: &str) -> Document {
        Document {
            pmid: "12345".into(),
            title: "Metformin and glycemic control".into(),
            abstract_text: "Metformin lowers fasting glucose.".into(),
            journal: "Diabetes Care".into(),
            specialty: "endocrinology".into(),
            publication_date: date.into(),
            similarity_score: 0.8,
        }
    }

    #[test]
    fn test_publication_year_parses_leading_digits() {
        assert_eq!(doc("2021-03-14").publication_year(), Some(2021));
        assert_eq!(doc("2019 Jan").publication_year(), Some(2019));
        assert_eq!(doc("1998").publication_year(), Some(1998));
    }

    #[test]
    fn test_publication_year_rejects_malformed() {
        assert_eq!(doc("").publication_year(), None);
        assert_eq!(doc("Jan 2020").publication_year(), None);
        assert_eq!(doc("20x1-01-01").publication_year(), None);
        assert_eq!(doc("202").publication_year(), None);
    }

    #[test]
    fn test_citation_from_document() {
        let citation = Citation::from(&doc("2020-01-01"));
        assert_eq!(citation.pmid, "12345");
        assert_eq!(citation.journal, "Diabetes Care");
        assert_eq!(citation.url, "https://pubmed.ncbi.nlm.nih.gov/12345/");
    }

    #[test]
    fn test_document_serde_uses_abstract_key() {
        let json = serde_json::to_value(doc("2020")).unwrap();
        assert_eq!(json["abstract"], "Metformin lowers fasting glucose.");
        assert!(json.get("abstract_text").is_none());
    }

    #[test]
    fn test_document_missing_score_defaults_to_zero() {
        let parsed: Document = serde_json::from_str(
            r#"{"pmid":"1","title":"t","abstract":"a","journal":"j","specialty":"s","publication_date":"2020"}"#,
        )
        .unwrap();
        assert_eq!(parsed.similarity_score, 0.0);
    }

    #[test]
    fn test_risk_level_ordering_and_display() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
        assert_eq!(
            serde_json::to_string(&RiskLevel::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn test_stage_terminality() {
        assert!(PipelineStage::Blocked.is_terminal());
        assert!(PipelineStage::Empty.is_terminal());
        assert!(PipelineStage::Done.is_terminal());
        assert!(!PipelineStage::Generating.is_terminal());
    }
}
