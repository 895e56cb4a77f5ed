//! Trustworthiness auditing of finished answers.
//!
//! The transparency rubric awards one point each for:
//! 1. at least one verified citation
//! 2. at least one source document
//! 3. every source carrying a similarity score
//! 4. every source carrying journal and publication date
//! 5. hedging language in the answer

use crate::citations::verify_citations;
use crate::risk::RiskScreener;
use crate::types::{
    CitationMap, Document, QueryResult, ReproducibilityCheck, TrustworthinessReport,
};
use std::collections::BTreeSet;
use std::fmt::Write;

pub const TRANSPARENCY_MAX_POINTS: u8 = 5;

pub const HEDGING_WORDS: &[&str] = &["may", "suggest", "indicate", "possible", "unclear"];

pub const ISSUE_MISSING_CITATIONS: &str = "Missing citations";
pub const ISSUE_MISSING_SOURCES: &str = "Missing source documents";
pub const ISSUE_MISSING_SIMILARITY: &str = "Missing similarity scores";
pub const ISSUE_MISSING_METADATA: &str = "Missing metadata";
pub const ISSUE_NO_UNCERTAINTY: &str = "No uncertainty indicators";

/// A read-only view over the parts of a result the auditor inspects.
#[derive(Debug, Clone, Copy)]
pub struct ResultBundle<'a> {
    pub answer: &'a str,
    pub citations: &'a CitationMap,
    pub sources: &'a [Document],
}

impl<'a> From<&'a QueryResult> for ResultBundle<'a> {
    fn from(result: &'a QueryResult) -> Self {
        Self {
            answer: &result.answer,
            citations: &result.citations,
            sources: &result.sources,
        }
    }
}

/// Transparency rubric outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TransparencyCheck {
    pub points: u8,
    pub percentage: f64,
    pub issues: Vec<String>,
}

fn has_text(s: &str) -> bool {
    !s.trim().is_empty()
}

/// Scores transparency and collects answer-safety flags.
#[derive(Debug, Clone, Default)]
pub struct TrustworthinessAuditor {
    screener: RiskScreener,
}

impl TrustworthinessAuditor {
    pub fn new(screener: RiskScreener) -> Self {
        Self { screener }
    }

    pub fn check_transparency(&self, bundle: &ResultBundle<'_>) -> TransparencyCheck {
        let mut points = 0u8;
        let mut issues = Vec::new();
        let has_sources = !bundle.sources.is_empty();

        let mut award = |earned: bool, issue: &str| {
            if earned {
                points += 1;
            } else {
                issues.push(issue.to_string());
            }
        };

        award(!bundle.citations.is_empty(), ISSUE_MISSING_CITATIONS);
        award(has_sources, ISSUE_MISSING_SOURCES);
        award(
            has_sources && bundle.sources.iter().all(|s| s.similarity_score.is_finite()),
            ISSUE_MISSING_SIMILARITY,
        );
        award(
            has_sources
                && bundle
                    .sources
                    .iter()
                    .all(|s| has_text(&s.journal) && has_text(&s.publication_date)),
            ISSUE_MISSING_METADATA,
        );
        let answer = bundle.answer.to_lowercase();
        award(
            HEDGING_WORDS.iter().any(|w| answer.contains(w)),
            ISSUE_NO_UNCERTAINTY,
        );

        TransparencyCheck {
            points,
            percentage: f64::from(points) / f64::from(TRANSPARENCY_MAX_POINTS) * 100.0,
            issues,
        }
    }

    /// Audit a result bundle. Does not modify it.
    pub fn audit(&self, bundle: &ResultBundle<'_>) -> TrustworthinessReport {
        let verification = verify_citations(bundle.answer, bundle.sources);
        let transparency = self.check_transparency(bundle);
        let safety = self
            .screener
            .assess_answer_safety(bundle.answer, bundle.citations);

        TrustworthinessReport {
            citation_accuracy: verification.citation_accuracy,
            transparency_points: transparency.points,
            transparency_percentage: transparency.percentage,
            issues: transparency.issues,
            answer_safe: safety.safe,
            answer_safety_flags: safety.flags,
        }
    }

    /// Every source must carry a PMID for a reader to re-check it.
    pub fn verify_reproducibility(&self, query: &str, result: &QueryResult) -> ReproducibilityCheck {
        ReproducibilityCheck {
            query_logged: !query.is_empty(),
            sources_available: !result.sources.is_empty(),
            citations_linked: !result.citations.is_empty(),
            reproducible: result.sources.iter().all(|s| has_text(&s.pmid)),
        }
    }

    /// Human-readable trustworthiness report for a finished result.
    pub fn render_report(&self, result: &QueryResult) -> String {
        let bundle = ResultBundle::from(result);
        let verification = verify_citations(&result.answer, &result.sources);
        let transparency = self.check_transparency(&bundle);
        let reproducibility = self.verify_reproducibility(&result.question, result);

        let mut out = String::from("TRUSTWORTHINESS REPORT\n\nCitation Verification:\n");
        let _ = writeln!(out, "  Total Citations: {}", verification.total_citations);
        let _ = writeln!(out, "  Valid Citations: {}", verification.valid_citations);
        let _ = writeln!(
            out,
            "  Citation Accuracy: {:.1}%",
            verification.citation_accuracy
        );
        if verification.invalid_citations.is_empty() {
            out.push_str("  All citations valid\n");
        } else {
            let _ = writeln!(
                out,
                "  Invalid Citations: {}",
                verification.invalid_citations.join(", ")
            );
        }

        let _ = writeln!(
            out,
            "\nTransparency Score: {:.1}% ({}/{})",
            transparency.percentage, transparency.points, TRANSPARENCY_MAX_POINTS
        );
        if transparency.issues.is_empty() {
            out.push_str("  Fully transparent\n");
        } else {
            let _ = writeln!(out, "  Issues: {}", transparency.issues.join(", "));
        }

        out.push_str("\nSource Quality:\n");
        let _ = writeln!(out, "  Number of sources: {}", result.sources.len());
        if result.sources.is_empty() {
            out.push_str("  Average similarity: n/a\n");
        } else {
            let avg = result.sources.iter().map(|s| s.similarity_score).sum::<f64>()
                / result.sources.len() as f64;
            let _ = writeln!(out, "  Average similarity: {avg:.3}");
        }
        let specialties: BTreeSet<&str> =
            result.sources.iter().map(|s| s.specialty.as_str()).collect();
        let _ = writeln!(
            out,
            "  Specialties: {}",
            specialties.into_iter().collect::<Vec<_>>().join(", ")
        );

        out.push_str("\nReproducibility: ");
        if reproducibility.reproducible && reproducibility.sources_available {
            out.push_str("All sources verifiable via PMID\n");
        } else if !reproducibility.sources_available {
            out.push_str("No sources to verify\n");
        } else {
            out.push_str("Some sources lack a PMID\n");
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Citation, PipelineStage, RiskLevel};
    use chrono::Utc;
    use uuid::Uuid;

    fn doc(pmid: &str, specialty: &str, score: f64) -> Document {
        Document {
            pmid: pmid.into(),
            title: format!("Title {pmid}"),
            abstract_text: "Abstract.".into(),
            journal: "Hepatology".into(),
            specialty: specialty.into(),
            publication_date: "2023-03-03".into(),
            similarity_score: score,
        }
    }

    fn result(answer: &str, sources: Vec<Document>, cited: &[&str]) -> QueryResult {
        let citations: CitationMap = sources
            .iter()
            .filter(|d| cited.contains(&d.pmid.as_str()))
            .map(|d| (d.pmid.clone(), Citation::from(d)))
            .collect();
        QueryResult {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            question: "Does coffee protect the liver?".into(),
            answer: answer.into(),
            num_sources: sources.len(),
            citations,
            sources,
            risk_level: RiskLevel::Low,
            warnings: Vec::new(),
            retrieval_issues: Vec::new(),
            answer_safety_flags: Vec::new(),
            invalid_citations: Vec::new(),
            citation_accuracy: 0.0,
            transparency_score: 0.0,
            safe: true,
            generation_failed: false,
            stage: PipelineStage::Done,
        }
    }

    #[test]
    fn test_full_transparency() {
        let r = result(
            "Coffee may reduce fibrosis [PMID: 1].",
            vec![doc("1", "hepatology", 0.8)],
            &["1"],
        );
        let check = TrustworthinessAuditor::default().check_transparency(&ResultBundle::from(&r));
        assert_eq!(check.points, 5);
        assert_eq!(check.percentage, 100.0);
        assert!(check.issues.is_empty());
    }

    #[test]
    fn test_empty_bundle_scores_zero() {
        let r = result("No relevant medical literature found.", Vec::new(), &[]);
        let check = TrustworthinessAuditor::default().check_transparency(&ResultBundle::from(&r));
        assert_eq!(check.points, 0);
        assert_eq!(check.percentage, 0.0);
        assert_eq!(
            check.issues,
            vec![
                ISSUE_MISSING_CITATIONS,
                ISSUE_MISSING_SOURCES,
                ISSUE_MISSING_SIMILARITY,
                ISSUE_MISSING_METADATA,
                ISSUE_NO_UNCERTAINTY,
            ]
        );
    }

    #[test]
    fn test_missing_metadata_and_nan_score() {
        let mut bad = doc("2", "hepatology", f64::NAN);
        bad.journal = "  ".into();
        let r = result("Coffee reduces fibrosis [PMID: 1].", vec![doc("1", "x", 0.9), bad], &["1"]);
        let check = TrustworthinessAuditor::default().check_transparency(&ResultBundle::from(&r));
        assert_eq!(check.points, 2);
        assert_eq!(check.percentage, 40.0);
        assert_eq!(
            check.issues,
            vec![ISSUE_MISSING_SIMILARITY, ISSUE_MISSING_METADATA, ISSUE_NO_UNCERTAINTY]
        );
    }

    #[test]
    fn test_audit_combines_checks_without_mutation() {
        let r = result(
            "Coffee definitely helps [PMID: 1] [PMID: 9].",
            vec![doc("1", "hepatology", 0.8)],
            &["1"],
        );
        let before = r.clone();
        let report = TrustworthinessAuditor::default().audit(&ResultBundle::from(&r));
        assert_eq!(r, before);
        assert_eq!(report.citation_accuracy, 50.0);
        assert_eq!(report.transparency_points, 4);
        assert_eq!(report.transparency_percentage, 80.0);
        assert!(report.answer_safe);
        assert_eq!(
            report.answer_safety_flags,
            vec!["WARNING: Answer contains absolute statements".to_string()]
        );
    }

    #[test]
    fn test_reproducibility() {
        let auditor = TrustworthinessAuditor::default();
        let r = result("x [PMID: 1]", vec![doc("1", "a", 0.9)], &["1"]);
        let check = auditor.verify_reproducibility("q", &r);
        assert!(check.query_logged && check.sources_available && check.citations_linked);
        assert!(check.reproducible);

        let r = result("x", vec![doc("", "a", 0.9)], &[]);
        assert!(!auditor.verify_reproducibility("q", &r).reproducible);
    }

    #[test]
    fn test_render_report() {
        let r = result(
            "Coffee may help [PMID: 1] [PMID: 7].",
            vec![doc("1", "hepatology", 0.8), doc("2", "gastroenterology", 0.6)],
            &["1"],
        );
        let report = TrustworthinessAuditor::default().render_report(&r);
        assert!(report.contains("Citation Accuracy: 50.0%"));
        assert!(report.contains("Invalid Citations: 7"));
        assert!(report.contains("Transparency Score: 100.0% (5/5)"));
        assert!(report.contains("Average similarity: 0.700"));
        assert!(report.contains("Specialties: gastroenterology, hepatology"));
        assert!(report.contains("All sources verifiable via PMID"));
    }

    #[test]
    fn test_render_report_without_sources() {
        let r = result("No relevant medical literature found.", Vec::new(), &[]);
        let report = TrustworthinessAuditor::default().render_report(&r);
        assert!(report.contains("All citations valid"));
        assert!(report.contains("Average similarity: n/a"));
        assert!(report.contains("No sources to verify"));
    }
}
