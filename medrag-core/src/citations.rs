//! Citation extraction and verification.
//!
//! Citation markers are `PMID:` followed by optional whitespace and a run of
//! digits, e.g. `[PMID: 12345]` or `PMID:12345`. A bare `PMID 12345` is prose,
//! not a marker.

use crate::types::{Citation, CitationMap, CitationVerification, Document};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static PMID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PMID:\s*(\d+)").expect("PMID pattern is valid"));

/// Distinct PMIDs mentioned in `text`.
pub fn extract_pmids(text: &str) -> BTreeSet<String> {
    PMID_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Build citations for every cited PMID that matches a source document.
///
/// PMIDs with no matching source are left out here and reported by
/// [`verify_citations`] instead.
pub fn extract_citations(answer: &str, documents: &[Document]) -> CitationMap {
    extract_pmids(answer)
        .into_iter()
        .filter_map(|pmid| {
            documents
                .iter()
                .find(|d| d.pmid == pmid)
                .map(|doc| (pmid, Citation::from(doc)))
        })
        .collect()
}

/// Cross-check cited PMIDs against the source set.
pub fn verify_citations(answer: &str, documents: &[Document]) -> CitationVerification {
    let cited = extract_pmids(answer);
    let sources: BTreeSet<String> = documents.iter().map(|d| d.pmid.clone()).collect();

    let invalid_citations: Vec<String> = cited.difference(&sources).cloned().collect();
    let uncited_sources: Vec<String> = sources.difference(&cited).cloned().collect();

    let total_citations = cited.len();
    let valid_citations = total_citations - invalid_citations.len();
    let citation_accuracy = if total_citations == 0 {
        0.0
    } else {
        valid_citations as f64 / total_citations as f64 * 100.0
    };

    CitationVerification {
        valid: invalid_citations.is_empty(),
        total_citations,
        valid_citations,
        invalid_citations,
        uncited_sources,
        citation_accuracy,
    }
}
