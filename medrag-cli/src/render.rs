//! Plain-text rendering of query results.

use medrag_core::types::{PipelineStage, QueryResult};
use std::fmt::Write;

const TITLE_WIDTH: usize = 80;

/// Cut `text` to at most `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

pub fn render_result(result: &QueryResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "QUESTION: {}", result.question);
    let _ = writeln!(
        out,
        "Risk level: {} | Safe: {} | Stage: {}",
        result.risk_level,
        if result.safe { "yes" } else { "no" },
        result.stage
    );
    for warning in &result.warnings {
        let _ = writeln!(out, "  ! {}", warning);
    }

    let _ = writeln!(out, "\nANSWER:\n{}", result.answer);
    if result.stage == PipelineStage::Blocked {
        return out;
    }

    if !result.citations.is_empty() {
        let _ = writeln!(out, "\nCITATIONS ({}):", result.citations.len());
        for (i, citation) in result.citations.values().enumerate() {
            let _ = writeln!(out, "  [{}] PMID {}: {}", i + 1, citation.pmid, citation.title);
            let _ = writeln!(
                out,
                "      {} ({})",
                citation.journal, citation.publication_date
            );
            let _ = writeln!(out, "      {}", citation.url);
        }
    }

    if !result.sources.is_empty() {
        let _ = writeln!(out, "\nSOURCES ({}):", result.num_sources);
        for (i, doc) in result.sources.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, truncate(&doc.title, TITLE_WIDTH));
            let _ = writeln!(
                out,
                "     PMID: {} | Similarity: {:.3}",
                doc.pmid, doc.similarity_score
            );
        }
    }

    if !result.answer_safety_flags.is_empty() {
        out.push_str("\nSAFETY FLAGS:\n");
        for flag in &result.answer_safety_flags {
            let _ = writeln!(out, "  - {}", flag);
        }
    }
    out
}
