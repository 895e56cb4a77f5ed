//! Retrieval oracle abstraction and the similarity filter in front of it.

use crate::config::RetrievalConfig;
use crate::types::Document;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// A black-box document search capability.
///
/// Implementations return at most `top_k` documents ordered by descending
/// `similarity_score`. The score's scale is the oracle's business; the core
/// only assumes higher is better and that it is comparable to the configured
/// threshold.
pub trait RetrievalOracle: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Vec<Document>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "oracle"
    }
}

/// Keep only documents scoring at or above `threshold`, preserving order.
pub fn filter_by_similarity(documents: Vec<Document>, threshold: f64) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|d| d.similarity_score >= threshold)
        .collect()
}

/// Fetches `top_k` candidates and drops those under the similarity threshold.
///
/// The oracle's ranking is kept as-is; nothing is re-sorted or deduplicated.
#[derive(Debug, Clone)]
pub struct RetrievalFilter {
    top_k: usize,
    similarity_threshold: f64,
}

impl RetrievalFilter {
    pub fn new(top_k: usize, similarity_threshold: f64) -> Self {
        Self {
            top_k,
            similarity_threshold,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.top_k, config.similarity_threshold)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// An empty result is a normal outcome, not an error.
    pub fn retrieve(&self, query: &str, oracle: &dyn RetrievalOracle) -> Vec<Document> {
        let candidates = oracle.search(query, self.top_k);
        let fetched = candidates.len();
        let kept = filter_by_similarity(candidates, self.similarity_threshold);
        debug!(
            oracle = oracle.name(),
            fetched,
            kept = kept.len(),
            threshold = self.similarity_threshold,
            "Filtered retrieval candidates"
        );
        kept
    }
}

impl Default for RetrievalFilter {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

/// An oracle that returns a fixed, pre-ranked document list.
///
/// Records every query it receives so callers can assert whether, and how,
/// retrieval happened.
#[derive(Debug, Default)]
pub struct StaticOracle {
    documents: Vec<Document>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StaticOracle {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// An oracle that never finds anything.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of `search` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries received, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

impl RetrievalOracle for StaticOracle {
    fn search(&self, query: &str, top_k: usize) -> Vec<Document> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        self.documents.iter().take(top_k).cloned().collect()
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pmid: &str, score: f64) -> Document {
        Document {
            pmid: pmid.into(),
            title: format!("Study {pmid}"),
            abstract_text: "Findings.".into(),
            journal: "BMJ".into(),
            specialty: "general".into(),
            publication_date: "2023-01-01".into(),
            similarity_score: score,
        }
    }

    #[test]
    fn test_filter_keeps_scores_above_threshold_in_order() {
        let oracle = StaticOracle::new(vec![doc("1", 0.9), doc("2", 0.6), doc("3", 0.3)]);
        let filter = RetrievalFilter::new(3, 0.5);
        let kept = filter.retrieve("metformin", &oracle);
        let pmids: Vec<_> = kept.iter().map(|d| d.pmid.as_str()).collect();
        assert_eq!(pmids, vec!["1", "2"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let oracle = StaticOracle::new(vec![doc("1", 0.5), doc("2", 0.4999)]);
        let kept = RetrievalFilter::new(5, 0.5).retrieve("q", &oracle);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].pmid, "1");
    }

    #[test]
    fn test_filter_does_not_resort() {
        let oracle = StaticOracle::new(vec![doc("a", 0.6), doc("b", 0.95), doc("c", 0.7)]);
        let kept = RetrievalFilter::new(3, 0.5).retrieve("q", &oracle);
        let pmids: Vec<_> = kept.iter().map(|d| d.pmid.as_str()).collect();
        assert_eq!(pmids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_top_k_is_passed_to_oracle() {
        let oracle = StaticOracle::new(vec![doc("1", 0.9), doc("2", 0.8), doc("3", 0.7)]);
        let kept = RetrievalFilter::new(2, 0.0).retrieve("q", &oracle);
        assert_eq!(kept.len(), 2);
        assert_eq!(oracle.call_count(), 1);
        assert_eq!(oracle.queries(), vec!["q".to_string()]);
    }

    #[test]
    fn test_nothing_passing_yields_empty() {
        let oracle = StaticOracle::new(vec![doc("1", 0.2)]);
        assert!(RetrievalFilter::default().retrieve("q", &oracle).is_empty());
        assert!(RetrievalFilter::default().retrieve("q", &StaticOracle::empty()).is_empty());
    }
}
