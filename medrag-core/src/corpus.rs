//! In-memory literature corpus usable as a retrieval oracle.
//!
//! Records are embedded with a hashed term-frequency embedding (L2
//! normalized) over title and abstract, and ranked by cosine similarity.
//! This is a lexical stand-in for a real embedding index, which lives outside
//! the core; it exists so the pipeline can run end to end from a JSON file.

use crate::error::{CorpusError, Result};
use crate::retrieval::RetrievalOracle;
use crate::types::Document;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Default embedding dimensionality.
pub const DEFAULT_DIMENSIONS: usize = 256;

fn simple_hash(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

/// Hashed bag-of-words embedding.
pub fn embed(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimensions];
    if dimensions == 0 {
        return vector;
    }

    let lowered = text.to_lowercase();
    let mut tf: HashMap<&str, usize> = HashMap::new();
    for word in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        *tf.entry(word).or_insert(0) += 1;
    }

    for (term, count) in &tf {
        vector[simple_hash(term) % dimensions] += *count as f32;
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Summary of a loaded corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_documents: usize,
    pub specialties: BTreeMap<String, usize>,
    pub embedding_dimensions: usize,
}

/// A fixed set of literature records with precomputed embeddings.
#[derive(Debug, Clone)]
pub struct LiteratureCorpus {
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
    dimensions: usize,
}

impl LiteratureCorpus {
    /// Build a corpus, rejecting duplicate PMIDs.
    pub fn new(documents: Vec<Document>, dimensions: usize) -> Result<Self> {
        let mut seen = HashSet::new();
        for doc in &documents {
            if !seen.insert(doc.pmid.as_str()) {
                return Err(CorpusError::DuplicatePmid {
                    pmid: doc.pmid.clone(),
                }
                .into());
            }
        }

        let embeddings = documents
            .iter()
            .map(|d| embed(&format!("{} {}", d.title, d.abstract_text), dimensions))
            .collect();

        Ok(Self {
            documents,
            embeddings,
            dimensions,
        })
    }

    /// Parse a JSON array of documents.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let documents: Vec<Document> =
            serde_json::from_str(json).map_err(|e| CorpusError::Parse {
                message: e.to_string(),
            })?;
        Self::new(documents, DEFAULT_DIMENSIONS)
    }

    /// Load a JSON array of documents from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let corpus = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            documents = corpus.len(),
            "Loaded literature corpus"
        );
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rank every record against the query, best first, keeping `top_k`.
    fn rank(&self, query: &str, top_k: usize) -> Vec<Document> {
        let query_vec = embed(query, self.dimensions);
        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(&query_vec, e)))
            .collect();
        // Stable sort keeps corpus order among ties.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(i, score)| self.documents[i].clone().with_score(f64::from(score)))
            .collect()
    }

    /// Search, then keep only one specialty.
    ///
    /// Over-fetches `3 * top_k` candidates before filtering, so fewer than
    /// `top_k` results may come back.
    pub fn search_by_specialty(&self, query: &str, specialty: &str, top_k: usize) -> Vec<Document> {
        self.rank(query, top_k.saturating_mul(3))
            .into_iter()
            .filter(|d| d.specialty == specialty)
            .take(top_k)
            .collect()
    }

    /// Look up a record by PMID. The returned copy carries a zero score.
    pub fn get_document(&self, pmid: &str) -> Option<Document> {
        self.documents
            .iter()
            .find(|d| d.pmid == pmid)
            .map(|d| d.clone().with_score(0.0))
    }

    pub fn statistics(&self) -> CorpusStats {
        let mut specialties = BTreeMap::new();
        for doc in &self.documents {
            *specialties.entry(doc.specialty.clone()).or_insert(0) += 1;
        }
        CorpusStats {
            total_documents: self.documents.len(),
            specialties,
            embedding_dimensions: self.dimensions,
        }
    }
}

impl RetrievalOracle for LiteratureCorpus {
    fn search(&self, query: &str, top_k: usize) -> Vec<Document> {
        self.rank(query, top_k)
    }

    fn name(&self) -> &str {
        "corpus"
    }
}
