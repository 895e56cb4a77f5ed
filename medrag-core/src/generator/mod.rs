//! Answer generation: prompt construction around a text-generation oracle.
//!
//! Oracle failures never escape as errors. [`AnswerGenerator::generate`]
//! returns a tagged [`GenerationOutcome`] and the orchestrator decides what
//! the caller sees in place of an answer.

pub mod gemini;

use crate::error::LlmError;
use crate::types::Document;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub use gemini::GeminiGenerator;

/// A black-box text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Result of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Answer(String),
    Failed { reason: String },
}

impl GenerationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, GenerationOutcome::Failed { .. })
    }
}

/// The user-facing text for a failed generation.
pub fn generation_error_message(reason: &str) -> String {
    format!("Error generating answer: {reason}")
}

/// Build the grounded-answer prompt.
///
/// The context is embedded verbatim. The model is told to cite with
/// `[PMID: <digits>]` and to say so when the literature is insufficient.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a medical AI assistant helping healthcare professionals. \
Provide accurate, evidence-based answers with proper citations.

MEDICAL LITERATURE:
{context}

QUESTION: {question}

INSTRUCTIONS:
1. Answer based ONLY on the provided literature
2. Cite sources using [PMID: xxxxx] format, where xxxxx is the numeric PMID
3. If information is insufficient, state this clearly
4. Use professional medical language
5. Highlight any conflicting findings

ANSWER:"
    )
}

/// First two sentences of an abstract, ending in a single period.
fn lead_sentences(abstract_text: &str) -> String {
    let lead = abstract_text
        .trim()
        .split(". ")
        .take(2)
        .collect::<Vec<_>>()
        .join(". ");
    format!("{}.", lead.trim_end_matches('.'))
}

/// Summarize the leading abstracts directly, citing each one.
///
/// Used when the oracle is unreachable. Every summarized sentence pair is
/// followed by a `[PMID: <pmid>]` marker, so the output still satisfies the
/// citation contract. At least one source is always summarized.
pub fn extractive_summary(documents: &[Document], max_sources: usize) -> String {
    let mut parts = vec!["Based on medical literature review:".to_string()];
    for doc in documents.iter().take(max_sources.max(1)) {
        parts.push(format!(
            "{} [PMID: {}]",
            lead_sentences(&doc.abstract_text),
            doc.pmid
        ));
    }
    parts.push(format!(
        "\n\nThis summary is based on {} research papers. See source documents for complete details.",
        documents.len()
    ));
    parts.join(" ")
}

/// Wraps a text-generation oracle with prompt construction.
#[derive(Clone)]
pub struct AnswerGenerator {
    oracle: Arc<dyn TextGenerator>,
}

impl AnswerGenerator {
    pub fn new(oracle: Arc<dyn TextGenerator>) -> Self {
        Self { oracle }
    }

    pub fn model_name(&self) -> &str {
        self.oracle.model_name()
    }

    /// Generate an answer to `question` grounded in `context`.
    pub async fn generate(&self, question: &str, context: &str) -> GenerationOutcome {
        let prompt = build_prompt(question, context);
        debug!(
            model = self.oracle.model_name(),
            prompt_chars = prompt.len(),
            "Requesting answer"
        );

        match self.oracle.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => GenerationOutcome::Answer(text),
            Ok(_) => {
                warn!(model = self.oracle.model_name(), "Generation oracle returned empty text");
                GenerationOutcome::Failed {
                    reason: LlmError::EmptyResponse.to_string(),
                }
            }
            Err(e) => {
                warn!(model = self.oracle.model_name(), error = %e, "Generation oracle failed");
                GenerationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("model", &self.oracle.model_name())
            .finish()
    }
}

/// A deterministic generation oracle for tests and offline runs.
///
/// Returns queued responses in order; once the queue is empty it returns
/// the default response, or the configured error if it is failing.
pub struct MockGenerator {
    model: String,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    default_response: Result<String, LlmError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::with_response("I'm a mock model. No queued responses available.")
    }

    /// A mock that always answers with `text`.
    pub fn with_response(text: &str) -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            default_response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always fails with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self {
            default_response: Err(error),
            ..Self::new()
        }
    }

    /// Queue a response for the next call.
    pub fn queue_response(&self, response: Result<String, LlmError>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let queued = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        queued.unwrap_or_else(|| self.default_response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
