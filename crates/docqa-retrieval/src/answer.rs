//! Hand-off to answer generation.
//!
//! The language model itself lives outside this crate; generators receive
//! the ranked search results and produce an [`Answer`]. The helpers here
//! render the context block and grounding prompt a model-backed generator
//! sends upstream.

use docqa_core::error::Result;
use docqa_core::types::SearchResult;
use serde::{Deserialize, Serialize};

pub const NO_CONTEXT_ANSWER: &str = "I could not find relevant information to answer your question.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub page: u32,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub model: String,
}

pub trait AnswerGenerator: Send + Sync {
    fn model_id(&self) -> &str;

    /// `context` is ordered by descending score. An empty context must yield
    /// [`no_context_answer`] rather than an error.
    fn generate(&self, question: &str, context: &[SearchResult]) -> Result<Answer>;
}

/// `Source: {source} | Page: {page}` header over each fragment, blocks
/// separated by a horizontal rule.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("Source: {} | Page: {}\n{}", r.fragment.source, r.fragment.page, r.fragment.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    format!(
        "You are a helpful assistant that answers questions based ONLY on the provided context.\n\
         If the answer is not in the context, say \"I don't have enough information to answer this.\"\n\
         Do NOT use your own knowledge or make up information.\n\
         \n\
         CONTEXT:\n\
         {}\n\
         \n\
         QUESTION:\n\
         {}\n\
         \n\
         ANSWER:",
        build_context(results),
        question
    )
}

pub fn sources_of(results: &[SearchResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|r| SourceRef { source: r.fragment.source.clone(), page: r.fragment.page, score: r.score })
        .collect()
}

pub fn no_context_answer(model: &str) -> Answer {
    Answer { answer: NO_CONTEXT_ANSWER.to_string(), sources: Vec::new(), model: model.to_string() }
}

/// Offline generator that answers with the best-scoring fragment verbatim.
///
/// Used by the CLI when no language model is wired in, and in tests.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    pub const MODEL: &'static str = "extractive";
}

impl AnswerGenerator for ExtractiveGenerator {
    fn model_id(&self) -> &str {
        Self::MODEL
    }

    fn generate(&self, _question: &str, context: &[SearchResult]) -> Result<Answer> {
        let Some(best) = context.first() else {
            return Ok(no_context_answer(Self::MODEL));
        };
        Ok(Answer {
            answer: best.fragment.text.trim().to_string(),
            sources: sources_of(context),
            model: Self::MODEL.to_string(),
        })
    }
}
