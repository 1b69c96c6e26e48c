//! Answer generation from retrieved chunks

use std::sync::Arc;

use super::prompt::PromptBuilder;
use crate::error::{Error, Result};
use crate::providers::{GenerationRequest, LlmProvider, RetryPolicy};
use crate::retrieval::RetrievalResult;
use crate::types::NOT_FOUND_ANSWER;

/// Answer text and the documents it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub answer: String,
    /// Distinct document ids in order of first appearance
    pub sources: Vec<String>,
}

/// Calls the LLM with a grounded prompt
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
    temperature: f32,
}

impl AnswerGenerator {
    /// Create a new generator
    pub fn new(llm: Arc<dyn LlmProvider>, policy: RetryPolicy, temperature: f32) -> Self {
        Self {
            llm,
            policy,
            temperature,
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer `query` from `retrieval`.
    ///
    /// An empty retrieval returns the fixed not-found answer without calling
    /// the model.
    pub async fn generate(&self, query: &str, retrieval: &RetrievalResult) -> Result<GeneratedAnswer> {
        if retrieval.is_empty() {
            return Ok(GeneratedAnswer {
                answer: NOT_FOUND_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = PromptBuilder::build_context(&retrieval.results);
        let request = GenerationRequest::new(
            PromptBuilder::build_rag_prompt(query, &context),
            self.temperature,
        );

        tracing::info!(
            "Generating answer with {} from {} chunks",
            self.llm.model(),
            retrieval.len()
        );

        let llm = &self.llm;
        let raw = self.policy.run("llm", || llm.complete(&request)).await?;

        let answer = raw.trim();
        if answer.is_empty() {
            return Err(Error::GenerationFailed("model returned an empty answer".into()));
        }

        Ok(GeneratedAnswer {
            answer: answer.to_string(),
            sources: retrieval.document_ids(),
        })
    }
}
