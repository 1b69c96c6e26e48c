//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Full user prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl GenerationRequest {
    /// Request with a prompt only
    pub fn new(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
        }
    }
}

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (phi3, llama3, etc.)
/// - `OpenAiChat`: OpenAI-compatible chat completions
///
/// Errors follow the provider convention: `Error::Transient` (or a
/// transient `Error::Http`) may be retried, anything else is final.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion and return the raw model text
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
