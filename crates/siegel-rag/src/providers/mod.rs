//! Provider abstractions for embeddings and LLM
//!
//! Trait-based seams that allow switching between a local Ollama server and
//! an OpenAI-compatible API, plus the shared retry policy.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod retry;

pub use embedding::EmbeddingProvider;
pub use llm::{GenerationRequest, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
pub use retry::RetryPolicy;

use std::sync::Arc;

use crate::config::{EmbeddingConfig, LlmConfig, ProviderKind};
use crate::error::Result;

/// Create the configured embedding provider
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let timeout = config.retry.timeout();
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        ProviderKind::Ollama => {
            let client = Arc::new(OllamaClient::new(&config.base_url, timeout)?);
            Arc::new(OllamaEmbedder::from_client(
                client,
                config.model.clone(),
                config.dimensions,
            ))
        }
        ProviderKind::OpenAi => {
            let client = OpenAiClient::new(config.api_key.as_deref(), &config.base_url, timeout)?;
            Arc::new(OpenAiEmbedder::new(client, config.model.clone(), config.dimensions))
        }
    };

    tracing::info!(
        "Embedding provider: {} ({}, {} dims)",
        provider.name(),
        provider.model(),
        provider.dimensions()
    );
    Ok(provider)
}

/// Create the configured LLM provider
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = config.retry.timeout();
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Ollama => {
            let client = Arc::new(OllamaClient::new(&config.base_url, timeout)?);
            Arc::new(OllamaLlm::from_client(client, config.model.clone()))
        }
        ProviderKind::OpenAi => {
            let client = OpenAiClient::new(config.api_key.as_deref(), &config.base_url, timeout)?;
            Arc::new(OpenAiChat::new(client, config.model.clone()))
        }
    };

    tracing::info!("LLM provider: {} ({})", provider.name(), provider.model());
    Ok(provider)
}
