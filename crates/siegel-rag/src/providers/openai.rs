//! OpenAI-compatible providers (`/embeddings`, `/chat/completions`)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{GenerationRequest, LlmProvider};
use super::ollama::check_status;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Authenticated HTTP client for an OpenAI-compatible API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
}

impl OpenAiClient {
    /// Build a client with the bearer key as a default header
    pub fn new(api_key: Option<&str>, base_url: &str, timeout: Duration) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("missing OpenAI API key (set OPENAI_API_KEY)".into()))?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| Error::Config("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        // The shared default points at Ollama; fall back to the public API
        let base_url = if base_url.contains("localhost:11434") {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.endpoint("models")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Embeddings through an OpenAI-compatible endpoint
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: String, dimensions: usize) -> Self {
        Self {
            client,
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .client
            .post(self.client.endpoint("embeddings"))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, "OpenAI embeddings").await?;

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse OpenAI embedding response: {}", e)))?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions through an OpenAI-compatible endpoint
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let messages = vec![ChatMessage {
            role: "user",
            content: &request.prompt,
        }];

        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            messages,
        };

        let response = self
            .client
            .client
            .post(self.client.endpoint("chat/completions"))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "OpenAI chat completion").await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::GenerationFailed(format!("Failed to parse OpenAI response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| Error::GenerationFailed("OpenAI returned no choices".into()))
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let err = OpenAiClient::new(None, DEFAULT_BASE_URL, Duration::from_secs(5)).err();
        assert!(matches!(err, Some(Error::Config(_))));
        let err = OpenAiClient::new(Some("  "), DEFAULT_BASE_URL, Duration::from_secs(5)).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }

    #[test]
    fn test_ollama_default_url_falls_back_to_public_api() {
        let client =
            OpenAiClient::new(Some("sk-test"), "http://localhost:11434", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint("embeddings"), "https://api.openai.com/v1/embeddings");
    }
}
