//! Configuration for the Siegel RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Source corpus configuration
    pub corpus: CorpusConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding model configuration
    pub embeddings: EmbeddingConfig,
    /// LLM configuration
    pub llm: LlmConfig,
    /// Persisted index configuration
    pub index: IndexConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Interaction log configuration
    pub logging: InteractionLogConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let mut config: RagConfig = toml::from_str(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a file when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Self::default();
                config.apply_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Fill secrets from the environment when absent from the file
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.embeddings.api_key.is_none() {
                self.embeddings.api_key = Some(key.clone());
            }
            if self.llm.api_key.is_none() {
                self.llm.api_key = Some(key);
            }
        }
    }

    /// Reject parameter combinations the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be > 0".into()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be > 0".into()));
        }
        if self.embeddings.model.trim().is_empty() {
            return Err(Error::Config("embeddings.model must not be empty".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Duplicate handling before embedding
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Keep everything
    #[default]
    Off,
    /// Drop documents whose normalised text was already seen
    Documents,
    /// Drop duplicate documents and duplicate chunks
    Chunks,
}

/// Source corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Root directory of the document tree
    pub root: PathBuf,
    /// File extensions treated as text (lowercase, without dot)
    pub text_extensions: Vec<String>,
    /// File extensions tracked as non-embedded assets
    pub asset_extensions: Vec<String>,
    /// Normalise whitespace and punctuation before chunking
    pub clean_text: bool,
    /// Synthesise one catalog document per asset directory
    pub asset_catalogs: bool,
    /// Duplicate handling
    pub dedup: DedupMode,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            text_extensions: vec!["md".into(), "markdown".into(), "txt".into()],
            asset_extensions: vec![
                "png".into(),
                "jpg".into(),
                "jpeg".into(),
                "gif".into(),
                "svg".into(),
                "webp".into(),
            ],
            clean_text: false,
            asset_catalogs: true,
            dedup: DedupMode::Off,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Tail of a full window searched for a natural break
    pub boundary_window: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            boundary_window: 100,
        }
    }
}

/// Which HTTP API a provider talks to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI or any OpenAI-compatible endpoint
    OpenAi,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend API
    pub provider: ProviderKind,
    /// Base URL of the API
    pub base_url: String,
    /// Model name; recorded in the index manifest
    pub model: String,
    /// Expected dimensions (768 for nomic-embed-text, 1536 for text-embedding-3-small)
    pub dimensions: usize,
    /// Chunks per embedding request
    pub batch_size: usize,
    /// API key (OpenAI only)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Timeout and retry policy
    pub retry: RetryConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 32,
            api_key: None,
            retry: RetryConfig::default(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend API
    pub provider: ProviderKind,
    /// Base URL of the API
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// API key (OpenAI only)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Timeout and retry policy
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "phi3".to_string(),
            temperature: 0.1, // factual answers
            api_key: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Timeout and bounded retry for one external call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds, doubled each time
    pub initial_backoff_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_retries: 2,
            initial_backoff_ms: 1000,
            max_backoff_ms: 16_000,
        }
    }
}

impl RetryConfig {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Distance used for nearest-neighbour search
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity
    #[default]
    Cosine,
    /// Euclidean (L2) distance, scored as 1 / (1 + d)
    Euclidean,
}

/// Persisted index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding index.json and manifest.json
    pub storage_dir: PathBuf,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Rebuild when the corpus fingerprint differs from the persisted one
    pub rebuild_on_corpus_change: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let storage_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("siegel-rag")
            .join("index");

        Self {
            storage_dir,
            metric: DistanceMetric::Cosine,
            rebuild_on_corpus_change: false,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve
    pub top_k: usize,
    /// Minimum similarity; unset keeps everything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: None,
        }
    }
}

/// Interaction log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionLogConfig {
    /// Write interactions and errors as JSON lines
    pub enabled: bool,
    /// Directory for interactions.jsonl and errors.jsonl
    pub log_dir: PathBuf,
}

impl Default for InteractionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [chunking]
            chunk_size = 500

            [llm]
            provider = "openai"
            model = "gpt-4"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.retrieval.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_dedup_mode_parses_lowercase() {
        let config: RagConfig = toml::from_str("[corpus]\ndedup = \"chunks\"").unwrap();
        assert_eq!(config.corpus.dedup, DedupMode::Chunks);
    }
}
