//! Shared fixtures: deterministic fake providers and a small corpus

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use siegel_rag::config::{DedupMode, RagConfig, RetryConfig};
use siegel_rag::error::{Error, Result};
use siegel_rag::providers::{EmbeddingProvider, GenerationRequest, LlmProvider};
use siegel_rag::RagPipeline;

pub const GUIDE_ID: &str = "information/sigil_creation_guide.md";

pub const GUIDE: &str = "## Overview\n\
A city seal combines a frame, a central emblem and decorative spikes. Each part is picked from the component library.\n\n\
## Population Frame\n\
The background of a city seal depends on its population. A city with a population over 1 million uses green spikes on the frame.\n\n\
## Colors\n\
Gold is reserved for capitals. Silver rings mark harbour towns, and red ribbons mark university towns.\n\n\
## Emblems\n\
The emblem sits in the center and shows the main landmark of the town, drawn in a single line style.\n";

pub const POPULATION_QUESTION: &str =
    "What background does a city seal with population over 1 million use?";

/// Write the fixture corpus under `root`
pub fn write_corpus(root: &Path) {
    let guide = root.join(GUIDE_ID);
    fs::create_dir_all(guide.parent().unwrap()).unwrap();
    fs::write(&guide, GUIDE).unwrap();

    let frames = root.join("sigil components").join("frames");
    fs::create_dir_all(&frames).unwrap();
    fs::write(frames.join("green_spikes.png"), b"\x89PNG").unwrap();
    fs::write(frames.join("silver_ring.png"), b"\x89PNG").unwrap();

    let examples = root.join("complete_sigils");
    fs::create_dir_all(&examples).unwrap();
    fs::write(examples.join("berlin_sigil.png"), b"\x89PNG").unwrap();
}

/// Config rooted in `base` with one chunk per guide section and fast retries
pub fn test_config(base: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.corpus.root = base.join("data");
    config.corpus.dedup = DedupMode::Off;
    config.chunking.chunk_size = 200;
    config.chunking.chunk_overlap = 0;
    config.chunking.boundary_window = 200;
    config.embeddings.model = FakeEmbedder::MODEL.to_string();
    config.embeddings.dimensions = FakeEmbedder::DIMS;
    config.embeddings.batch_size = 64;
    config.embeddings.retry = fast_retry();
    config.llm.retry = fast_retry();
    config.index.storage_dir = base.join("index");
    config.logging.log_dir = base.join("logs");
    config.retrieval.top_k = 3;
    config
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        timeout_secs: 1,
        max_retries: 2,
        initial_backoff_ms: 10,
        max_backoff_ms: 40,
    }
}

pub fn pipeline(config: RagConfig, embedder: Arc<FakeEmbedder>, llm: Arc<dyn LlmProvider>) -> RagPipeline {
    RagPipeline::new(config, embedder, llm).unwrap()
}

/// Hashed bag-of-words embedder; similar wording gives similar vectors
pub struct FakeEmbedder {
    model: String,
    dims: usize,
    batch_calls: AtomicUsize,
    query_calls: AtomicUsize,
    batch_delay: Duration,
}

impl FakeEmbedder {
    pub const MODEL: &'static str = "fake-embed";
    pub const DIMS: usize = 256;

    pub fn new() -> Self {
        Self::with_model(Self::MODEL)
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            dims: Self::DIMS,
            batch_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            batch_delay: Duration::ZERO,
        }
    }

    /// Sleep inside every batch call so concurrent builds would overlap
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let mut hash: u64 = 0xcbf29ce484222325;
            for b in token.bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % self.dims as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// How a `FakeLlm` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmMode {
    /// Answer with the top-ranked context chunk
    EchoTopChunk,
    /// Never answer within any sane timeout
    Hang,
    /// Reply with whitespace only
    Blank,
    /// Fail with a retryable error
    Flaky,
}

pub struct FakeLlm {
    mode: LlmMode,
    calls: AtomicUsize,
    last_prompt: parking_lot::Mutex<Option<String>>,
}

impl FakeLlm {
    pub fn new(mode: LlmMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            last_prompt: parking_lot::Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

/// Content of context block `[1]` in a rendered prompt
pub fn top_context_chunk(prompt: &str) -> Option<&str> {
    let context = prompt.split("Kontext:\n").nth(1)?;
    let first = context.split("\n\n---").next()?;
    first.split_once("\n\n").map(|(_, content)| content)
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(request.prompt.clone());

        match self.mode {
            LlmMode::EchoTopChunk => {
                let top = top_context_chunk(&request.prompt).unwrap_or_default();
                Ok(format!("Laut Leitfaden: {}", top.trim()))
            }
            LlmMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("too late".to_string())
            }
            LlmMode::Blank => Ok("  \n ".to_string()),
            LlmMode::Flaky => Err(Error::Transient("503 from upstream".to_string())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-llm"
    }
}

/// Temp dir holding corpus, index and logs
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn with_corpus() -> Self {
        let ws = Self::empty();
        write_corpus(&ws.data_dir());
        ws
    }

    pub fn empty() -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.dir.path().join("index")
    }

    pub fn config(&self) -> RagConfig {
        test_config(self.dir.path())
    }
}
