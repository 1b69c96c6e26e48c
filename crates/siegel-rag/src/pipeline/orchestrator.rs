//! `RagPipeline`: lazily built index, retrieval, generation and event logging

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::RagConfig;
use crate::error::{Error, QueryError, Result};
use crate::generation::AnswerGenerator;
use crate::index::{EmbeddingIndexer, IndexManifest, IndexStore, VectorIndex};
use crate::ingestion::{Corpus, DocumentLoader, IngestPipeline};
use crate::interactions::{ErrorEvent, InteractionEvent, InteractionSink, NullSink};
use crate::providers::{EmbeddingProvider, LlmProvider, RetryPolicy};
use crate::retrieval::{check_request, Retriever};
use crate::types::query::ANONYMOUS_USER;
use crate::types::AnswerWithSources;

/// Shared, read-only handle to the built index
pub type IndexHandle = Arc<VectorIndex>;

/// Lifecycle of the cached index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing built or loaded yet
    Uninitialized,
    /// Index available, pipeline wiring in progress
    IndexReady,
    /// Queries can be answered
    Ready,
    /// Index build failed; cleared only by `invalidate_index`
    Failed(String),
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Uninitialized => "uninitialized",
            PipelineState::IndexReady => "index_ready",
            PipelineState::Ready => "ready",
            PipelineState::Failed(_) => "failed",
        }
    }
}

struct Slot {
    state: PipelineState,
    index: Option<IndexHandle>,
    force_rebuild: bool,
    /// Bumped by every invalidation; a build started under an older value is discarded
    generation: u64,
}

/// The question-answering pipeline
pub struct RagPipeline {
    config: RagConfig,
    loader: DocumentLoader,
    ingest: IngestPipeline,
    indexer: EmbeddingIndexer,
    retriever: Retriever,
    generator: AnswerGenerator,
    sink: Arc<dyn InteractionSink>,
    slot: RwLock<Slot>,
    /// Serializes index build and load
    build_lock: Mutex<()>,
}

impl RagPipeline {
    /// Wire a pipeline from config and providers; nothing is loaded yet
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let ingest = IngestPipeline::from_config(&config.chunking, config.corpus.dedup)?;
        let embed_policy = RetryPolicy::from_config(&config.embeddings.retry);
        let indexer = EmbeddingIndexer::new(
            Arc::clone(&embedder),
            IndexStore::new(&config.index.storage_dir),
            embed_policy.clone(),
            config.embeddings.batch_size,
            config.index.metric,
        );
        let retriever = Retriever::new(embedder, embed_policy)
            .with_threshold(config.retrieval.similarity_threshold);
        let generator = AnswerGenerator::new(
            llm,
            RetryPolicy::from_config(&config.llm.retry),
            config.llm.temperature,
        );

        Ok(Self {
            loader: DocumentLoader::new(config.corpus.clone()),
            ingest,
            indexer,
            retriever,
            generator,
            sink: Arc::new(NullSink),
            slot: RwLock::new(Slot {
                state: PipelineState::Uninitialized,
                index: None,
                force_rebuild: false,
                generation: 0,
            }),
            build_lock: Mutex::new(()),
            config,
        })
    }

    /// Send interaction and error events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn InteractionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.slot.read().state.clone()
    }

    /// Manifest of the active index, or of the persisted one if none is loaded
    pub fn index_info(&self) -> Result<IndexManifest> {
        if let Some(index) = &self.slot.read().index {
            return Ok(index.manifest().clone());
        }
        self.indexer.info()
    }

    /// Probe the embedding and LLM services; `(embedding_ok, llm_ok)`
    pub async fn check_services(&self) -> (bool, bool) {
        let (embedding, llm) = tokio::join!(
            self.indexer.embedder().health_check(),
            self.generator.llm().health_check()
        );
        (embedding.unwrap_or(false), llm.unwrap_or(false))
    }

    /// Return the index, loading or building it on first use.
    ///
    /// Concurrent callers share one build. After a failed build every call
    /// fails with `IndexUnavailable` until `invalidate_index`.
    pub async fn ensure_index(&self) -> Result<IndexHandle> {
        if let Some(index) = self.cached()? {
            return Ok(index);
        }

        let _guard = self.build_lock.lock().await;
        if let Some(index) = self.cached()? {
            return Ok(index);
        }

        let (force, generation) = {
            let slot = self.slot.read();
            (slot.force_rebuild, slot.generation)
        };
        let outcome = self.load_or_build(force).await;

        let mut slot = self.slot.write();
        if slot.generation != generation {
            tracing::info!("Index invalidated during build; result not cached");
            return outcome.map_err(|e| match e {
                Error::EmbeddingModelMismatch { .. } => e,
                other => Error::IndexUnavailable(other.to_string()),
            });
        }

        match outcome {
            Ok(index) => {
                slot.index = Some(Arc::clone(&index));
                slot.force_rebuild = false;
                slot.state = PipelineState::IndexReady;
                tracing::info!(
                    "Index ready: {} chunks, model {}",
                    index.len(),
                    index.manifest().model
                );
                slot.state = PipelineState::Ready;
                Ok(index)
            }
            Err(e) => {
                tracing::error!("Index build failed: {}", e);
                slot.state = PipelineState::Failed(e.to_string());
                match e {
                    Error::EmbeddingModelMismatch { .. } => Err(e),
                    other => Err(Error::IndexUnavailable(other.to_string())),
                }
            }
        }
    }

    /// Drop the cached index and force the next `ensure_index` to rebuild
    pub fn invalidate_index(&self) {
        let mut slot = self.slot.write();
        slot.index = None;
        slot.state = PipelineState::Uninitialized;
        slot.force_rebuild = true;
        slot.generation += 1;
        tracing::info!("Index invalidated; next use rebuilds from the corpus");
    }

    /// Rebuild from the corpus now
    pub async fn rebuild_index(&self) -> Result<IndexHandle> {
        self.invalidate_index();
        self.ensure_index().await
    }

    /// Answer a question for an anonymous user
    pub async fn ask(&self, query: &str) -> std::result::Result<AnswerWithSources, QueryError> {
        self.ask_with(ANONYMOUS_USER, query, None).await
    }

    /// Answer a question on behalf of `user_id`
    pub async fn ask_as(
        &self,
        user_id: &str,
        query: &str,
    ) -> std::result::Result<AnswerWithSources, QueryError> {
        self.ask_with(user_id, query, None).await
    }

    /// Answer a question with an optional per-call `top_k`
    pub async fn ask_with(
        &self,
        user_id: &str,
        query: &str,
        top_k: Option<usize>,
    ) -> std::result::Result<AnswerWithSources, QueryError> {
        let k = top_k.unwrap_or(self.config.retrieval.top_k);

        match self.run_query(query, k).await {
            Ok(answer) => {
                let event = InteractionEvent::from_answer(user_id, query, &answer);
                if let Err(e) = self.sink.record_interaction(&event) {
                    tracing::warn!("Failed to record interaction: {}", e);
                }
                Ok(answer)
            }
            Err(err) => {
                tracing::warn!("Query failed ({}): {}", err.error.kind(), err.error);
                let event = ErrorEvent::new(user_id, query, &err.error, err.sources());
                if let Err(e) = self.sink.record_error(&event) {
                    tracing::warn!("Failed to record error event: {}", e);
                }
                Err(err)
            }
        }
    }

    async fn run_query(
        &self,
        query: &str,
        k: usize,
    ) -> std::result::Result<AnswerWithSources, QueryError> {
        let started = Instant::now();
        check_request(query, k)?;
        let index = self.ensure_index().await?;
        let retrieval = self.retriever.retrieve(&index, query, k).await?;

        match self.generator.generate(query, &retrieval).await {
            Ok(generated) => Ok(AnswerWithSources {
                answer: generated.answer,
                sources: generated.sources,
                retrieval,
                processing_time_ms: started.elapsed().as_millis() as u64,
            }),
            Err(e) => Err(QueryError::with_retrieval(e, retrieval)),
        }
    }

    fn cached(&self) -> Result<Option<IndexHandle>> {
        let slot = self.slot.read();
        if let PipelineState::Failed(message) = &slot.state {
            return Err(Error::IndexUnavailable(message.clone()));
        }
        Ok(slot.index.clone())
    }

    async fn load_or_build(&self, force: bool) -> Result<IndexHandle> {
        if force {
            let corpus = self.load_corpus().await?;
            return self.indexer.rebuild(&corpus, &self.ingest).await;
        }

        match self.indexer.load().await {
            Ok(index) => {
                let chunking_changed = self.chunking_differs(index.manifest());
                if !self.config.index.rebuild_on_corpus_change {
                    return Ok(index);
                }
                if chunking_changed {
                    tracing::info!("Chunking parameters changed since the index was built; rebuilding");
                    let corpus = self.load_corpus().await?;
                    return self.indexer.rebuild(&corpus, &self.ingest).await;
                }
                let corpus = self.load_corpus().await?;
                if corpus.fingerprint() == index.manifest().corpus_fingerprint {
                    return Ok(index);
                }
                tracing::info!("Corpus changed since the index was built; rebuilding");
                return self.indexer.rebuild(&corpus, &self.ingest).await;
            }
            Err(Error::IndexNotFound(dir)) => {
                tracing::info!("No persisted index in {}; building", dir.display());
            }
            Err(Error::IndexCorrupt { path, message }) => {
                tracing::warn!("Persisted index {} is corrupt ({}); rebuilding", path.display(), message);
            }
            Err(e) => return Err(e),
        }

        let corpus = self.load_corpus().await?;
        self.indexer.rebuild(&corpus, &self.ingest).await
    }

    /// Warn when the persisted index was chunked with other parameters
    fn chunking_differs(&self, manifest: &IndexManifest) -> bool {
        let c = &self.config.chunking;
        if manifest.chunk_size == c.chunk_size && manifest.chunk_overlap == c.chunk_overlap {
            return false;
        }
        tracing::warn!(
            "Persisted index uses chunk_size={} overlap={}, config has chunk_size={} overlap={}",
            manifest.chunk_size,
            manifest.chunk_overlap,
            c.chunk_size,
            c.chunk_overlap
        );
        true
    }

    async fn load_corpus(&self) -> Result<Corpus> {
        let loader = self.loader.clone();
        tokio::task::spawn_blocking(move || loader.load_configured())
            .await
            .map_err(|e| Error::internal(format!("corpus load task failed: {}", e)))?
    }
}
