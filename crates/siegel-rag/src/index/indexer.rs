//! Builds, persists and reloads the vector index

use chrono::Utc;
use std::sync::Arc;

use super::store::IndexStore;
use super::vector_index::{IndexEntry, IndexManifest, VectorIndex, INDEX_FORMAT_VERSION};
use crate::config::DistanceMetric;
use crate::error::{Error, Result};
use crate::ingestion::{Corpus, IngestPipeline};
use crate::providers::{EmbeddingProvider, RetryPolicy};

/// Turns a corpus into a persisted `VectorIndex`
pub struct EmbeddingIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: IndexStore,
    policy: RetryPolicy,
    batch_size: usize,
    metric: DistanceMetric,
}

impl EmbeddingIndexer {
    /// Create a new indexer
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: IndexStore,
        policy: RetryPolicy,
        batch_size: usize,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            embedder,
            store,
            policy,
            batch_size: batch_size.max(1),
            metric,
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Chunk and embed the corpus, then persist the result
    pub async fn build(&self, corpus: &Corpus, ingest: &IngestPipeline) -> Result<Arc<VectorIndex>> {
        let output = ingest.process(corpus);
        let expected_dims = self.embedder.dimensions();
        let mut entries = Vec::with_capacity(output.chunks.len());

        tracing::info!(
            "Embedding {} chunks with {} in batches of {}",
            output.chunks.len(),
            self.embedder.model(),
            self.batch_size
        );

        for (batch_no, batch) in output.chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedder = &self.embedder;
            let vectors = self
                .policy
                .run("embedding", || embedder.embed_batch(&texts))
                .await?;

            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                if embedding.len() != expected_dims {
                    return Err(Error::EmbeddingModelMismatch {
                        expected: format!("{} ({} dims)", self.embedder.model(), expected_dims),
                        actual: format!("{} dims", embedding.len()),
                    });
                }
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }
            tracing::debug!("Embedded batch {} ({} chunks)", batch_no + 1, batch.len());
        }

        let manifest = IndexManifest {
            version: INDEX_FORMAT_VERSION,
            model: self.embedder.model().to_string(),
            dimensions: expected_dims,
            metric: self.metric,
            chunk_size: ingest.chunker().chunk_size(),
            chunk_overlap: ingest.chunker().overlap(),
            corpus_fingerprint: corpus.fingerprint(),
            document_count: output.documents,
            chunk_count: entries.len(),
            created_at: Utc::now(),
        };
        let index = Arc::new(VectorIndex::new(manifest, entries));

        let store = self.store.clone();
        let to_save = Arc::clone(&index);
        tokio::task::spawn_blocking(move || store.save(&to_save))
            .await
            .map_err(|e| Error::internal(format!("index persistence task failed: {}", e)))??;

        Ok(index)
    }

    /// Load the persisted index without recomputing anything.
    ///
    /// The index must have been built with the current embedding model.
    pub async fn load(&self) -> Result<Arc<VectorIndex>> {
        let store = self.store.clone();
        let index = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| Error::internal(format!("index load task failed: {}", e)))??;

        self.check_compatible(index.manifest())?;
        tracing::info!(
            "Loaded persisted index: {} chunks from {} documents",
            index.len(),
            index.manifest().document_count
        );
        Ok(Arc::new(index))
    }

    /// Discard any persisted index and build from scratch
    pub async fn rebuild(&self, corpus: &Corpus, ingest: &IngestPipeline) -> Result<Arc<VectorIndex>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| Error::internal(format!("index clear task failed: {}", e)))??;
        self.build(corpus, ingest).await
    }

    /// Manifest of the persisted index, without loading vectors
    pub fn info(&self) -> Result<IndexManifest> {
        self.store.read_manifest()
    }

    /// Reject an index built with a different model or dimension
    pub fn check_compatible(&self, manifest: &IndexManifest) -> Result<()> {
        let model = self.embedder.model();
        let dims = self.embedder.dimensions();
        if manifest.model != model || manifest.dimensions != dims {
            return Err(Error::EmbeddingModelMismatch {
                expected: format!("{} ({} dims)", manifest.model, manifest.dimensions),
                actual: format!("{} ({} dims)", model, dims),
            });
        }
        Ok(())
    }
}
