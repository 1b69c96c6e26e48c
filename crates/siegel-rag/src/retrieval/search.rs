//! Query-time retrieval against a built index

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::providers::{EmbeddingProvider, RetryPolicy};
use crate::types::Chunk;

/// A retrieved chunk with its similarity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Similarity score (higher is better)
    pub score: f32,
}

/// Ranked chunks for one query, best first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Query text as given
    pub query: String,
    /// At most k chunks in descending score order
    pub results: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Distinct document ids in order of first appearance
    pub fn document_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for r in &self.results {
            let id = r.chunk.document_id();
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}

/// Reject a blank query or `k == 0` before anything is embedded
pub fn check_request(query: &str, k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::invalid_argument("k must be at least 1"));
    }
    if query.trim().is_empty() {
        return Err(Error::invalid_argument("query must not be empty"));
    }
    Ok(())
}

/// Embeds queries and searches the index
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self {
            embedder,
            policy,
            similarity_threshold: None,
        }
    }

    /// Drop results scoring below `threshold`; `None` keeps every result
    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Top-`k` chunks for `query`
    pub async fn retrieve(&self, index: &VectorIndex, query: &str, k: usize) -> Result<RetrievalResult> {
        check_request(query, k)?;

        let manifest = index.manifest();
        if manifest.model != self.embedder.model() {
            return Err(Error::EmbeddingModelMismatch {
                expected: manifest.model.clone(),
                actual: self.embedder.model().to_string(),
            });
        }

        if index.is_empty() {
            tracing::debug!("Index is empty; nothing to retrieve");
            return Ok(RetrievalResult {
                query: query.to_string(),
                results: Vec::new(),
            });
        }

        let embedder = &self.embedder;
        let query_vector = self
            .policy
            .run("embedding", || embedder.embed(query))
            .await?;

        if query_vector.len() != index.dimensions() {
            return Err(Error::EmbeddingModelMismatch {
                expected: format!("{} ({} dims)", manifest.model, index.dimensions()),
                actual: format!("{} ({} dims)", self.embedder.model(), query_vector.len()),
            });
        }

        let results = index.search(&query_vector, k, self.similarity_threshold);
        tracing::debug!(
            "Retrieved {} chunks (top score {:?})",
            results.len(),
            results.first().map(|r| r.score)
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            results,
        })
    }
}
