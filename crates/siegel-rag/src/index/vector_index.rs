//! In-memory flat vector index with exact nearest-neighbour search

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::DistanceMetric;
use crate::retrieval::ScoredChunk;
use crate::types::Chunk;

/// Bumped whenever the persisted layout changes
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Build parameters and provenance of an index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// Persisted format version
    pub version: u32,
    /// Embedding model the vectors were computed with
    pub model: String,
    /// Vector dimensions
    pub dimensions: usize,
    /// Distance metric used for search
    pub metric: DistanceMetric,
    /// Chunking parameters used at build time
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Fingerprint of the corpus the index was built from
    pub corpus_fingerprint: String,
    /// Documents that contributed chunks
    pub document_count: usize,
    /// Number of entries
    pub chunk_count: usize,
    /// Build time
    pub created_at: DateTime<Utc>,
}

/// One chunk and its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Immutable collection of embedded chunks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Assemble an index; the entry count in the manifest is taken from `entries`
    pub fn new(mut manifest: IndexManifest, entries: Vec<IndexEntry>) -> Self {
        manifest.chunk_count = entries.len();
        Self { manifest, entries }
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    /// Check the invariants a persisted index must satisfy
    pub fn validate(&self) -> std::result::Result<(), String> {
        let m = &self.manifest;
        if m.version != INDEX_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                m.version, INDEX_FORMAT_VERSION
            ));
        }
        if m.chunk_count != self.entries.len() {
            return Err(format!(
                "manifest lists {} chunks but {} entries are stored",
                m.chunk_count,
                self.entries.len()
            ));
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.embedding.len() != m.dimensions {
                return Err(format!(
                    "chunk {} has {} dimensions, expected {}",
                    entry.chunk.id,
                    entry.embedding.len(),
                    m.dimensions
                ));
            }
            if entry.embedding.iter().any(|v| !v.is_finite()) {
                return Err(format!("chunk {} has a non-finite embedding value", entry.chunk.id));
            }
            if !seen.insert(entry.chunk.id) {
                return Err(format!("duplicate chunk id {}", entry.chunk.id));
            }
        }
        Ok(())
    }

    /// Exact top-k search.
    ///
    /// Scores are higher-is-better. Ties keep entry order, so results are
    /// deterministic for a given index and query. Without a threshold every
    /// entry is a candidate, including negative scores.
    pub fn search(&self, query: &[f32], k: usize, threshold: Option<f32>) -> Vec<ScoredChunk> {
        let mut hits: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, score(self.manifest.metric, query, &entry.embedding)))
            .filter(|(_, s)| threshold.map_or(true, |t| *s >= t))
            .collect();

        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(k);

        hits.into_iter()
            .map(|(i, s)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score: s,
            })
            .collect()
    }
}

/// Similarity under `metric`
pub fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Euclidean => 1.0 / (1.0 + l2_distance(a, b)),
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}
