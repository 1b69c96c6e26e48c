//! Response types for RAG queries

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Chunk, SourceType};
use crate::retrieval::RetrievalResult;

/// Answer returned when retrieval found nothing to ground an answer on
pub const NOT_FOUND_ANSWER: &str = "Entschuldigung, ich konnte keine Antwort finden.";

/// Citation of one retrieved chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// 1-based rank, matches the `[n]` label in the prompt
    pub rank: usize,
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID (corpus-relative path)
    pub document_id: String,
    /// Source-type tag
    pub source_type: SourceType,
    /// Section title (if detected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    /// Exact snippet from the source
    pub snippet: String,
    /// Similarity score
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(rank: usize, chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            rank,
            chunk_id: chunk.id,
            document_id: chunk.source.document_id.clone(),
            source_type: chunk.source.source_type,
            section_title: chunk.source.section_title.clone(),
            snippet: chunk.content.clone(),
            similarity_score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        match &self.section_title {
            Some(section) => format!("[{}] {} ({})", self.rank, self.document_id, section),
            None => format!("[{}] {}", self.rank, self.document_id),
        }
    }
}

/// Result of a successful `ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerWithSources {
    /// Generated answer
    pub answer: String,
    /// Distinct document ids in order of first appearance
    pub sources: Vec<String>,
    /// The retrieval the answer was built from
    pub retrieval: RetrievalResult,
    /// End-to-end time in milliseconds
    pub processing_time_ms: u64,
}

impl AnswerWithSources {
    /// Citations for every retrieved chunk, in rank order
    pub fn citations(&self) -> Vec<Citation> {
        self.retrieval
            .results
            .iter()
            .enumerate()
            .map(|(i, scored)| Citation::from_chunk(i + 1, &scored.chunk, scored.score))
            .collect()
    }

    /// Highest similarity among the retrieved chunks
    pub fn top_similarity(&self) -> Option<f32> {
        self.retrieval.results.first().map(|r| r.score)
    }
}

/// HTTP body for `POST /api/ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub citations: Vec<Citation>,
    pub chunks_retrieved: usize,
    pub processing_time_ms: u64,
}

impl From<&AnswerWithSources> for AskResponse {
    fn from(answer: &AnswerWithSources) -> Self {
        Self {
            answer: answer.answer.clone(),
            sources: answer.sources.clone(),
            citations: answer.citations(),
            chunks_retrieved: answer.retrieval.len(),
            processing_time_ms: answer.processing_time_ms,
        }
    }
}
