//! Corpus to chunk pipeline with optional deduplication

use std::collections::HashSet;

use super::chunker::TextChunker;
use super::loader::Corpus;
use crate::config::{ChunkingConfig, DedupMode};
use crate::error::Result;
use crate::types::document::sha256_hex;
use crate::types::Chunk;

/// Chunks produced from a corpus, with counters for the build log
#[derive(Debug, Clone, Default)]
pub struct IngestOutput {
    /// Chunks in document order, then chunk order
    pub chunks: Vec<Chunk>,
    /// Documents that contributed chunks
    pub documents: usize,
    /// Documents dropped as duplicates
    pub duplicate_documents: usize,
    /// Chunks dropped as duplicates
    pub duplicate_chunks: usize,
}

/// Turns a loaded corpus into chunks ready for embedding
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    chunker: TextChunker,
    dedup: DedupMode,
}

impl IngestPipeline {
    /// Create a new ingest pipeline
    pub fn new(chunker: TextChunker, dedup: DedupMode) -> Self {
        Self { chunker, dedup }
    }

    /// Build from the chunking config and dedup mode
    pub fn from_config(chunking: &ChunkingConfig, dedup: DedupMode) -> Result<Self> {
        Ok(Self::new(TextChunker::from_config(chunking)?, dedup))
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Chunk every document of the corpus
    pub fn process(&self, corpus: &Corpus) -> IngestOutput {
        let mut output = IngestOutput::default();
        let mut seen_docs = HashSet::new();
        let mut seen_chunks = HashSet::new();

        for doc in &corpus.documents {
            if self.dedup != DedupMode::Off && !seen_docs.insert(normalized_hash(&doc.text)) {
                tracing::debug!("Dropping duplicate document {}", doc.id);
                output.duplicate_documents += 1;
                continue;
            }

            let before = output.chunks.len();
            for chunk in self.chunker.chunks(doc) {
                if self.dedup == DedupMode::Chunks
                    && !seen_chunks.insert(normalized_hash(&chunk.content))
                {
                    output.duplicate_chunks += 1;
                    continue;
                }
                output.chunks.push(chunk);
            }
            if output.chunks.len() > before {
                output.documents += 1;
            }
        }

        tracing::info!(
            "Chunked {} documents into {} chunks ({} duplicate documents, {} duplicate chunks dropped)",
            output.documents,
            output.chunks.len(),
            output.duplicate_documents,
            output.duplicate_chunks
        );

        output
    }
}

/// Hash of the lowercased, whitespace-collapsed text
fn normalized_hash(text: &str) -> String {
    let normalized = text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    sha256_hex(normalized.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, SourceType};
    use std::path::PathBuf;

    fn corpus(texts: &[(&str, &str)]) -> Corpus {
        Corpus {
            documents: texts
                .iter()
                .map(|(id, text)| {
                    Document::new(*id, PathBuf::from(id), SourceType::Guide, text.to_string())
                })
                .collect(),
            ..Default::default()
        }
    }

    fn pipeline(dedup: DedupMode) -> IngestPipeline {
        IngestPipeline::new(TextChunker::new(20, 5).unwrap(), dedup)
    }

    #[test]
    fn test_no_dedup_keeps_everything() {
        let c = corpus(&[("a.md", "Same text"), ("b.md", "same   TEXT"), ("c.md", "")]);
        let out = pipeline(DedupMode::Off).process(&c);
        assert_eq!(out.chunks.len(), 2);
        assert_eq!(out.documents, 2);
        assert_eq!(out.duplicate_documents, 0);
    }

    #[test]
    fn test_document_dedup_uses_normalized_text() {
        let c = corpus(&[("a.md", "Same text"), ("b.md", "same   TEXT")]);
        let out = pipeline(DedupMode::Documents).process(&c);
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.chunks[0].source.document_id, "a.md");
        assert_eq!(out.duplicate_documents, 1);
    }

    #[test]
    fn test_chunk_dedup_across_documents() {
        let c = corpus(&[("a.md", "Shared line"), ("b.md", "shared line")]);
        // Document dedup already catches identical documents; chunk mode also
        // catches repeated chunks inside otherwise different documents.
        let c2 = corpus(&[("a.md", "Shared line"), ("b.md", "Other words")]);
        assert_eq!(pipeline(DedupMode::Chunks).process(&c).chunks.len(), 1);
        assert_eq!(pipeline(DedupMode::Chunks).process(&c2).chunks.len(), 2);

        let repeated = "abcdefghijklmnop ".repeat(4);
        let c3 = corpus(&[("x.md", "Unique prefix text"), ("y.md", repeated.as_str())]);
        let out = pipeline(DedupMode::Chunks).process(&c3);
        let unique: HashSet<_> = out.chunks.iter().map(|c| c.content.to_lowercase()).collect();
        assert_eq!(unique.len(), out.chunks.len());
    }
}
