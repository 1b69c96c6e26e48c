//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What part of the corpus a document comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// The creation guide and other prose
    Guide,
    /// Seal component descriptions
    Component,
    /// Complete example seals
    Example,
}

impl SourceType {
    /// Classify a corpus-relative path by its directory names.
    ///
    /// Any path component mentioning "component" marks a component; any
    /// mentioning "example" or "complete" marks an example; the rest is guide.
    pub fn classify(relative: &Path) -> Self {
        let mut result = Self::Guide;
        for part in relative.components() {
            let part = part.as_os_str().to_string_lossy().to_lowercase();
            if part.contains("component") {
                return Self::Component;
            }
            if part.contains("example") || part.contains("complete") {
                result = Self::Example;
            }
        }
        result
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Guide => "guide",
            Self::Component => "component",
            Self::Example => "example",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A text document loaded from the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Corpus-relative path with forward slashes; the document identifier
    pub id: String,
    /// Absolute or root-joined path on disk
    pub path: PathBuf,
    /// Source-type tag
    pub source_type: SourceType,
    /// First Markdown heading, if any
    pub title: Option<String>,
    /// Raw text
    pub text: String,
    /// SHA-256 of the text, hex encoded
    pub content_hash: String,
}

impl Document {
    /// Create a document, deriving title and content hash from the text
    pub fn new(id: impl Into<String>, path: PathBuf, source_type: SourceType, text: String) -> Self {
        let title = first_heading(&text);
        let content_hash = sha256_hex(text.as_bytes());
        Self {
            id: id.into(),
            path,
            source_type,
            title,
            text,
            content_hash,
        }
    }
}

/// A non-text file referenced by the corpus; tracked but never embedded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRecord {
    /// Corpus-relative path with forward slashes
    pub id: String,
    /// Corpus-relative parent directory ("" for the root)
    pub directory: String,
    /// File name without extension
    pub stem: String,
    /// Lowercase extension
    pub extension: String,
    /// Source-type tag of the containing directory
    pub source_type: SourceType,
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Owning document identifier
    pub document_id: String,
    /// Source-type tag of the document
    pub source_type: SourceType,
    /// Document title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Nearest Markdown heading at or before the chunk start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
}

impl ChunkSource {
    /// Source info for a chunk of the given document
    pub fn for_document(doc: &Document) -> Self {
        Self {
            document_id: doc.id.clone(),
            source_type: doc.source_type,
            title: doc.title.clone(),
            section_title: None,
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic chunk ID derived from document id and index
    pub id: Uuid,
    /// Text content, an exact slice of the document text
    pub content: String,
    /// Source information for citations
    pub source: ChunkSource,
    /// Character offsets in the document text (end exclusive)
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        source: ChunkSource,
        content: String,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Self::derive_id(&source.document_id, chunk_index),
            content,
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }

    /// Stable id for the `index`-th chunk of `document_id`
    pub fn derive_id(document_id: &str, chunk_index: u32) -> Uuid {
        let name = format!("{}#{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
    }

    /// Owning document identifier
    pub fn document_id(&self) -> &str {
        &self.source.document_id
    }
}

/// SHA-256 of `bytes`, hex encoded
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// First non-empty Markdown heading
pub(crate) fn first_heading(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim_start)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_source_type() {
        assert_eq!(
            SourceType::classify(Path::new("information/sigil_creation_guide.md")),
            SourceType::Guide
        );
        assert_eq!(
            SourceType::classify(Path::new("sigil components/frames/gold.png")),
            SourceType::Component
        );
        assert_eq!(
            SourceType::classify(Path::new("complete_sigils/berlin_sigil.png")),
            SourceType::Example
        );
    }

    #[test]
    fn test_chunk_ids_are_deterministic() {
        assert_eq!(Chunk::derive_id("a.md", 3), Chunk::derive_id("a.md", 3));
        assert_ne!(Chunk::derive_id("a.md", 3), Chunk::derive_id("a.md", 4));
        assert_ne!(Chunk::derive_id("a.md", 3), Chunk::derive_id("b.md", 3));
    }

    #[test]
    fn test_document_title_from_heading() {
        let doc = Document::new(
            "guide.md",
            PathBuf::from("guide.md"),
            SourceType::Guide,
            "\n# Siegel Guide\n\nText".to_string(),
        );
        assert_eq!(doc.title.as_deref(), Some("Siegel Guide"));
        assert_eq!(doc.content_hash.len(), 64);
    }
}
