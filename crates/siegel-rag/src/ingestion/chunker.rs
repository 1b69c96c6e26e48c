//! Text chunking with overlap, natural-boundary preference and offset tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, Document};

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
    /// Tail of a full window searched for a natural break
    boundary_window: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be > 0".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
            boundary_window: 100.min(chunk_size),
        })
    }

    /// Create a chunker from the chunking section of the config
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Ok(Self::new(config.chunk_size, config.chunk_overlap)?
            .with_boundary_window(config.boundary_window))
    }

    /// Set how far back from a full window a natural break is searched
    pub fn with_boundary_window(mut self, window: usize) -> Self {
        self.boundary_window = window.min(self.chunk_size);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily chunk a document
    pub fn chunks<'a>(&'a self, doc: &'a Document) -> Chunks<'a> {
        let offsets: Vec<usize> = doc
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(doc.text.len()))
            .collect();

        Chunks {
            chunker: self,
            text: &doc.text,
            headings: find_headings(&doc.text),
            source: ChunkSource::for_document(doc),
            len: offsets.len() - 1,
            offsets,
            start: 0,
            index: 0,
            done: doc.text.is_empty(),
        }
    }

    /// Chunk a document eagerly
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.chunks(doc).collect()
    }
}

/// Iterator over the chunks of one document
pub struct Chunks<'a> {
    chunker: &'a TextChunker,
    text: &'a str,
    /// (char position, heading text), ascending
    headings: Vec<(usize, String)>,
    source: ChunkSource,
    /// Byte offset of every char, plus the text length
    offsets: Vec<usize>,
    /// Length in chars
    len: usize,
    start: usize,
    index: u32,
    done: bool,
}

impl Chunks<'_> {
    fn slice(&self, from: usize, to: usize) -> &str {
        &self.text[self.offsets[from]..self.offsets[to]]
    }

    /// ASCII byte at char position `pos`, if that char is ASCII
    fn ascii_at(&self, pos: usize) -> Option<u8> {
        let b = self.text.as_bytes()[self.offsets[pos]];
        b.is_ascii().then_some(b)
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text[self.offsets[pos]..].chars().next()
    }

    /// Pick the end of a full window `[start, window_end)`.
    ///
    /// Candidates must leave the next chunk starting after `start`.
    fn find_break(&self, start: usize, window_end: usize) -> usize {
        let c = self.chunker;
        let lo = window_end
            .saturating_sub(c.boundary_window)
            .max(start + c.overlap + 1);
        if lo > window_end {
            return window_end;
        }

        // Paragraph break: end right after a blank line
        if let Some(p) = (lo.max(2)..=window_end).rev().find(|&p| {
            self.ascii_at(p - 1) == Some(b'\n') && self.ascii_at(p - 2) == Some(b'\n')
        }) {
            return p;
        }

        // Sentence end followed by whitespace
        if let Some(p) = (lo.max(1)..=window_end).rev().find(|&p| {
            matches!(self.ascii_at(p - 1), Some(b'.' | b'!' | b'?'))
                && (p == self.len || self.char_at(p).is_some_and(char::is_whitespace))
        }) {
            return p;
        }

        // Word boundary; the slice runs one char past the window so its own
        // end never counts as a boundary inside the range
        let slice_end = (window_end + 1).min(self.len);
        let base = self.offsets[start];
        let slice = self.slice(start, slice_end);
        let word_break = slice
            .split_word_bound_indices()
            .map(|(i, _)| base + i)
            .filter_map(|byte| self.offsets.binary_search(&byte).ok())
            .filter(|&p| p >= lo && p <= window_end && p < slice_end)
            .last();

        word_break.unwrap_or(window_end)
    }

    fn section_at(&self, pos: usize) -> Option<String> {
        let idx = self.headings.partition_point(|(p, _)| *p <= pos);
        idx.checked_sub(1).map(|i| self.headings[i].1.clone())
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }

        let start = self.start;
        let end = if self.len - start <= self.chunker.chunk_size {
            self.done = true;
            self.len
        } else {
            self.find_break(start, start + self.chunker.chunk_size)
        };

        let mut source = self.source.clone();
        source.section_title = self.section_at(start);

        let chunk = Chunk::new(
            source,
            self.slice(start, end).to_string(),
            start,
            end,
            self.index,
        );

        self.index += 1;
        self.start = end - self.chunker.overlap;
        Some(chunk)
    }
}

/// Markdown ATX headings with their char positions
fn find_headings(text: &str) -> Vec<(usize, String)> {
    let mut headings = Vec::new();
    let mut pos = 0usize;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if (1..=6).contains(&level) {
            let rest = &trimmed[level..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                let title = rest.trim();
                if !title.is_empty() {
                    headings.push((pos, title.to_string()));
                }
            }
        }
        pos += line.chars().count();
    }

    headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;
    use std::path::PathBuf;

    fn doc(text: &str) -> Document {
        Document::new("guide.md", PathBuf::from("guide.md"), SourceType::Guide, text.to_string())
    }

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.content);
            } else {
                out.extend(chunk.content.chars().skip(overlap));
            }
        }
        out
    }

    fn assert_invariants(text: &str, size: usize, overlap: usize) {
        let chunker = TextChunker::new(size, overlap).unwrap().with_boundary_window(size / 4);
        let d = doc(text);
        let chunks = chunker.chunk_document(&d);

        assert_eq!(reassemble(&chunks, overlap), text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index as usize, i);
            assert!(chunk.content.chars().count() <= size);
            assert_eq!(chunk.char_end - chunk.char_start, chunk.content.chars().count());
            let expected: String = text
                .chars()
                .skip(chunk.char_start)
                .take(chunk.char_end - chunk.char_start)
                .collect();
            assert_eq!(chunk.content, expected);
            if i > 0 {
                assert_eq!(chunk.char_start, chunks[i - 1].char_end - overlap);
            }
        }
        assert_eq!(chunks.last().map(|c| c.char_end), Some(text.chars().count()));
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        let chunker = TextChunker::new(100, 20).unwrap();
        assert_eq!(chunker.chunks(&doc("")).count(), 0);
    }

    #[test]
    fn test_short_document_is_one_chunk() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let text = "Ein kurzes Dokument.";
        let chunks = chunker.chunk_document(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!((chunks[0].char_start, chunks[0].char_end), (0, 20));
    }

    #[test]
    fn test_exact_size_document_is_one_chunk() {
        let chunker = TextChunker::new(10, 3).unwrap();
        assert_eq!(chunker.chunk_document(&doc("abcdefghij")).len(), 1);
    }

    #[test]
    fn test_round_trip_ascii() {
        let text = "The frame of a seal shows the population. ".repeat(40)
            + "\n\nSecond paragraph with more words about colours and symbols. ".repeat(10).as_str();
        assert_invariants(&text, 120, 30);
        assert_invariants(&text, 1000, 200);
    }

    #[test]
    fn test_round_trip_multibyte() {
        let text = "Größe über 1 Million: grüne Zacken. Städte ändern ihr Wappen! ".repeat(30)
            + "日本語のテキストも正しく分割されます。".repeat(20).as_str();
        assert_invariants(&text, 64, 16);
        assert_invariants(&text, 100, 0);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "x".repeat(250);
        let chunker = TextChunker::new(100, 10).unwrap();
        let chunks = chunker.chunk_document(&doc(&text));
        assert_eq!(chunks[0].char_end, 100);
        assert_eq!(chunks[1].char_start, 90);
        assert_invariants(&text, 100, 10);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(85), "b".repeat(100));
        let chunker = TextChunker::new(100, 10).unwrap().with_boundary_window(30);
        let chunks = chunker.chunk_document(&doc(&text));
        assert_eq!(chunks[0].content, format!("{}\n\n", "a".repeat(85)));
    }

    #[test]
    fn test_prefers_sentence_end_over_word() {
        let text = format!("{}. {} {}", "a".repeat(80), "bb".repeat(4), "c".repeat(100));
        let chunker = TextChunker::new(100, 10).unwrap().with_boundary_window(30);
        let chunks = chunker.chunk_document(&doc(&text));
        assert!(chunks[0].content.ends_with('.'));
        assert_eq!(chunks[0].char_end, 81);
    }

    #[test]
    fn test_section_titles() {
        let text = "# Guide\n\nIntro text here.\n\n## Population Frame\n\nGreen spikes for big cities.";
        let d = doc(text);
        let chunker = TextChunker::new(30, 5).unwrap().with_boundary_window(10);
        let chunks = chunker.chunk_document(&d);
        assert_eq!(chunks[0].source.section_title.as_deref(), Some("Guide"));
        assert_eq!(
            chunks.last().and_then(|c| c.source.section_title.as_deref()),
            Some("Population Frame")
        );
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        assert!(TextChunker::new(10, 10).is_err());
        assert!(TextChunker::new(0, 0).is_err());
    }
}
