//! Document ingestion: corpus loading and chunking

mod chunker;
mod loader;
mod processor;

pub use chunker::{Chunks, TextChunker};
pub use loader::{clean_text, Corpus, DocumentLoader, SkippedFile};
pub use processor::{IngestOutput, IngestPipeline};
