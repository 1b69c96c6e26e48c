//! siegel-rag: question answering over the Siegel creation guide
//!
//! Loads a corpus of guide text and component catalogs, chunks and embeds it
//! into a persisted vector index, and answers questions with an LLM grounded
//! in the retrieved chunks. Every answer carries the documents it drew on.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod interactions;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, QueryError, Result};
pub use pipeline::{PipelineState, RagPipeline};
pub use types::{
    document::{Chunk, ChunkSource, Document, SourceType},
    query::AskRequest,
    response::{AnswerWithSources, AskResponse, Citation},
};
