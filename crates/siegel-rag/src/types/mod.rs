//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{AssetRecord, Chunk, ChunkSource, Document, SourceType};
pub use query::AskRequest;
pub use response::{AnswerWithSources, AskResponse, Citation, NOT_FOUND_ANSWER};
