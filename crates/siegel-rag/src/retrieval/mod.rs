//! Similarity retrieval

mod search;

pub use search::{check_request, RetrievalResult, Retriever, ScoredChunk};
