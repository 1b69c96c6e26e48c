//! Embedding index: flat vector search, persistence and building

mod indexer;
mod store;
mod vector_index;

pub use indexer::EmbeddingIndexer;
pub use store::IndexStore;
pub use vector_index::{
    cosine_similarity, score, IndexEntry, IndexManifest, VectorIndex, INDEX_FORMAT_VERSION,
};
