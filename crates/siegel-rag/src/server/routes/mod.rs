//! API routes for the RAG server

pub mod ask;
pub mod index;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::interactions::LogStats;
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ask", post(ask::ask))
        .route("/index", get(index::index_info))
        .route("/index/rebuild", post(index::rebuild_index))
        .route("/stats", get(stats))
        .route("/info", get(info))
}

/// GET /api/stats - Interaction log statistics
async fn stats(State(state): State<AppState>) -> Result<Json<LogStats>> {
    match state.interaction_log() {
        Some(log) => Ok(Json(log.stats()?)),
        None => Ok(Json(LogStats::default())),
    }
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "siegel-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over the Siegel creation guide with source citations",
        "models": {
            "embedding": config.embeddings.model,
            "llm": config.llm.model,
        },
        "endpoints": {
            "POST /api/ask": "Answer a question with sources",
            "GET /api/index": "Index state and manifest",
            "POST /api/index/rebuild": "Rebuild the index from the corpus",
            "GET /api/stats": "Interaction log statistics",
        }
    }))
}
