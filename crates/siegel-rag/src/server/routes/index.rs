//! Index status and rebuild endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::index::IndexManifest;
use crate::server::state::AppState;

/// Response for the index endpoints
#[derive(Debug, Serialize)]
pub struct IndexStatus {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Manifest of the active or persisted index
    pub manifest: Option<IndexManifest>,
}

fn status(state: &AppState) -> Result<IndexStatus> {
    let pipeline = state.pipeline();
    let current = pipeline.state();
    let manifest = match pipeline.index_info() {
        Ok(manifest) => Some(manifest),
        Err(Error::IndexNotFound(_)) => None,
        Err(e) => return Err(e),
    };

    Ok(IndexStatus {
        state: current.as_str(),
        failure: match current {
            crate::pipeline::PipelineState::Failed(message) => Some(message),
            _ => None,
        },
        manifest,
    })
}

/// GET /api/index - Describe the current index
pub async fn index_info(State(state): State<AppState>) -> Result<Json<IndexStatus>> {
    Ok(Json(status(&state)?))
}

/// POST /api/index/rebuild - Rebuild the index from the corpus
pub async fn rebuild_index(State(state): State<AppState>) -> Result<Json<IndexStatus>> {
    let index = state.pipeline().rebuild_index().await?;
    tracing::info!("Rebuilt index with {} chunks", index.len());
    Ok(Json(status(&state)?))
}
