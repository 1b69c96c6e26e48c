//! Question answering endpoint

use axum::{extract::State, Json};

use crate::error::QueryError;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse};

/// POST /api/ask - Answer a question with sources
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, QueryError> {
    let user = request.user();
    tracing::info!("Question from {}: \"{}\"", user, request.question);

    let answer = state
        .pipeline()
        .ask_with(user, &request.question, request.top_k)
        .await?;

    tracing::info!(
        "Answered in {}ms with {} source(s)",
        answer.processing_time_ms,
        answer.sources.len()
    );
    Ok(Json(AskResponse::from(&answer)))
}
