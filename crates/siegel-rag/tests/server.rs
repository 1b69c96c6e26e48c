//! HTTP handler tests against fake providers

mod common;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use common::{FakeEmbedder, FakeLlm, LlmMode, Workspace, GUIDE_ID, POPULATION_QUESTION};
use siegel_rag::interactions::JsonlInteractionLog;
use siegel_rag::server::routes::{ask, index};
use siegel_rag::server::state::AppState;
use siegel_rag::types::AskRequest;

fn state(ws: &Workspace, mode: LlmMode) -> AppState {
    let log = Arc::new(JsonlInteractionLog::open(ws.path().join("logs")).unwrap());
    let pipeline = common::pipeline(
        ws.config(),
        Arc::new(FakeEmbedder::new()),
        Arc::new(FakeLlm::new(mode)),
    )
    .with_sink(log.clone());
    AppState::new(pipeline, Some(log))
}

fn request(question: &str) -> AskRequest {
    AskRequest {
        question: question.to_string(),
        user_id: Some("web-1".to_string()),
        top_k: None,
    }
}

#[tokio::test]
async fn test_ask_endpoint_returns_sources() {
    let ws = Workspace::with_corpus();
    let state = state(&ws, LlmMode::EchoTopChunk);

    let Json(response) = ask::ask(State(state.clone()), Json(request(POPULATION_QUESTION)))
        .await
        .unwrap();

    assert!(response.answer.contains("green spikes"));
    assert_eq!(response.sources[0], GUIDE_ID);
    assert_eq!(response.chunks_retrieved, 3);
    assert_eq!(response.citations.len(), 3);

    let stats = state.interaction_log().unwrap().stats().unwrap();
    assert_eq!(stats.total_interactions, 1);
    assert_eq!(stats.most_active_user.as_deref(), Some("web-1"));
}

#[tokio::test]
async fn test_ask_endpoint_maps_errors_to_status() {
    let ws = Workspace::with_corpus();
    let state = state(&ws, LlmMode::Blank);

    let err = ask::ask(State(state.clone()), Json(request(POPULATION_QUESTION)))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

    let err = ask::ask(State(state), Json(request(" ")))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_endpoints() {
    let ws = Workspace::with_corpus();
    let state = state(&ws, LlmMode::EchoTopChunk);

    let Json(status) = index::index_info(State(state.clone())).await.unwrap();
    assert_eq!(status.state, "uninitialized");
    assert!(status.manifest.is_none());

    let Json(status) = index::rebuild_index(State(state)).await.unwrap();
    assert_eq!(status.state, "ready");
    let manifest = status.manifest.unwrap();
    assert_eq!(manifest.model, FakeEmbedder::MODEL);
    assert_eq!(manifest.chunk_count, 6);
}
