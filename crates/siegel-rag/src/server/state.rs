//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::interactions::JsonlInteractionLog;
use crate::pipeline::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: RagPipeline,
    /// Present when interaction logging is enabled
    log: Option<Arc<JsonlInteractionLog>>,
}

impl AppState {
    /// Wrap an already configured pipeline
    pub fn new(pipeline: RagPipeline, log: Option<Arc<JsonlInteractionLog>>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pipeline, log }),
        }
    }

    /// Build providers, pipeline and log from configuration
    pub fn from_config(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing pipeline (embeddings: {:?}/{}, llm: {:?}/{})",
            config.embeddings.provider,
            config.embeddings.model,
            config.llm.provider,
            config.llm.model
        );
        let (pipeline, log) = RagPipeline::from_config(config)?;
        Ok(Self::new(pipeline, log))
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    pub fn config(&self) -> &RagConfig {
        self.inner.pipeline.config()
    }

    pub fn interaction_log(&self) -> Option<&Arc<JsonlInteractionLog>> {
        self.inner.log.as_ref()
    }
}
