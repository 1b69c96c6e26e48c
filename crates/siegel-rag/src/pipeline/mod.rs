//! Pipeline orchestration: lazy index lifecycle and the `ask` entry point

mod orchestrator;

pub use orchestrator::{IndexHandle, PipelineState, RagPipeline};

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::interactions::JsonlInteractionLog;
use crate::providers::{build_embedder, build_llm};

impl RagPipeline {
    /// Build providers and the interaction log from `config`.
    ///
    /// Returns the log handle too, when logging is enabled, so callers can
    /// read statistics from the same files.
    pub fn from_config(config: RagConfig) -> Result<(Self, Option<Arc<JsonlInteractionLog>>)> {
        let embedder = build_embedder(&config.embeddings)?;
        let llm = build_llm(&config.llm)?;

        let log = if config.logging.enabled {
            Some(Arc::new(JsonlInteractionLog::open(&config.logging.log_dir)?))
        } else {
            None
        };

        let mut pipeline = RagPipeline::new(config, embedder, llm)?;
        if let Some(log) = &log {
            pipeline = pipeline.with_sink(log.clone());
        }
        Ok((pipeline, log))
    }
}
