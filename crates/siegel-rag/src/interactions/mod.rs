//! Interaction log: append-only events, statistics and export

mod export;
mod log;
mod stats;

pub use export::ExportFormat;
pub use log::{
    ErrorContext, ErrorEvent, InteractionEvent, InteractionSink, JsonlInteractionLog, NullSink,
};
pub use stats::LogStats;

impl JsonlInteractionLog {
    /// Statistics over everything recorded so far
    pub fn stats(&self) -> crate::error::Result<LogStats> {
        Ok(LogStats::compute(&self.read_interactions()?, &self.read_errors()?))
    }
}
