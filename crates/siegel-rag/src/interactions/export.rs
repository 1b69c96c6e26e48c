//! CSV and JSON export of the interaction log

use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::log::{ErrorEvent, InteractionEvent, JsonlInteractionLog};
use crate::error::Result;

/// Output format for `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Flat CSV row for an interaction
#[derive(Serialize)]
struct InteractionRow<'a> {
    id: String,
    timestamp: String,
    user_id: &'a str,
    question: &'a str,
    answer: &'a str,
    sources: String,
    question_length: usize,
    answer_length: usize,
    top_similarity: Option<f32>,
    latency_ms: u64,
}

impl<'a> From<&'a InteractionEvent> for InteractionRow<'a> {
    fn from(e: &'a InteractionEvent) -> Self {
        Self {
            id: e.id.to_string(),
            timestamp: e.timestamp.to_rfc3339(),
            user_id: &e.user_id,
            question: &e.question,
            answer: &e.answer,
            sources: e.sources.join("; "),
            question_length: e.question_length,
            answer_length: e.answer_length,
            top_similarity: e.top_similarity,
            latency_ms: e.latency_ms,
        }
    }
}

/// Flat CSV row for an error
#[derive(Serialize)]
struct ErrorRow<'a> {
    timestamp: String,
    user_id: &'a str,
    error_type: &'a str,
    error_message: &'a str,
    query: &'a str,
    sources: String,
}

impl<'a> From<&'a ErrorEvent> for ErrorRow<'a> {
    fn from(e: &'a ErrorEvent) -> Self {
        Self {
            timestamp: e.timestamp.to_rfc3339(),
            user_id: &e.user_id,
            error_type: &e.error_type,
            error_message: &e.error_message,
            query: &e.context.query,
            sources: e.context.sources.join("; "),
        }
    }
}

impl JsonlInteractionLog {
    /// Write `interactions_<stamp>` and `errors_<stamp>` files into `out_dir`.
    ///
    /// Empty logs produce no file. Returns the written paths.
    pub fn export(&self, format: ExportFormat, out_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let ext = format.extension();
        let mut written = Vec::new();

        let interactions = self.read_interactions()?;
        if !interactions.is_empty() {
            let path = out_dir.join(format!("interactions_{}.{}", stamp, ext));
            match format {
                ExportFormat::Csv => {
                    write_csv(&path, interactions.iter().map(InteractionRow::from))?
                }
                ExportFormat::Json => write_json(&path, &interactions)?,
            }
            written.push(path);
        }

        let errors = self.read_errors()?;
        if !errors.is_empty() {
            let path = out_dir.join(format!("errors_{}.{}", stamp, ext));
            match format {
                ExportFormat::Csv => write_csv(&path, errors.iter().map(ErrorRow::from))?,
                ExportFormat::Json => write_json(&path, &errors)?,
            }
            written.push(path);
        }

        tracing::info!("Exported {} log file(s) to {}", written.len(), out_dir.display());
        Ok(written)
    }

    /// Shorthand for `export(ExportFormat::Csv, ..)`
    pub fn export_csv(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.export(ExportFormat::Csv, out_dir)
    }

    /// Shorthand for `export(ExportFormat::Json, ..)`
    pub fn export_json(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.export(ExportFormat::Json, out_dir)
    }
}

fn write_csv<R: Serialize>(path: &Path, rows: impl Iterator<Item = R>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}
