//! Interaction events and the append-only JSON-lines sink

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::AnswerWithSources;

const INTERACTIONS_FILE: &str = "interactions.jsonl";
const ERRORS_FILE: &str = "errors.jsonl";

/// One completed question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub question: String,
    pub answer: String,
    /// Cited document ids
    pub sources: Vec<String>,
    /// Lengths in characters
    pub question_length: usize,
    pub answer_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_similarity: Option<f32>,
    pub latency_ms: u64,
}

impl InteractionEvent {
    /// Event for a successful `ask`
    pub fn from_answer(user_id: &str, question: &str, answer: &AnswerWithSources) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer: answer.answer.clone(),
            sources: answer.sources.clone(),
            question_length: question.chars().count(),
            answer_length: answer.answer.chars().count(),
            top_similarity: answer.top_similarity(),
            latency_ms: answer.processing_time_ms,
        }
    }
}

/// What the pipeline knew when a query failed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorContext {
    pub query: String,
    /// Sources discovered before the failure
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One failed `ask`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEvent {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    /// Machine-readable tag, see `Error::kind`
    pub error_type: String,
    pub error_message: String,
    pub context: ErrorContext,
}

impl ErrorEvent {
    /// Event for a failed `ask`
    pub fn new(user_id: &str, query: &str, error: &Error, sources: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            error_type: error.kind().to_string(),
            error_message: error.to_string(),
            context: ErrorContext {
                query: query.to_string(),
                sources,
            },
        }
    }
}

/// Append-only destination for events
pub trait InteractionSink: Send + Sync {
    /// Record a successful exchange
    fn record_interaction(&self, event: &InteractionEvent) -> Result<()>;

    /// Record a failed exchange
    fn record_error(&self, event: &ErrorEvent) -> Result<()>;
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl InteractionSink for NullSink {
    fn record_interaction(&self, _event: &InteractionEvent) -> Result<()> {
        Ok(())
    }

    fn record_error(&self, _event: &ErrorEvent) -> Result<()> {
        Ok(())
    }
}

/// JSON-lines files in one log directory
pub struct JsonlInteractionLog {
    dir: PathBuf,
    /// Serializes appends from concurrent queries
    write_lock: Mutex<()>,
}

impl JsonlInteractionLog {
    /// Open (and create) the log directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn interactions_path(&self) -> PathBuf {
        self.dir.join(INTERACTIONS_FILE)
    }

    pub fn errors_path(&self) -> PathBuf {
        self.dir.join(ERRORS_FILE)
    }

    /// All recorded interactions, oldest first
    pub fn read_interactions(&self) -> Result<Vec<InteractionEvent>> {
        read_jsonl(&self.interactions_path())
    }

    /// All recorded errors, oldest first
    pub fn read_errors(&self) -> Result<Vec<ErrorEvent>> {
        read_jsonl(&self.errors_path())
    }

    fn append<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut line = serde_json::to_string(value)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl InteractionSink for JsonlInteractionLog {
    fn record_interaction(&self, event: &InteractionEvent) -> Result<()> {
        self.append(&self.interactions_path(), event)
    }

    fn record_error(&self, event: &ErrorEvent) -> Result<()> {
        self.append(&self.errors_path(), event)
    }
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(item) => items.push(item),
            Err(e) => tracing::warn!(
                "Skipping malformed line {} in {}: {}",
                line_no + 1,
                path.display(),
                e
            ),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn interaction(user: &str, question: &str, answer: &str) -> InteractionEvent {
        InteractionEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: user.into(),
            question: question.into(),
            answer: answer.into(),
            sources: vec!["information/guide.md".into()],
            question_length: question.chars().count(),
            answer_length: answer.chars().count(),
            top_similarity: Some(0.8),
            latency_ms: 12,
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log = JsonlInteractionLog::open(dir.path().join("logs")).unwrap();

        let first = interaction("u1", "Welche Farbe hat der Rahmen?", "Grün.");
        let second = interaction("u2", "Was ist ein Siegel?", "Ein Stadtsymbol.");
        log.record_interaction(&first).unwrap();
        log.record_interaction(&second).unwrap();
        log.record_error(&ErrorEvent::new(
            "u1",
            "q",
            &Error::GenerationFailed("empty".into()),
            vec!["a.md".into()],
        ))
        .unwrap();

        assert_eq!(log.read_interactions().unwrap(), vec![first, second]);
        let errors = log.read_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "generation_failed");
        assert_eq!(errors[0].context.sources, vec!["a.md"]);

        let raw = fs::read_to_string(log.interactions_path()).unwrap();
        assert!(raw.contains("Grün"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let log = JsonlInteractionLog::open(dir.path()).unwrap();
        log.record_interaction(&interaction("u", "q", "a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.interactions_path()).unwrap();
        file.write_all(b"not json\n\n").unwrap();
        log.record_interaction(&interaction("u", "q2", "a2")).unwrap();

        assert_eq!(log.read_interactions().unwrap().len(), 2);
        assert!(log.read_errors().unwrap().is_empty());
    }
}
