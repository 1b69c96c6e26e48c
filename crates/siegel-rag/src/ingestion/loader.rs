//! Corpus loading: text documents, image assets and synthetic asset catalogs

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{Error, Result};
use crate::types::document::{first_heading, sha256_hex};
use crate::types::{AssetRecord, Document, SourceType};

/// A file that was found but not loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Corpus-relative path
    pub path: String,
    /// Why it was skipped
    pub reason: String,
}

/// Everything read from one corpus directory
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Corpus root as given
    pub root: PathBuf,
    /// Text documents sorted by id, followed by asset catalogs
    pub documents: Vec<Document>,
    /// Non-text assets sorted by id
    pub assets: Vec<AssetRecord>,
    /// Files that were not loaded
    pub skipped: Vec<SkippedFile>,
}

impl Corpus {
    /// SHA-256 over the sorted document ids and their content hashes
    pub fn fingerprint(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = self
            .documents
            .iter()
            .map(|d| (d.id.as_str(), d.content_hash.as_str()))
            .collect();
        pairs.sort_unstable();

        let mut buf = String::new();
        for (id, hash) in pairs {
            buf.push_str(id);
            buf.push('\0');
            buf.push_str(hash);
            buf.push('\n');
        }
        sha256_hex(buf.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Reads a corpus directory tree into documents
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    config: CorpusConfig,
}

impl DocumentLoader {
    /// Create a loader
    pub fn new(config: CorpusConfig) -> Self {
        Self { config }
    }

    /// Load the configured corpus root
    pub fn load_configured(&self) -> Result<Corpus> {
        self.load(&self.config.root)
    }

    /// Load every readable document under `root`.
    ///
    /// Fails only when the root itself is missing; unreadable files are
    /// skipped with a warning.
    pub fn load(&self, root: &Path) -> Result<Corpus> {
        if !root.is_dir() {
            return Err(Error::CorpusNotFound(root.to_path_buf()));
        }

        let mut corpus = Corpus {
            root: root.to_path_buf(),
            ..Default::default()
        };

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable corpus entry: {}", e);
                    let path = e
                        .path()
                        .map(|p| relative_id(root, p))
                        .unwrap_or_default();
                    corpus.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let id = relative_id(root, path);
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let source_type = SourceType::classify(relative);

            if self.config.text_extensions.iter().any(|e| *e == ext) {
                match std::fs::read_to_string(path) {
                    Ok(raw) => corpus.documents.push(self.make_document(id, path, source_type, raw)),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", id, e);
                        corpus.skipped.push(SkippedFile {
                            path: id,
                            reason: e.to_string(),
                        });
                    }
                }
            } else if self.config.asset_extensions.iter().any(|e| *e == ext) {
                let directory = relative
                    .parent()
                    .map(path_to_id)
                    .unwrap_or_default();
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                corpus.assets.push(AssetRecord {
                    id,
                    directory,
                    stem,
                    extension: ext,
                    source_type,
                });
            } else {
                tracing::debug!("Ignoring {} (unsupported file type)", id);
                corpus.skipped.push(SkippedFile {
                    path: id,
                    reason: "unsupported file type".to_string(),
                });
            }
        }

        if self.config.asset_catalogs {
            let catalogs = asset_catalogs(root, &corpus.assets);
            corpus.documents.extend(catalogs);
        }

        tracing::info!(
            "Loaded corpus {}: {} documents, {} assets, {} skipped",
            root.display(),
            corpus.documents.len(),
            corpus.assets.len(),
            corpus.skipped.len()
        );

        Ok(corpus)
    }

    fn make_document(&self, id: String, path: &Path, source_type: SourceType, raw: String) -> Document {
        if !self.config.clean_text {
            return Document::new(id, path.to_path_buf(), source_type, raw);
        }

        // Headings do not survive cleaning, so take the title from the raw text
        let title = first_heading(&raw);
        let mut doc = Document::new(id, path.to_path_buf(), source_type, clean_text(&raw));
        doc.title = title;
        doc
    }
}

/// Normalise text before embedding.
///
/// Collapses whitespace, replaces symbols outside the word and common
/// punctuation classes with a space, and squeezes repeated punctuation.
pub fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static SYMBOLS: OnceLock<Regex> = OnceLock::new();
    static PUNCT_RUNS: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let symbols = SYMBOLS.get_or_init(|| Regex::new(r#"[^\w\s\-.,!?;:()\[\]{}"]"#).expect("valid regex"));
    let punct_runs = PUNCT_RUNS.get_or_init(|| Regex::new(r"[.,!?;:]+").expect("valid regex"));

    let text = whitespace.replace_all(text, " ");
    let text = symbols.replace_all(&text, " ");
    let text = punct_runs.replace_all(&text, |caps: &regex::Captures| {
        caps[0].chars().next().map(String::from).unwrap_or_default()
    });

    text.trim().to_string()
}

/// One synthetic document per directory that holds assets
fn asset_catalogs(root: &Path, assets: &[AssetRecord]) -> Vec<Document> {
    let mut by_dir: BTreeMap<&str, Vec<&AssetRecord>> = BTreeMap::new();
    for asset in assets {
        by_dir.entry(asset.directory.as_str()).or_default().push(asset);
    }

    by_dir
        .into_iter()
        .map(|(dir, entries)| {
            let name = dir.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("assets");
            let source_type = entries[0].source_type;
            let text = catalog_text(name, source_type, &entries);
            let id = if dir.is_empty() { "./".to_string() } else { format!("{}/", dir) };
            Document::new(id, root.join(dir), source_type, text)
        })
        .collect()
}

fn catalog_text(name: &str, source_type: SourceType, entries: &[&AssetRecord]) -> String {
    let mut text = String::new();
    match source_type {
        SourceType::Component => {
            text.push_str(&format!("Component Type: {}\n", name));
            text.push_str(&format!("Available components in {}:\n", name));
            for asset in entries {
                text.push_str(&format!("- {}\n", asset.stem));
            }
        }
        SourceType::Example => {
            text.push_str("Complete Sigil Examples:\n");
            for asset in entries {
                let city = asset.stem.replace("_sigil", "");
                text.push_str(&format!("- {}: Complete sigil available\n", city));
            }
        }
        SourceType::Guide => {
            text.push_str(&format!("Images in {}:\n", name));
            for asset in entries {
                text.push_str(&format!("- {}\n", asset.stem));
            }
        }
    }
    text
}

fn relative_id(root: &Path, path: &Path) -> String {
    path_to_id(path.strip_prefix(root).unwrap_or(path))
}

/// Forward-slash path string
fn path_to_id(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
