//! On-disk persistence of the vector index

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::vector_index::{IndexManifest, VectorIndex};
use crate::error::{Error, Result};

const INDEX_FILE: &str = "index.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Index files in one storage directory
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    /// Create a store rooted at `dir`; nothing is created until `save`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Whether a persisted index exists
    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    /// Read and validate the persisted index
    pub fn load(&self) -> Result<VectorIndex> {
        let path = self.index_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::IndexNotFound(self.dir.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let index: VectorIndex = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::index_corrupt(&path, e.to_string()))?;
        index
            .validate()
            .map_err(|message| Error::index_corrupt(&path, message))?;

        tracing::debug!("Loaded {} index entries from {}", index.len(), path.display());
        Ok(index)
    }

    /// Read only the manifest
    pub fn read_manifest(&self) -> Result<IndexManifest> {
        let path = self.manifest_path();
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::IndexNotFound(self.dir.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| Error::index_corrupt(&path, e.to_string()))
    }

    /// Persist the index, then its manifest.
    ///
    /// Each file is written to a temporary file in the same directory and
    /// renamed into place, so readers never see a partial file.
    pub fn save(&self, index: &VectorIndex) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write_atomic(&self.index_path(), index)?;
        self.write_atomic(&self.manifest_path(), index.manifest())?;

        tracing::info!(
            "Persisted index with {} entries to {}",
            index.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Remove persisted files; missing files are fine
    pub fn clear(&self) -> Result<()> {
        for path in [self.manifest_path(), self.index_path()] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write_atomic<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::index::vector_index::{IndexEntry, INDEX_FORMAT_VERSION};
    use crate::types::{Chunk, ChunkSource, SourceType};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_index() -> VectorIndex {
        let source = ChunkSource {
            document_id: "guide.md".into(),
            source_type: SourceType::Guide,
            title: Some("Guide".into()),
            section_title: Some("Population Frame".into()),
        };
        let entries = (0..3)
            .map(|i| IndexEntry {
                chunk: Chunk::new(source.clone(), format!("Größe {}", i), i * 4, i * 4 + 7, i as u32),
                embedding: vec![0.25 * i as f32, 0.1, -0.3],
            })
            .collect();
        VectorIndex::new(
            IndexManifest {
                version: INDEX_FORMAT_VERSION,
                model: "fake".into(),
                dimensions: 3,
                metric: DistanceMetric::Cosine,
                chunk_size: 1000,
                chunk_overlap: 200,
                corpus_fingerprint: "abc".into(),
                document_count: 1,
                chunk_count: 0,
                created_at: Utc::now(),
            },
            entries,
        )
    }

    #[test]
    fn test_save_then_load_is_lossless() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        let index = sample_index();

        store.save(&index).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), index);
        assert_eq!(&store.read_manifest().unwrap(), index.manifest());
    }

    #[test]
    fn test_missing_index_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        assert!(matches!(store.load(), Err(Error::IndexNotFound(_))));
        assert!(matches!(store.read_manifest(), Err(Error::IndexNotFound(_))));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        fs::write(store.index_path(), b"{ not json").unwrap();
        assert!(matches!(store.load(), Err(Error::IndexCorrupt { .. })));
    }

    #[test]
    fn test_invalid_contents_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&sample_index()).unwrap();

        let raw = fs::read_to_string(store.index_path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["manifest"]["dimensions"] = serde_json::json!(5);
        fs::write(store.index_path(), value.to_string()).unwrap();

        assert!(matches!(store.load(), Err(Error::IndexCorrupt { .. })));
    }

    #[test]
    fn test_clear_removes_files() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&sample_index()).unwrap();
        store.clear().unwrap();
        assert!(!store.exists());
        store.clear().unwrap();
    }
}
