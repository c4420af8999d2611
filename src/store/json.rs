//! JSON file store.
//!
//! Layout:
//!
//! ```text
//! data/
//! ├── project_index.json            unified index
//! └── organized/
//!     ├── github_repositories.json  one array per (source, type)
//!     ├── github_gists.json
//!     ├── huggingface_models.json
//!     ├── huggingface_datasets.json
//!     └── huggingface_spaces.json
//! ```
//!
//! Every file is written to a temporary file in the destination directory,
//! synced, then renamed over the target, so readers never observe a
//! partially written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{categorize, category_file_name, CategoryOutput, IndexStore};
use crate::config::Config;
use crate::error::StoreError;
use crate::index::{Index, IndexDocument};

#[derive(Debug, Clone)]
pub struct JsonIndexStore {
    path: PathBuf,
    organized_dir: PathBuf,
}

impl JsonIndexStore {
    pub fn new(path: impl Into<PathBuf>, organized_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            organized_dir: organized_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index.path.clone(), config.index.organized_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn organized_dir(&self) -> &Path {
        &self.organized_dir
    }
}

impl IndexStore for JsonIndexStore {
    fn load(&self) -> Result<Index, StoreError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no index yet, starting empty");
            return Ok(Index::empty());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|error| StoreError::Read {
            path: self.path.clone(),
            error,
        })?;
        let document: IndexDocument =
            serde_json::from_str(&content).map_err(|error| StoreError::Corrupt {
                path: self.path.clone(),
                error,
            })?;

        let (index, duplicates) = Index::from_document(document);
        if duplicates > 0 {
            tracing::warn!(
                path = %self.path.display(),
                duplicates,
                "index file contained duplicate keys; kept the last of each"
            );
        }
        tracing::info!(path = %self.path.display(), total = index.len(), "loaded index");
        Ok(index)
    }

    fn save(&self, index: &Index) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&index.to_document())?;
        write_atomic(&self.path, json.as_bytes())?;
        tracing::info!(path = %self.path.display(), total = index.len(), "saved index");
        Ok(())
    }

    fn save_categorized(&self, index: &Index) -> Result<Vec<CategoryOutput>, StoreError> {
        let mut outputs = Vec::new();
        for (source, kind, records) in categorize(index) {
            let path = self.organized_dir.join(category_file_name(source, kind));
            let json = serde_json::to_string_pretty(&records)?;
            write_atomic(&path, json.as_bytes())?;
            tracing::debug!(path = %path.display(), count = records.len(), "saved category");

            outputs.push(CategoryOutput {
                source,
                kind,
                count: records.len(),
                location: path.display().to_string(),
            });
        }
        Ok(outputs)
    }
}

/// Replace `path` with `contents` via temp file + rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let io_err = |error| StoreError::Write {
        path: path.to_path_buf(),
        error,
    };

    std::fs::create_dir_all(&parent).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectKind, ProjectRecord, Source};
    use tempfile::TempDir;

    fn sample_index() -> Index {
        let (index, _) = Index::from_records(
            None,
            vec![
                ProjectRecord::new(
                    ProjectKind::Repository,
                    "b",
                    "a/b",
                    "https://github.com/a/b",
                ),
                ProjectRecord::new(
                    ProjectKind::Space,
                    "s",
                    "spaces/a/s",
                    "https://huggingface.co/spaces/a/s",
                ),
            ],
        );
        index
    }

    fn store(tmp: &TempDir) -> JsonIndexStore {
        JsonIndexStore::new(
            tmp.path().join("data/project_index.json"),
            tmp.path().join("data/organized"),
        )
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let index = store(&tmp).load().unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let index = sample_index();
        store.save(&index).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, index);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["total"], 2);
        assert_eq!(raw["counts"]["GitHub"]["Repository"], 1);
        assert_eq!(raw["counts"]["HuggingFace"]["Space"], 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        // The corrupt file is left in place for inspection.
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_categorized_outputs_sum_to_total() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let index = sample_index();

        let outputs = store.save_categorized(&index).unwrap();
        assert_eq!(outputs.len(), 5);
        let sum: usize = outputs.iter().map(|o| o.count).sum();
        assert_eq!(sum, index.len());

        let gists = std::fs::read_to_string(store.organized_dir().join("github_gists.json")).unwrap();
        let gists: Vec<ProjectRecord> = serde_json::from_str(&gists).unwrap();
        assert!(gists.is_empty());

        let repos =
            std::fs::read_to_string(store.organized_dir().join("github_repositories.json")).unwrap();
        let repos: Vec<ProjectRecord> = serde_json::from_str(&repos).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].source, Source::GitHub);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let store = JsonIndexStore::new(blocker.join("index.json"), blocker.join("organized"));

        let err = store.save(&sample_index()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }

    #[test]
    fn test_save_replaces_previous_file() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.save(&sample_index()).unwrap();
        store.save(&Index::empty()).unwrap();
        assert!(store.load().unwrap().is_empty());

        let leftovers: Vec<_> = std::fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "project_index.json")
            .collect();
        assert!(leftovers.is_empty(), "temporary files left behind");
    }
}
