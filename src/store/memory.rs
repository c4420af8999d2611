//! In-memory [`IndexStore`] for tests.
//!
//! The index is kept as its serialized JSON document so that a save/load
//! cycle exercises the same encoding as the file store.

use std::sync::RwLock;

use super::{categorize, CategoryOutput, IndexStore};
use crate::error::StoreError;
use crate::index::{Index, IndexDocument};

#[derive(Default)]
pub struct InMemoryIndexStore {
    document: RwLock<Option<String>>,
    categorized: RwLock<Vec<CategoryOutput>>,
    saves: RwLock<usize>,
    fail_writes: bool,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose persisted state is `index`.
    pub fn with_index(index: &Index) -> Self {
        let store = Self::new();
        *store.document.write().unwrap() =
            Some(serde_json::to_string(&index.to_document()).unwrap());
        store
    }

    /// A store whose writes always fail.
    pub fn failing_writes(index: &Index) -> Self {
        let mut store = Self::with_index(index);
        store.fail_writes = true;
        store
    }

    /// The persisted index, if any.
    pub fn persisted(&self) -> Option<Index> {
        let doc = self.document.read().unwrap();
        doc.as_deref()
            .and_then(|json| serde_json::from_str::<IndexDocument>(json).ok())
            .map(|d| Index::from_document(d).0)
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.read().unwrap()
    }

    pub fn categorized(&self) -> Vec<CategoryOutput> {
        self.categorized.read().unwrap().clone()
    }

    fn write_error(&self) -> StoreError {
        StoreError::Write {
            path: "memory://index".into(),
            error: std::io::Error::new(std::io::ErrorKind::Other, "writes disabled"),
        }
    }
}

impl IndexStore for InMemoryIndexStore {
    fn load(&self) -> Result<Index, StoreError> {
        let doc = self.document.read().unwrap();
        match doc.as_deref() {
            None => Ok(Index::empty()),
            Some(json) => {
                let document: IndexDocument =
                    serde_json::from_str(json).map_err(|error| StoreError::Corrupt {
                        path: "memory://index".into(),
                        error,
                    })?;
                Ok(Index::from_document(document).0)
            }
        }
    }

    fn save(&self, index: &Index) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(self.write_error());
        }
        let json = serde_json::to_string(&index.to_document())?;
        *self.document.write().unwrap() = Some(json);
        *self.saves.write().unwrap() += 1;
        Ok(())
    }

    fn save_categorized(&self, index: &Index) -> Result<Vec<CategoryOutput>, StoreError> {
        if self.fail_writes {
            return Err(self.write_error());
        }
        let outputs: Vec<CategoryOutput> = categorize(index)
            .into_iter()
            .map(|(source, kind, records)| CategoryOutput {
                source,
                kind,
                count: records.len(),
                location: format!("memory://{}", super::category_file_name(source, kind)),
            })
            .collect();
        *self.categorized.write().unwrap() = outputs.clone();
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectKind, ProjectRecord};

    #[test]
    fn test_round_trip_and_failing_writes() {
        let (index, _) = Index::from_records(
            None,
            vec![ProjectRecord::new(
                ProjectKind::Gist,
                "1",
                "a/gist:1",
                "https://gist.github.com/1",
            )],
        );

        let store = InMemoryIndexStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&index).unwrap();
        assert_eq!(store.load().unwrap(), index);
        assert_eq!(store.save_count(), 1);

        let failing = InMemoryIndexStore::failing_writes(&index);
        assert!(failing.save(&Index::empty()).is_err());
        assert_eq!(failing.persisted(), Some(index));
    }

    #[test]
    fn test_seeded_store_loads_its_index() {
        let (index, _) = Index::from_records(
            None,
            vec![ProjectRecord::new(
                ProjectKind::Model,
                "m",
                "a/m",
                "https://huggingface.co/a/m",
            )],
        );
        let store = InMemoryIndexStore::with_index(&index);
        assert_eq!(store.load().unwrap(), index);
        assert_eq!(store.save_count(), 0);
    }
}
