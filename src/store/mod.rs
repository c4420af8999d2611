//! Persistence abstraction for the project index.
//!
//! The [`IndexStore`] trait is the only way the orchestrator reads or writes
//! the index, which lets tests run the full sync against
//! [`memory::InMemoryIndexStore`].
//!
//! Contract for implementations:
//! - `load` returns an empty index when nothing was persisted yet and an
//!   error when persisted data exists but cannot be read.
//! - `save` replaces the persisted index atomically or fails loudly.
//! - `save_categorized` writes every known `(source, type)` category, so the
//!   categorized outputs always sum to the unified index's total.

pub mod json;
pub mod memory;

use serde::Serialize;

use crate::error::StoreError;
use crate::index::Index;
use crate::models::{ProjectKind, ProjectRecord, Source};

pub use json::JsonIndexStore;
pub use memory::InMemoryIndexStore;

/// One written `(source, type)` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOutput {
    pub source: Source,
    pub kind: ProjectKind,
    pub count: usize,
    /// Where the output went (a file path for the JSON store).
    pub location: String,
}

pub trait IndexStore: Send + Sync {
    fn load(&self) -> Result<Index, StoreError>;

    fn save(&self, index: &Index) -> Result<(), StoreError>;

    fn save_categorized(&self, index: &Index) -> Result<Vec<CategoryOutput>, StoreError>;
}

/// Every known `(source, type)` category with its records, in canonical
/// order. Empty categories are included.
pub fn categorize(index: &Index) -> Vec<(Source, ProjectKind, Vec<&ProjectRecord>)> {
    Source::ALL
        .iter()
        .flat_map(|source| {
            source
                .kinds()
                .iter()
                .map(move |kind| (*source, *kind, index.records_of(*source, *kind)))
        })
        .collect()
}

/// File name of a category output, e.g. `github_repositories.json`.
pub fn category_file_name(source: Source, kind: ProjectKind) -> String {
    format!("{}_{}.json", source.slug(), kind.plural())
}
