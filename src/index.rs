//! The project index aggregate and its persisted document shape.
//!
//! An [`Index`] owns its records keyed by [`ProjectKey`], so duplicate keys
//! are unrepresentable. `counts` and `total` are never stored on the value;
//! they are derived from the record set whenever they are read or written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{canonical_cmp, ProjectKey, ProjectKind, ProjectRecord, Source};

/// Record counts by source, then by type. Zero entries are omitted.
pub type Counts = BTreeMap<Source, BTreeMap<ProjectKind, usize>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    generated_at: Option<DateTime<Utc>>,
    projects: BTreeMap<ProjectKey, ProjectRecord>,
}

impl Index {
    /// The index before the first successful merge.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from records. Later records replace earlier ones
    /// sharing a key; the number of replaced records is returned.
    pub fn from_records(
        generated_at: Option<DateTime<Utc>>,
        records: impl IntoIterator<Item = ProjectRecord>,
    ) -> (Self, usize) {
        let mut projects = BTreeMap::new();
        let mut duplicates = 0;
        for record in records {
            if projects.insert(record.key(), record).is_some() {
                duplicates += 1;
            }
        }
        (
            Self {
                generated_at,
                projects,
            },
            duplicates,
        )
    }

    pub(crate) fn from_parts(
        generated_at: Option<DateTime<Utc>>,
        projects: BTreeMap<ProjectKey, ProjectRecord>,
    ) -> Self {
        Self {
            generated_at,
            projects,
        }
    }

    pub(crate) fn into_projects(self) -> BTreeMap<ProjectKey, ProjectRecord> {
        self.projects
    }

    /// Completion time of the merge that produced this index.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, key: &ProjectKey) -> Option<&ProjectRecord> {
        self.projects.get(key)
    }

    pub fn contains_key(&self, key: &ProjectKey) -> bool {
        self.projects.contains_key(key)
    }

    /// All records in canonical order.
    pub fn records(&self) -> Vec<&ProjectRecord> {
        let mut records: Vec<&ProjectRecord> = self.projects.values().collect();
        records.sort_by(|a, b| canonical_cmp(a, b));
        records
    }

    /// Records of one `(source, type)` category in canonical order.
    pub fn records_of(&self, source: Source, kind: ProjectKind) -> Vec<&ProjectRecord> {
        let mut records: Vec<&ProjectRecord> =
            self.of_source(source).filter(|r| r.kind == kind).collect();
        records.sort_by(|a, b| canonical_cmp(a, b));
        records
    }

    /// Number of records belonging to `source`.
    pub fn source_len(&self, source: Source) -> usize {
        self.of_source(source).count()
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::new();
        for record in self.projects.values() {
            *counts
                .entry(record.source)
                .or_default()
                .entry(record.kind)
                .or_default() += 1;
        }
        counts
    }

    pub fn count(&self, source: Source, kind: ProjectKind) -> usize {
        self.of_source(source).filter(|r| r.kind == kind).count()
    }

    /// The persisted document: records in canonical order with freshly
    /// derived counts and total.
    pub fn to_document(&self) -> IndexDocument {
        let counts = self
            .counts()
            .into_iter()
            .map(|(source, kinds)| {
                let kinds = kinds
                    .into_iter()
                    .map(|(kind, n)| (kind.as_str().to_string(), n))
                    .collect();
                (source.as_str().to_string(), kinds)
            })
            .collect();

        IndexDocument {
            generated_at: self.generated_at,
            counts,
            total: self.len(),
            projects: self.records().into_iter().cloned().collect(),
        }
    }

    /// Records of one source, in key order. Keys sort by source first, so
    /// this is a contiguous range of the map.
    fn of_source(&self, source: Source) -> impl Iterator<Item = &ProjectRecord> + '_ {
        self.projects
            .range(ProjectKey::new(source, String::new())..)
            .take_while(move |(key, _)| key.source == source)
            .map(|(_, record)| record)
    }

    /// Rebuild an index from a persisted document. Stored counts are
    /// ignored and recomputed; returns the number of duplicate keys that
    /// were collapsed.
    pub fn from_document(document: IndexDocument) -> (Self, usize) {
        Self::from_records(document.generated_at, document.projects)
    }
}

/// JSON shape of the unified index file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}
