//! Incremental merge of one provider batch into the index.
//!
//! A batch is the complete set of currently-public records a provider
//! returned for the kinds it fetched successfully (its *scope*). For
//! `(batch source, kind in scope)` the batch is authoritative: records
//! absent from it are removed. Everything else in the index is carried
//! over untouched.
//!
//! ```text
//! existing ──┬─ other sources ─────────────────────────────┐
//!            └─ batch source ─┬─ kind out of scope ────────┤
//!                             └─ kind in scope ─┐          ├──▶ merged
//! incoming ── collapse by key (last wins) ──────┴─ replace ┘
//!                                                 (absent → removed)
//! ```
//!
//! The merge is pure computation over already-fetched data.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ValidationError;
use crate::index::Index;
use crate::models::{ProjectKey, ProjectKind, ProjectRecord, Source};

/// A provider batch whose records have all been validated against its
/// source and scope. The only input type [`merge`] accepts.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    source: Source,
    scope: BTreeSet<ProjectKind>,
    records: Vec<ProjectRecord>,
}

impl ValidatedBatch {
    /// Validate `records` fetched from `source` for the kinds in `scope`.
    ///
    /// Invalid records are dropped and returned alongside the batch.
    /// Kinds in `scope` that do not belong to `source` are ignored.
    pub fn new(
        source: Source,
        scope: impl IntoIterator<Item = ProjectKind>,
        records: Vec<ProjectRecord>,
    ) -> (Self, Vec<ValidationError>) {
        let scope: BTreeSet<ProjectKind> = scope
            .into_iter()
            .filter(|kind| kind.source() == source)
            .collect();

        let mut accepted = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for record in records {
            match check(source, &scope, &record) {
                Ok(()) => accepted.push(record),
                Err(err) => rejected.push(err),
            }
        }

        (
            Self {
                source,
                scope,
                records: accepted,
            },
            rejected,
        )
    }

    /// A batch authoritative for every kind of `source`.
    pub fn complete(source: Source, records: Vec<ProjectRecord>) -> (Self, Vec<ValidationError>) {
        Self::new(source, source.kinds().iter().copied(), records)
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn scope(&self) -> &BTreeSet<ProjectKind> {
        &self.scope
    }

    pub fn records(&self) -> &[ProjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn check(
    source: Source,
    scope: &BTreeSet<ProjectKind>,
    record: &ProjectRecord,
) -> Result<(), ValidationError> {
    if record.source != source {
        return Err(ValidationError::SourceMismatch {
            provider: source,
            id: record.raw_id().to_string(),
            tagged: record.source,
        });
    }
    record.validate()?;
    if !scope.contains(&record.kind) {
        return Err(ValidationError::OutOfScope {
            provider: source,
            id: record.raw_id().to_string(),
            kind: record.kind,
        });
    }
    Ok(())
}

/// Outcome of merging one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Incoming records that shared a key with a later record in the same
    /// batch and were discarded.
    pub duplicates: usize,
    /// Index size after the merge.
    pub total: usize,
}

impl MergeStats {
    /// Whether the merge changed the record set.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.updated > 0 || self.removed > 0
    }
}

/// Merge `batch` into `existing`, stamping the result with the current time.
pub fn merge(existing: Index, batch: ValidatedBatch) -> (Index, MergeStats) {
    merge_at(existing, batch, Utc::now())
}

/// Merge `batch` into `existing` and stamp the result with `completed_at`.
pub fn merge_at(
    existing: Index,
    batch: ValidatedBatch,
    completed_at: DateTime<Utc>,
) -> (Index, MergeStats) {
    let ValidatedBatch {
        source,
        scope,
        records,
    } = batch;
    let mut stats = MergeStats::default();

    let (mut merged, mut owned): (
        BTreeMap<ProjectKey, ProjectRecord>,
        BTreeMap<ProjectKey, ProjectRecord>,
    ) = existing
        .into_projects()
        .into_iter()
        .partition(|(key, _)| key.source != source);

    let mut incoming: BTreeMap<ProjectKey, ProjectRecord> = BTreeMap::new();
    for record in records {
        if incoming.insert(record.key(), record).is_some() {
            stats.duplicates += 1;
        }
    }

    for (key, record) in incoming {
        match owned.remove(&key) {
            Some(previous) if previous == record => stats.unchanged += 1,
            Some(_) => stats.updated += 1,
            None => stats.added += 1,
        }
        merged.insert(key, record);
    }

    for (key, record) in owned {
        if scope.contains(&record.kind) {
            tracing::debug!(key = %key, "removed: no longer in provider listing");
            stats.removed += 1;
        } else {
            merged.insert(key, record);
        }
    }

    stats.total = merged.len();
    (Index::from_parts(Some(completed_at), merged), stats)
}
