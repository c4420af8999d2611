//! Typed error kinds for the indexing pipeline.
//!
//! Three failure classes exist and each is recovered at a different level:
//!
//! | Error | Scope | Recovery |
//! |-------|-------|----------|
//! | [`FetchError`] | one provider (or one kind of a provider) | merge skipped, existing records kept |
//! | [`ValidationError`] | one record | record dropped and counted |
//! | [`StoreError`] | the whole run | fatal, surfaced to the caller |

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{ProjectKind, Source};

/// A provider could not return its current set of public records.
///
/// Never conflated with an empty result: a provider that answers
/// successfully with zero records returns `Ok(vec![])`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{provider}: request to {url} failed: {error}")]
    Http {
        provider: Source,
        url: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{provider}: {url} returned HTTP {status}: {body}")]
    Status {
        provider: Source,
        url: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: could not decode response from {url}: {error}")]
    Decode {
        provider: Source,
        url: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("{provider}: {message}")]
    Config { provider: Source, message: String },

    /// The listing hit a cap and may be incomplete, so it cannot be
    /// treated as the full set.
    #[error("{provider}: listing at {url} reached the cap of {limit} items and may be truncated")]
    Truncated {
        provider: Source,
        url: String,
        limit: u32,
    },
}

impl FetchError {
    /// The provider the failed request belonged to.
    pub fn provider(&self) -> Source {
        match self {
            FetchError::Http { provider, .. }
            | FetchError::Status { provider, .. }
            | FetchError::Decode { provider, .. }
            | FetchError::Config { provider, .. }
            | FetchError::Truncated { provider, .. } => *provider,
        }
    }

    /// Whether a later attempt could succeed (network errors, 429, 5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode { .. }
            | FetchError::Config { .. }
            | FetchError::Truncated { .. } => false,
        }
    }
}

/// A single record from an otherwise successful fetch is malformed.
///
/// `id` is the best raw identifier available on the record (its
/// `full_name`, falling back to `name`, then `url`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{provider}: record '{id}' is missing required field `{field}`")]
    MissingField {
        provider: Source,
        id: String,
        field: &'static str,
    },

    #[error("{provider}: record '{id}' has type {kind}, which belongs to {owner}")]
    KindMismatch {
        provider: Source,
        id: String,
        kind: ProjectKind,
        owner: Source,
    },

    #[error("{provider}: record '{id}' was tagged with source {tagged}")]
    SourceMismatch {
        provider: Source,
        id: String,
        tagged: Source,
    },

    #[error("{provider}: record '{id}' has type {kind}, which was not fetched in this batch")]
    OutOfScope {
        provider: Source,
        id: String,
        kind: ProjectKind,
    },
}

/// Reading or writing the persisted index failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {}", .path.display(), .error)]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("index file {} is corrupt: {}", .path.display(), .error)]
    Corrupt {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    #[error("failed to encode index: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {}: {}", .path.display(), .error)]
    Write {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}
