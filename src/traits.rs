//! Provider extension trait and registry.
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │         ProviderRegistry         │
//! │  ┌──────────┐  ┌──────────────┐  │
//! │  │  GitHub  │  │ Hugging Face │  │   + custom (Rust)
//! │  └──────────┘  └──────────────┘  │
//! └───────────────┬──────────────────┘
//!                 ▼
//!        run_sync() → merge → store
//! ```
//!
//! Implement [`Provider`] to index another catalog. A provider only has to
//! implement [`fetch_kind`](Provider::fetch_kind); the provided
//! [`fetch_all`](Provider::fetch_all) assembles the batch and tracks which
//! kinds were fetched successfully.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{ProjectKind, ProjectRecord, Source};

/// One kind of a provider that could not be fetched.
#[derive(Debug)]
pub struct KindFailure {
    pub kind: ProjectKind,
    pub error: FetchError,
}

/// The raw result of fetching a provider.
///
/// `scope` holds the kinds that were fetched successfully; `records` is
/// the complete public listing for exactly those kinds. Kinds that failed
/// are in `failures` and must not be treated as empty.
#[derive(Debug)]
pub struct FetchedBatch {
    pub source: Source,
    pub scope: BTreeSet<ProjectKind>,
    pub records: Vec<ProjectRecord>,
    pub failures: Vec<KindFailure>,
}

/// Request quota reported by a provider API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: Option<DateTime<Utc>>,
}

/// A remote catalog that lists a person's public artifacts.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use project_index::error::FetchError;
/// use project_index::models::{ProjectKind, ProjectRecord, Source};
/// use project_index::traits::Provider;
///
/// struct Fixed;
///
/// #[async_trait]
/// impl Provider for Fixed {
///     fn source(&self) -> Source { Source::GitHub }
///     fn description(&self) -> &str { "Fixed listing" }
///     fn kinds(&self) -> Vec<ProjectKind> { vec![ProjectKind::Repository] }
///
///     async fn fetch_kind(&self, kind: ProjectKind) -> Result<Vec<ProjectRecord>, FetchError> {
///         Ok(vec![ProjectRecord::new(kind, "b", "a/b", "https://github.com/a/b")])
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    fn source(&self) -> Source;

    /// Name used for CLI selection. Defaults to the source slug.
    fn name(&self) -> &str {
        self.source().slug()
    }

    /// One-line description for `pidx sources`.
    fn description(&self) -> &str;

    /// Kinds this provider instance is configured to fetch.
    fn kinds(&self) -> Vec<ProjectKind>;

    /// Fetch every public record of one kind. Must filter out private
    /// records and must return `Err` rather than an empty list on failure.
    async fn fetch_kind(&self, kind: ProjectKind) -> Result<Vec<ProjectRecord>, FetchError>;

    /// Current request quota, for providers whose API reports one.
    async fn rate_limit(&self) -> Result<Option<RateLimit>, FetchError> {
        Ok(None)
    }

    /// Fetch the requested kinds (restricted to [`kinds`](Provider::kinds)).
    ///
    /// Fails only when every requested kind failed; partial failures are
    /// reported in [`FetchedBatch::failures`].
    async fn fetch_all(&self, kinds: &[ProjectKind]) -> Result<FetchedBatch, FetchError> {
        let enabled = self.kinds();
        let mut batch = FetchedBatch {
            source: self.source(),
            scope: BTreeSet::new(),
            records: Vec::new(),
            failures: Vec::new(),
        };

        for kind in kinds.iter().copied().filter(|k| enabled.contains(k)) {
            match self.fetch_kind(kind).await {
                Ok(records) => {
                    tracing::info!(
                        provider = %batch.source,
                        kind = %kind,
                        count = records.len(),
                        "fetched"
                    );
                    batch.scope.insert(kind);
                    batch.records.extend(records);
                }
                Err(error) => {
                    tracing::warn!(
                        provider = %batch.source,
                        kind = %kind,
                        "fetch failed, keeping existing records: {}",
                        error
                    );
                    batch.failures.push(KindFailure { kind, error });
                }
            }
        }

        if batch.scope.is_empty() && !batch.failures.is_empty() {
            return Err(batch.failures.remove(0).error);
        }
        Ok(batch)
    }
}

/// Registry of providers, processed in registration order.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with every provider configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        use crate::provider_github::GitHubProvider;
        use crate::provider_huggingface::HuggingFaceProvider;

        let mut registry = Self::new();
        if let Some(gh) = &config.providers.github {
            registry.register(Box::new(GitHubProvider::new(gh.clone(), &config.http)?));
        }
        if let Some(hf) = &config.providers.huggingface {
            registry.register(Box::new(HuggingFaceProvider::new(
                hf.clone(),
                &config.http,
            )?));
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: Box<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Box<dyn Provider>] {
        &self.providers
    }

    /// Resolve a CLI selector: `all` or a provider name.
    pub fn select(&self, selector: &str) -> Result<Vec<&dyn Provider>> {
        if selector == "all" {
            return Ok(self.providers.iter().map(|p| p.as_ref()).collect());
        }

        let selected: Vec<&dyn Provider> = match selector.parse::<Source>() {
            Ok(source) => self
                .providers
                .iter()
                .filter(|p| p.source() == source)
                .map(|p| p.as_ref())
                .collect(),
            Err(_) => self
                .providers
                .iter()
                .filter(|p| p.name() == selector)
                .map(|p| p.as_ref())
                .collect(),
        };

        if selected.is_empty() {
            let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
            bail!(
                "No configured provider matches '{}'. Configured: {}",
                selector,
                if names.is_empty() {
                    "none".to_string()
                } else {
                    names.join(", ")
                }
            );
        }
        Ok(selected)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}
