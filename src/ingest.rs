//! Sync orchestration.
//!
//! Coordinates the full flow: load index → fetch per provider → validate →
//! merge → persist once → report. Providers run one at a time; the index is
//! an owned value threaded from one merge into the next, and nothing is
//! written until every selected provider has been processed.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::error::ValidationError;
use crate::index::Index;
use crate::merge::{merge, MergeStats, ValidatedBatch};
use crate::models::ProjectKind;
use crate::store::{CategoryOutput, IndexStore, JsonIndexStore};
use crate::traits::{Provider, ProviderRegistry, RateLimit};

/// What to sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// `all`, a source (`github`, `hf`) or a provider name.
    pub selector: String,
    /// Restrict the run to these kinds. Empty means every enabled kind.
    pub kinds: Vec<ProjectKind>,
    /// Fetch and merge without writing anything.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            selector: "all".to_string(),
            kinds: Vec::new(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderOutcome {
    /// The batch was merged. `failed_kinds` were not fetched and their
    /// records were left as they were.
    Merged {
        stats: MergeStats,
        scope: Vec<ProjectKind>,
        rejected: usize,
        failed_kinds: Vec<(ProjectKind, String)>,
    },
    /// Nothing could be fetched; the provider's records were left as they were.
    Failed { error: String },
    /// None of the requested kinds are enabled for this provider.
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct ProviderReport {
    pub provider: String,
    pub outcome: ProviderOutcome,
    /// Quota left after the fetch, when the provider reports one.
    pub rate_limit: Option<RateLimit>,
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub providers: Vec<ProviderReport>,
    pub total: usize,
    pub dry_run: bool,
    /// Whether the index was written.
    pub persisted: bool,
    pub categorized: Vec<CategoryOutput>,
    #[serde(skip)]
    pub index: Index,
}

impl SyncReport {
    /// True when any provider, or any kind of a provider, failed to fetch.
    pub fn is_degraded(&self) -> bool {
        self.providers.iter().any(|p| match &p.outcome {
            ProviderOutcome::Failed { .. } => true,
            ProviderOutcome::Merged { failed_kinds, .. } => !failed_kinds.is_empty(),
            ProviderOutcome::Skipped => false,
        })
    }

    /// Number of batches merged in this run.
    pub fn merged(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| matches!(p.outcome, ProviderOutcome::Merged { .. }))
            .count()
    }
}

/// Sync the providers configured in `config` into the JSON index and print
/// a summary.
pub async fn run_sync(config: &Config, options: &SyncOptions) -> Result<SyncReport> {
    let registry = ProviderRegistry::from_config(config)?;
    let store = JsonIndexStore::from_config(config);

    let report = run_sync_with(&registry, &store, options).await?;
    print_report(&report, store.path().display().to_string());
    Ok(report)
}

/// Sync against an explicit registry and store.
///
/// Returns `Err` only when the selector matches nothing, the prior index
/// cannot be loaded, or persisting fails. Fetch failures are reported in
/// the [`SyncReport`].
pub async fn run_sync_with(
    registry: &ProviderRegistry,
    store: &dyn IndexStore,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let providers = registry.select(&options.selector)?;
    let mut index = store.load().context("failed to load the project index")?;
    let before = index.len();

    let mut reports = Vec::with_capacity(providers.len());
    for provider in providers {
        let (next, outcome) = sync_provider(provider, index, &options.kinds).await;
        index = next;
        let rate_limit = match outcome {
            ProviderOutcome::Skipped => None,
            _ => check_rate_limit(provider).await,
        };
        reports.push(ProviderReport {
            provider: provider.name().to_string(),
            outcome,
            rate_limit,
        });
    }

    let mut report = SyncReport {
        providers: reports,
        total: index.len(),
        dry_run: options.dry_run,
        persisted: false,
        categorized: Vec::new(),
        index,
    };

    if options.dry_run {
        tracing::info!(before, after = report.total, "dry run, nothing written");
        return Ok(report);
    }
    if report.merged() == 0 {
        tracing::warn!("no provider batch was merged, leaving the index untouched");
        return Ok(report);
    }

    store
        .save(&report.index)
        .context("failed to save the project index")?;
    report.categorized = store
        .save_categorized(&report.index)
        .context("failed to save categorized outputs")?;
    report.persisted = true;

    Ok(report)
}

/// Fetch, validate and merge one provider. The index comes back unchanged
/// when the fetch fails.
async fn sync_provider(
    provider: &dyn Provider,
    index: Index,
    requested: &[ProjectKind],
) -> (Index, ProviderOutcome) {
    let source = provider.source();
    let kinds: Vec<ProjectKind> = if requested.is_empty() {
        provider.kinds()
    } else {
        let enabled = provider.kinds();
        requested
            .iter()
            .copied()
            .filter(|k| enabled.contains(k))
            .collect()
    };

    if kinds.is_empty() {
        tracing::info!(provider = provider.name(), "no requested kinds enabled, skipping");
        return (index, ProviderOutcome::Skipped);
    }

    let fetched = match provider.fetch_all(&kinds).await {
        Ok(fetched) => fetched,
        Err(error) => {
            tracing::warn!(
                provider = provider.name(),
                "fetch failed, keeping existing records: {}",
                error
            );
            return (
                index,
                ProviderOutcome::Failed {
                    error: error.to_string(),
                },
            );
        }
    };

    let failed_kinds: Vec<(ProjectKind, String)> = fetched
        .failures
        .iter()
        .map(|f| (f.kind, f.error.to_string()))
        .collect();

    let (batch, rejected) = ValidatedBatch::new(source, fetched.scope, fetched.records);
    log_rejected(provider.name(), &rejected);

    let scope: Vec<ProjectKind> = batch.scope().iter().copied().collect();
    let (index, stats) = merge(index, batch);
    tracing::info!(
        provider = provider.name(),
        added = stats.added,
        updated = stats.updated,
        unchanged = stats.unchanged,
        removed = stats.removed,
        total = stats.total,
        "merged"
    );

    (
        index,
        ProviderOutcome::Merged {
            stats,
            scope,
            rejected: rejected.len(),
            failed_kinds,
        },
    )
}

/// Log the provider's remaining quota. Failing to read it never fails the run.
async fn check_rate_limit(provider: &dyn Provider) -> Option<RateLimit> {
    match provider.rate_limit().await {
        Ok(Some(rate)) => {
            tracing::info!(
                provider = provider.name(),
                remaining = rate.remaining,
                limit = rate.limit,
                "API rate limit"
            );
            Some(rate)
        }
        Ok(None) => None,
        Err(error) => {
            tracing::warn!(provider = provider.name(), "could not check rate limit: {}", error);
            None
        }
    }
}

fn log_rejected(provider: &str, rejected: &[ValidationError]) {
    for err in rejected {
        tracing::warn!(provider, "dropping invalid record: {}", err);
    }
}

fn print_report(report: &SyncReport, location: String) {
    for p in &report.providers {
        match &p.outcome {
            ProviderOutcome::Merged {
                stats,
                scope,
                rejected,
                failed_kinds,
            } => {
                let scope: Vec<&str> = scope.iter().map(|k| k.plural()).collect();
                println!("sync {} ({})", p.provider, scope.join(", "));
                println!("  added: {}", stats.added);
                println!("  updated: {}", stats.updated);
                println!("  unchanged: {}", stats.unchanged);
                println!("  removed: {}", stats.removed);
                if stats.duplicates > 0 {
                    println!("  duplicates dropped: {}", stats.duplicates);
                }
                if *rejected > 0 {
                    println!("  invalid records dropped: {}", rejected);
                }
                for (kind, error) in failed_kinds {
                    println!("  FAILED {}: {} (existing records kept)", kind.plural(), error);
                }
            }
            ProviderOutcome::Failed { error } => {
                println!("sync {}", p.provider);
                println!("  FAILED: {} (existing records kept)", error);
            }
            ProviderOutcome::Skipped => {
                println!("sync {}", p.provider);
                println!("  skipped: no requested kinds enabled");
            }
        }
        if let Some(rate) = &p.rate_limit {
            println!("  rate limit remaining: {}/{}", rate.remaining, rate.limit);
        }
    }

    println!();
    println!("  total projects: {}", report.total);
    if report.dry_run {
        println!("  dry run: index not written");
    } else if report.persisted {
        println!("  index: {}", location);
        for output in &report.categorized {
            println!("    {:<5} {}", output.count, output.location);
        }
    } else {
        println!("  index not written: nothing merged");
    }

    println!("{}", if report.is_degraded() { "degraded" } else { "ok" });
}
