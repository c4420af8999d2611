//! # Project Index
//!
//! Aggregates metadata about a person's public artifacts (repositories,
//! gists, models, datasets, spaces) from several catalog providers into one
//! locally persisted JSON index.
//!
//! The core is the incremental merge: a freshly fetched provider batch is
//! reconciled against the prior index so that every currently public record
//! is present and up to date, records from providers not fetched in this run
//! are preserved, and no logical project appears twice.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │  Providers  │──▶│   Validate   │──▶│     Merge      │
//! │  GitHub/HF  │   │ ValidatedBatch│  │ Index → Index  │
//! └─────────────┘   └──────────────┘   └───────┬────────┘
//!                                              ▼
//!                                     ┌────────────────┐
//!                                     │   IndexStore   │
//!                                     │ unified + per  │
//!                                     │ (source, type) │
//!                                     └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pidx sources                 # check provider configuration
//! pidx sync all                # fetch, merge and persist
//! pidx sync github --type gist # refresh only gists
//! pidx stats
//! pidx list --source huggingface --limit 10
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Canonical record, key, enums, ordering |
//! | [`index`] | Index value, counts, persisted document |
//! | [`merge`] | Validated batches and the incremental merge |
//! | [`store`] | Index persistence (JSON, in-memory) |
//! | [`traits`] | `Provider` trait and registry |
//! | [`provider_github`] | GitHub repositories and gists |
//! | [`provider_huggingface`] | Hugging Face models, datasets, spaces |
//! | [`http`] | Retrying JSON GET client |
//! | [`ingest`] | Sync orchestration |
//! | [`config`] | TOML configuration |
//! | [`error`] | Typed errors |

pub mod config;
pub mod error;
pub mod http;
pub mod index;
pub mod ingest;
pub mod list;
pub mod merge;
pub mod models;
pub mod provider_github;
pub mod provider_huggingface;
pub mod sources;
pub mod stats;
pub mod store;
pub mod traits;
