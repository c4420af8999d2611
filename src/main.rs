//! # Project Index CLI (`pidx`)
//!
//! ## Usage
//!
//! ```bash
//! pidx --config ./config/pidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pidx sync [all\|github\|huggingface]` | Fetch providers and merge into the index |
//! | `pidx sources` | List providers and their configuration status |
//! | `pidx stats` | Per-source and per-type counts of the persisted index |
//! | `pidx list` | Print indexed projects, newest first |
//!
//! ## Examples
//!
//! ```bash
//! # Refresh everything
//! pidx sync all
//!
//! # Refresh only Hugging Face spaces, without writing
//! pidx sync huggingface --type space --dry-run
//!
//! # Ten most recent GitHub projects
//! pidx list --source github --limit 10
//! ```

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use project_index::config;
use project_index::ingest::{self, SyncOptions};
use project_index::list::{self, ListFilter};
use project_index::models::{ProjectKind, Source};
use project_index::{sources, stats};

/// Project Index CLI: aggregate public repositories, gists, models,
/// datasets and spaces into one local index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pidx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pidx",
    about = "Project Index: aggregate public projects from GitHub and Hugging Face into one local index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pidx.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch providers and merge their records into the index.
    ///
    /// A provider that fails to fetch leaves its existing records untouched.
    /// With `--type`, only records of those types are refreshed; other
    /// records of the same provider are preserved.
    Sync {
        /// `all`, a provider (`github`, `huggingface`) or an alias (`gh`, `hf`).
        #[arg(default_value = "all")]
        provider: String,

        /// Only refresh these types (e.g. `repository`, `gist`, `model`).
        #[arg(long = "type", value_name = "TYPE")]
        kinds: Vec<ProjectKind>,

        /// Fetch and merge, print the summary, write nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// List providers and their configuration status.
    Sources,

    /// Show counts of the persisted index.
    Stats,

    /// Print indexed projects in canonical order (newest first).
    List {
        /// Only this source (`github`, `huggingface`).
        #[arg(long)]
        source: Option<Source>,

        /// Only this type.
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<ProjectKind>,

        /// Maximum number of projects to print.
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "pidx=debug,project_index=debug"
    } else {
        "pidx=info,project_index=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            provider,
            kinds,
            dry_run,
        } => {
            let options = SyncOptions {
                selector: provider,
                kinds,
                dry_run,
            };
            let report = ingest::run_sync(&cfg, &options).await?;
            if report.is_degraded() {
                bail!("sync completed with fetch failures; existing records were kept");
            }
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::List {
            source,
            kind,
            limit,
        } => {
            let filter = ListFilter {
                source,
                kind,
                limit,
            };
            list::run_list(&cfg, &filter)?;
        }
    }

    Ok(())
}
