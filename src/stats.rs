//! Index statistics.
//!
//! Summarizes what's in the persisted index: total size, per-source and
//! per-type counts, and when it was last generated. Used by `pidx stats` to
//! confirm that syncs are landing as expected.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::index::Index;
use crate::models::Source;
use crate::store::{IndexStore, JsonIndexStore};

pub fn run_stats(config: &Config) -> Result<()> {
    let store = JsonIndexStore::from_config(config);
    let index = store.load()?;
    let file_size = std::fs::metadata(store.path()).map(|m| m.len()).unwrap_or(0);

    println!("Project Index Stats");
    println!("===================");
    println!();
    println!("  Index:       {}", store.path().display());
    println!("  Size:        {}", format_bytes(file_size));
    println!(
        "  Generated:   {}",
        index
            .generated_at()
            .map(|ts| format_ts_relative(ts, Utc::now()))
            .unwrap_or_else(|| "never".to_string())
    );
    println!("  Projects:    {}", index.len());

    print_breakdown(&index);
    println!();
    Ok(())
}

fn print_breakdown(index: &Index) {
    println!();
    println!("  {:<14} {:<14} {:>6}", "SOURCE", "TYPE", "COUNT");
    println!("  {}", "-".repeat(36));
    for source in Source::ALL {
        for kind in source.kinds() {
            println!(
                "  {:<14} {:<14} {:>6}",
                source.slug(),
                kind.plural(),
                index.count(source, *kind)
            );
        }
        println!("  {:<14} {:<14} {:>6}", "", "all", index.source_len(source));
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to `now` (e.g. "3 hours ago").
fn format_ts_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();

    if delta < 0 || delta >= 86400 * 30 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}
