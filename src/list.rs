//! `pidx list`: print indexed projects in canonical order.

use anyhow::Result;

use crate::config::Config;
use crate::index::Index;
use crate::models::{ProjectKind, ProjectRecord, Source};
use crate::store::{IndexStore, JsonIndexStore};

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub source: Option<Source>,
    pub kind: Option<ProjectKind>,
    pub limit: Option<usize>,
}

/// Records of `index` matching `filter`, newest first.
pub fn select<'a>(index: &'a Index, filter: &ListFilter) -> Vec<&'a ProjectRecord> {
    let matching = index
        .records()
        .into_iter()
        .filter(|r| filter.source.map_or(true, |s| r.source == s))
        .filter(|r| filter.kind.map_or(true, |k| r.kind == k));

    match filter.limit {
        Some(n) => matching.take(n).collect(),
        None => matching.collect(),
    }
}

pub fn run_list(config: &Config, filter: &ListFilter) -> Result<()> {
    let index = JsonIndexStore::from_config(config).load()?;
    let records = select(&index, filter);

    if records.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    for r in &records {
        let created = r
            .created_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10}  {:<12} {:<11} {}",
            created,
            r.source.slug(),
            r.kind.slug(),
            r.full_name
        );
        if let Some(desc) = &r.description {
            println!("            {}", desc);
        }
        println!("            {}", r.url);
    }

    println!();
    println!("{} of {} projects", records.len(), index.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(mut record: ProjectRecord, year: i32) -> ProjectRecord {
        record.created_at = Some(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
        record
    }

    #[test]
    fn test_select_filters_and_limits() {
        let (index, _) = Index::from_records(
            None,
            vec![
                at(
                    ProjectRecord::new(ProjectKind::Repository, "old", "a/old", "https://github.com/a/old"),
                    2019,
                ),
                at(
                    ProjectRecord::new(ProjectKind::Repository, "new", "a/new", "https://github.com/a/new"),
                    2023,
                ),
                at(
                    ProjectRecord::new(ProjectKind::Model, "m", "a/m", "https://huggingface.co/a/m"),
                    2021,
                ),
            ],
        );

        let all = select(&index, &ListFilter::default());
        let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new", "m", "old"]);

        let repos = select(
            &index,
            &ListFilter {
                source: Some(Source::GitHub),
                limit: Some(1),
                ..ListFilter::default()
            },
        );
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "new");

        let models = select(
            &index,
            &ListFilter {
                kind: Some(ProjectKind::Model),
                ..ListFilter::default()
            },
        );
        assert_eq!(models.len(), 1);
    }
}
