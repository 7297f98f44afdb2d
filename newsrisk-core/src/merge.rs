//! Record merger: heterogeneous raw sources into one canonical collection.
//!
//! Each source names its body column differently; it is aliased to
//! `description` and every row is projected onto the canonical field set.
//! Rows whose `published` value does not parse are dropped and counted.
//! Across sources, the first record with a given (title, url) wins.

use std::collections::HashSet;
use std::path::Path;

use newsrisk_common::SourceConfig;
use serde::Serialize;

use crate::error::SchemaError;
use crate::model::{CanonicalArticle, RawArticle};
use crate::table::Table;
use crate::timestamp::parse_published;

/// Columns every source must carry besides its body column.
pub const REQUIRED_COLUMNS: &[&str] = &["vendor", "title", "published", "url"];

/// A raw source table plus the name of its body column.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub body_field: String,
    pub table: Table,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, body_field: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            body_field: body_field.into(),
            table,
        }
    }

    /// Read the CSV at `path` for a configured source.
    pub fn from_path(config: &SourceConfig, path: &Path) -> Result<Self, SchemaError> {
        let table = Table::from_path(path).map_err(|e| SchemaError::Unreadable {
            source_name: config.name.clone(),
            reason: format!("{}: {e}", path.display()),
        })?;
        Ok(Self::new(&config.name, &config.body_field, table))
    }

    /// Build an in-memory source from adapter output.
    pub fn from_raw_articles(name: impl Into<String>, articles: &[RawArticle]) -> Self {
        let headers = ["vendor", "title", "published", "url", "description"]
            .iter()
            .map(|h| (*h).to_string())
            .collect();
        let rows = articles
            .iter()
            .map(|a| {
                vec![
                    a.vendor.clone(),
                    a.title.clone(),
                    a.published.clone().unwrap_or_default(),
                    a.url.clone(),
                    a.description.clone().unwrap_or_default(),
                ]
            })
            .collect();
        Self::new(name, "description", Table::new(headers, rows))
    }

    fn check_schema(&self) -> Result<(), SchemaError> {
        let mut required: Vec<&str> = REQUIRED_COLUMNS.to_vec();
        required.push(&self.body_field);
        let missing = self.table.missing_columns(&required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns {
                source_name: self.name.clone(),
                missing: missing.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

/// Per-source merge tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub name: String,
    pub rows: usize,
    pub kept: usize,
    pub dropped_unparseable: usize,
    pub duplicates: usize,
}

/// Result of a merge: the canonical records plus what was left out and why.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub articles: Vec<CanonicalArticle>,
    pub failed_sources: Vec<SchemaError>,
    pub dropped_unparseable: usize,
    pub duplicates_removed: usize,
    pub per_source: Vec<SourceStats>,
}

impl MergeReport {
    /// True when sources were given but none could be merged.
    pub fn all_sources_failed(&self) -> bool {
        self.per_source.is_empty() && !self.failed_sources.is_empty()
    }

    pub fn log(&self) {
        for stats in &self.per_source {
            tracing::debug!(
                source = %stats.name,
                rows = stats.rows,
                kept = stats.kept,
                dropped_unparseable = stats.dropped_unparseable,
                duplicates = stats.duplicates,
                "Source merged"
            );
        }
        tracing::info!(
            merged = self.articles.len(),
            sources = self.per_source.len(),
            failed_sources = self.failed_sources.len(),
            dropped_unparseable = self.dropped_unparseable,
            duplicates_removed = self.duplicates_removed,
            "Merge complete"
        );
    }
}

/// Incremental merger; sources are pushed in list order.
#[derive(Debug, Default)]
pub struct RecordMerger {
    seen: HashSet<(String, String)>,
    report: MergeReport,
}

impl RecordMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project and append one source. A schema mismatch rejects the whole source.
    pub fn push_source(&mut self, source: &SourceTable) -> Result<SourceStats, SchemaError> {
        source.check_schema()?;

        let mut stats = SourceStats {
            name: source.name.clone(),
            rows: source.table.len(),
            ..SourceStats::default()
        };

        for row in source.table.rows() {
            let Some(published) = row.get("published").and_then(parse_published) else {
                stats.dropped_unparseable += 1;
                continue;
            };

            let article = CanonicalArticle {
                vendor: row.get("vendor").unwrap_or_default().to_string(),
                title: row.get("title").unwrap_or_default().to_string(),
                published,
                url: row.get("url").unwrap_or_default().to_string(),
                description: row.get(&source.body_field).unwrap_or_default().to_string(),
            };

            let key = (article.title.clone(), article.url.clone());
            if !self.seen.insert(key) {
                stats.duplicates += 1;
                continue;
            }
            self.report.articles.push(article);
            stats.kept += 1;
        }

        self.report.dropped_unparseable += stats.dropped_unparseable;
        self.report.duplicates_removed += stats.duplicates;
        self.report.per_source.push(stats.clone());
        Ok(stats)
    }

    /// Record a source that could not be read or projected.
    pub fn record_failure(&mut self, error: SchemaError) {
        tracing::error!(source = %error.source_name(), error = %error, "Source rejected");
        self.report.failed_sources.push(error);
    }

    pub fn finish(self) -> MergeReport {
        self.report
    }
}

/// Merge sources in order. Failing sources are reported, not fatal.
pub fn merge_sources(sources: &[SourceTable]) -> MergeReport {
    let mut merger = RecordMerger::new();
    for source in sources {
        if let Err(e) = merger.push_source(source) {
            merger.record_failure(e);
        }
    }
    merger.finish()
}
