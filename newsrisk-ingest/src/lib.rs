//! Newsrisk Ingest - adapters that collect raw vendor news.
//!
//! Each adapter implements [`NewsSource`] and writes a per-source CSV that
//! the record merger later reads through `sources[].body_field`.

pub mod feed;
pub mod gnews;
pub mod output;
pub mod source;
pub mod vendors;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use newsrisk_common::Config;

pub use feed::RssSource;
pub use gnews::GNewsSource;
pub use output::write_raw;
pub use source::NewsSource;
pub use vendors::{load_vendor_file, load_vendors};

/// Which adapter to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    GNews,
    Rss,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GNews => write!(f, "gnews"),
            Self::Rss => write!(f, "rss"),
        }
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub source: String,
    pub articles: usize,
    pub path: PathBuf,
}

/// Build the adapter and its output path from config.
pub fn build_source(kind: SourceKind, config: &Config) -> (Box<dyn NewsSource>, PathBuf) {
    let timeout = Duration::from_secs(config.ingest.http_timeout_secs);
    match kind {
        SourceKind::GNews => (
            Box::new(GNewsSource::new(config.ingest.gnews.clone(), timeout)),
            config.resolve_path(&config.ingest.gnews.output_path),
        ),
        SourceKind::Rss => (
            Box::new(RssSource::new(config.ingest.rss.clone(), timeout)),
            config.resolve_path(&config.ingest.rss.output_path),
        ),
    }
}

/// Collect from `source` and write its raw CSV to `path`.
pub async fn run_source(
    source: &dyn NewsSource,
    vendors: &[String],
    path: PathBuf,
) -> Result<IngestReport> {
    let started = Instant::now();
    let articles = source
        .collect(vendors)
        .await
        .with_context(|| format!("{} ingestion failed", source.name()))?;

    let body_field = source.body_field().to_string();
    let target = path.clone();
    let count = articles.len();
    tokio::task::spawn_blocking(move || write_raw(&target, &body_field, &articles))
        .await
        .context("Write task panicked")?
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(
        source = %source.name(),
        articles = count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Ingestion finished"
    );
    Ok(IngestReport {
        source: source.name().to_string(),
        articles: count,
        path,
    })
}

/// Run one adapter end to end using config.
pub async fn ingest(kind: SourceKind, config: &Config) -> Result<IngestReport> {
    let vendors = load_vendors(config)?;
    let (source, path) = build_source(kind, config);
    run_source(source.as_ref(), &vendors, path).await
}
