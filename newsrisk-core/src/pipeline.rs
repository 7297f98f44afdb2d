//! Batch orchestration: merge, classify, persist.
//!
//! Each stage consumes a complete collection and produces a complete one.
//! Per-record problems are counted; per-run problems abort the stage.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use newsrisk_common::logging::{generate_run_id, RunMetrics, RunSummary};
use newsrisk_common::Config;
use tracing::Instrument;

use crate::classifier::{build_classifier, ClassificationStats, ClassifiedBatch};
use crate::merge::{MergeReport, RecordMerger, SourceTable};
use crate::model::CanonicalArticle;
use crate::store::{write_canonical, write_store};

/// What a full run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub merged: usize,
    pub failed_sources: usize,
    pub classification: ClassificationStats,
    pub store_path: PathBuf,
    pub summary: RunSummary,
}

/// One batch run over a config.
pub struct Pipeline {
    config: Config,
    metrics: RunMetrics,
    run_id: String,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            metrics: RunMetrics::new(),
            run_id: generate_run_id(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Merge every configured source. Fails only when no source could be used.
    pub async fn merge(&self) -> Result<MergeReport> {
        let span = newsrisk_common::run_span!(
            "merge",
            self.run_id,
            sources = self.config.sources.len()
        );
        let started = Instant::now();

        let sources: Vec<_> = self
            .config
            .sources
            .iter()
            .map(|s| (s.clone(), self.config.resolve_path(&s.path)))
            .collect();

        let report = async {
            tokio::task::spawn_blocking(move || {
                let mut merger = RecordMerger::new();
                for (source, path) in &sources {
                    match SourceTable::from_path(source, path) {
                        Ok(table) => {
                            if let Err(e) = merger.push_source(&table) {
                                merger.record_failure(e);
                            }
                        }
                        Err(e) => merger.record_failure(e),
                    }
                }
                merger.finish()
            })
            .await
            .context("Merge task panicked")
        }
        .instrument(span)
        .await?;

        report.log();
        self.metrics.record_stage("merge", started.elapsed()).await;
        self.metrics.add("merged", report.articles.len() as u64).await;
        self.metrics
            .add("dropped_unparseable", report.dropped_unparseable as u64)
            .await;
        self.metrics
            .add("duplicates_removed", report.duplicates_removed as u64)
            .await;
        self.metrics
            .add("failed_sources", report.failed_sources.len() as u64)
            .await;

        if report.all_sources_failed() {
            let reasons: Vec<String> = report
                .failed_sources
                .iter()
                .map(ToString::to_string)
                .collect();
            bail!("No source could be merged: {}", reasons.join("; "));
        }
        Ok(report)
    }

    /// Persist merged records to the configured merged path.
    pub async fn write_merged(&self, articles: &[CanonicalArticle]) -> Result<PathBuf> {
        let path = self.config.merged_path();
        let articles = articles.to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_canonical(&target, &articles))
            .await
            .context("Write task panicked")?
            .with_context(|| format!("Failed to write merged records to {}", path.display()))?;
        Ok(path)
    }

    /// Read the merged file back as canonical records.
    pub async fn load_merged(&self) -> Result<Vec<CanonicalArticle>> {
        let path = self.config.merged_path();
        let source = newsrisk_common::SourceConfig {
            name: "merged".into(),
            path: path.display().to_string(),
            body_field: "description".into(),
        };
        let report = tokio::task::spawn_blocking(move || {
            let table = SourceTable::from_path(&source, &path)?;
            let mut merger = RecordMerger::new();
            merger.push_source(&table)?;
            Ok::<_, crate::error::SchemaError>(merger.finish())
        })
        .await
        .context("Load task panicked")?
        .context("Failed to load merged records")?;

        if report.dropped_unparseable > 0 {
            tracing::warn!(
                dropped = report.dropped_unparseable,
                "Merged file had rows with unparseable timestamps"
            );
        }
        Ok(report.articles)
    }

    /// Classify canonical records with the configured backend.
    pub async fn classify(&self, articles: Vec<CanonicalArticle>) -> Result<ClassifiedBatch> {
        let classifier = build_classifier(&self.config.classifier)
            .context("Failed to build risk classifier")?;
        let span = newsrisk_common::run_span!(
            "classify",
            self.run_id,
            records = articles.len(),
            model = %classifier.model_name()
        );
        let started = Instant::now();

        let batch = classifier.classify_batch(articles).instrument(span).await;

        self.metrics.record_stage("classify", started.elapsed()).await;
        self.metrics.add("tagged", batch.stats.tagged as u64).await;
        self.metrics.add("no_match", batch.stats.no_match as u64).await;
        self.metrics.add("empty_text", batch.stats.empty_text as u64).await;
        self.metrics.add("classification_failed", batch.stats.failed as u64).await;

        if batch.stats.failed > 0 {
            tracing::warn!(
                failed = batch.stats.failed,
                total = batch.stats.total,
                "Some records were flagged because classification failed"
            );
        }
        Ok(batch)
    }

    /// Overwrite the tagged store with a classified batch.
    pub async fn write_tagged(&self, batch: &ClassifiedBatch) -> Result<PathBuf> {
        let started = Instant::now();
        let path = self.config.tagged_store_path();
        let articles = batch.articles.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_store(&target, &articles))
            .await
            .context("Write task panicked")?
            .with_context(|| format!("Failed to write tagged store {}", path.display()))?;
        self.metrics.record_stage("store", started.elapsed()).await;
        Ok(path)
    }

    /// Merge, classify and persist in one go.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!(run_id = %self.run_id, "Pipeline run started");

        let merged = self.merge().await?;
        self.write_merged(&merged.articles).await?;
        let failed_sources = merged.failed_sources.len();
        let merged_count = merged.articles.len();

        let batch = self.classify(merged.articles).await?;
        let store_path = self.write_tagged(&batch).await?;

        let summary = self.metrics.summary().await;
        summary.log();
        Ok(RunReport {
            run_id: self.run_id.clone(),
            merged: merged_count,
            failed_sources,
            classification: batch.stats,
            store_path,
            summary,
        })
    }
}
