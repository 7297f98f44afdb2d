//! Command implementations behind the `newsrisk` binary.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use newsrisk_common::Config;
use newsrisk_core::classifier::vocabulary_from_config;
use newsrisk_core::{read_store, write_atomic, ArticleFilter, Pipeline, TaggedArticle};
use newsrisk_ingest::{ingest, SourceKind};

use crate::render::render_articles;

/// Filters accepted by `newsrisk query`.
#[derive(Debug, Default, Clone)]
pub struct QueryArgs {
    pub vendors: Vec<String>,
    pub tags: Vec<String>,
    pub days: Option<u32>,
    pub since: Option<String>,
    pub review_only: bool,
    pub export: Option<PathBuf>,
}

impl QueryArgs {
    /// Without `--days` or `--since` there is no recency bound.
    pub fn to_filter(&self, now: DateTime<Utc>) -> Result<ArticleFilter> {
        let mut filter = ArticleFilter::new()
            .with_vendors(self.vendors.iter().cloned())
            .with_tags(self.tags.iter().cloned())
            .review_only(self.review_only);

        if let Some(since) = &self.since {
            let since = DateTime::parse_from_rfc3339(since)
                .with_context(|| format!("--since must be RFC 3339, got {since:?}"))?;
            filter = filter.since(since.with_timezone(&Utc));
        } else if let Some(days) = self.days {
            if !(1..=30).contains(&days) {
                bail!("--days must be between 1 and 30, got {days}");
            }
            filter = filter.lookback(days, now);
        }
        Ok(filter)
    }
}

pub async fn run_ingest(config: &Config, kind: SourceKind) -> Result<()> {
    let report = ingest(kind, config).await?;
    println!(
        "Collected {} {} articles into {}",
        report.articles,
        report.source,
        report.path.display()
    );
    Ok(())
}

pub async fn run_merge(config: &Config) -> Result<()> {
    let pipeline = Pipeline::new(config.clone());
    let report = pipeline.merge().await?;
    let path = pipeline.write_merged(&report.articles).await?;
    println!(
        "Merged {} articles ({} duplicates removed, {} unparseable dropped, \
         {} sources failed) into {}",
        report.articles.len(),
        report.duplicates_removed,
        report.dropped_unparseable,
        report.failed_sources.len(),
        path.display()
    );
    Ok(())
}

pub async fn run_classify(config: &Config) -> Result<()> {
    let pipeline = Pipeline::new(config.clone());
    let articles = pipeline.load_merged().await?;
    let batch = pipeline.classify(articles).await?;
    let path = pipeline.write_tagged(&batch).await?;
    pipeline.metrics().summary().await.log();
    println!(
        "Tagged {} of {} articles ({} need review) into {}",
        batch.stats.tagged,
        batch.stats.total,
        batch.stats.flagged(),
        path.display()
    );
    Ok(())
}

pub async fn run_pipeline(config: &Config) -> Result<()> {
    let report = Pipeline::new(config.clone()).run().await?;
    println!(
        "Run {}: merged {} articles, tagged {}, {} need review, {} sources failed; store at {}",
        report.run_id,
        report.merged,
        report.classification.tagged,
        report.classification.flagged(),
        report.failed_sources,
        report.store_path.display()
    );
    Ok(())
}

/// Filter the tagged store, returning the rendered listing.
pub fn run_query(config: &Config, args: &QueryArgs, now: DateTime<Utc>) -> Result<String> {
    let filter = args.to_filter(now)?;
    let path = config.tagged_store_path();
    let contents =
        read_store(&path).with_context(|| format!("Failed to read store {}", path.display()))?;
    if contents.dropped > 0 {
        tracing::warn!(dropped = contents.dropped, "Store rows skipped on load");
    }

    let matches: Vec<&TaggedArticle> = filter.apply(&contents.articles);
    if let Some(export) = &args.export {
        let owned: Vec<TaggedArticle> = matches.iter().map(|a| (*a).clone()).collect();
        write_atomic(export, |w| newsrisk_core::export_csv(w, &owned))
            .with_context(|| format!("Failed to export to {}", export.display()))?;
        tracing::info!(
            records = owned.len(),
            path = %export.display(),
            "Exported filtered articles"
        );
    }
    Ok(render_articles(&matches))
}

/// Describe the active backend and label vocabulary.
pub fn labels_report(config: &Config) -> Result<String> {
    let vocabulary = vocabulary_from_config(&config.classifier)?;
    let mut out = format!(
        "Backend: {} (threshold {})\n",
        config.classifier.backend, config.classifier.threshold
    );
    for label in vocabulary.iter() {
        out.push_str("  ");
        out.push_str(label);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use newsrisk_core::{write_store, CanonicalArticle, RiskTags};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_no_recency_bound_by_default() {
        let filter = QueryArgs::default().to_filter(now()).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_days_bound() {
        let args = QueryArgs {
            days: Some(7),
            ..QueryArgs::default()
        };
        let filter = args.to_filter(now()).unwrap();
        assert_eq!(filter.min_published, Some(now() - Duration::days(7)));

        let args = QueryArgs {
            days: Some(45),
            ..QueryArgs::default()
        };
        assert!(args.to_filter(now()).is_err());
    }

    #[test]
    fn test_bad_since_rejected() {
        let args = QueryArgs {
            since: Some("yesterday".into()),
            ..QueryArgs::default()
        };
        assert!(args.to_filter(now()).is_err());
    }

    #[test]
    fn test_labels_report_lists_vocabulary_in_order() {
        let report = labels_report(&Config::default()).unwrap();
        let data_breach = report.find("Data Breach").unwrap();
        let ddos = report.find("DDoS Incident").unwrap();
        assert!(report.starts_with("Backend: "));
        assert!(data_breach < ddos);
    }

    fn stored(vendor: &str, title: &str, days_ago: i64, tags: &str) -> TaggedArticle {
        TaggedArticle::new(
            CanonicalArticle {
                vendor: vendor.into(),
                title: title.into(),
                published: now() - Duration::days(days_ago),
                url: format!("https://news.example/{title}"),
                description: "body".into(),
            },
            RiskTags::parse_field(tags),
        )
    }

    #[test]
    fn test_query_renders_and_exports_matches() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().display().to_string(),
            ..Config::default()
        };
        write_store(
            &config.tagged_store_path(),
            &[
                stored("Okta", "okta-breach", 1, "Data Breach, Lawsuit"),
                stored("Cisco", "cisco-outage", 2, "System Outage"),
                stored("Okta", "okta-old", 20, ""),
            ],
        )
        .unwrap();

        let export = dir.path().join("out").join("filtered.csv");
        let args = QueryArgs {
            vendors: vec!["Okta".into()],
            days: Some(7),
            export: Some(export.clone()),
            ..QueryArgs::default()
        };
        let text = run_query(&config, &args, now()).unwrap();
        assert!(text.starts_with("Showing 1 articles\n"));
        assert!(text.contains("okta-breach"));
        assert!(!text.contains("cisco-outage"));

        let csv = std::fs::read_to_string(&export).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "vendor,title,published,url,description,risk_tags,review_flag"
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Okta,okta-breach,"));
        assert!(lines[1].ends_with(",\"Data Breach, Lawsuit\",false"));
    }

    #[test]
    fn test_query_without_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().display().to_string(),
            ..Config::default()
        };
        let err = run_query(&config, &QueryArgs::default(), now()).unwrap_err();
        assert!(err.to_string().contains("Failed to read store"));
    }
}
