//! GNews search API adapter.
//!
//! For each day and vendor, the risk keywords are OR-ed in small batches:
//! `"Okta" AND ("data breach" OR "ransomware" OR "cyber attack")`. The API
//! rejects long queries, so any query over `max_query_len` is skipped.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use newsrisk_common::util::{sanitize_for_log, truncate_with_ellipsis};
use newsrisk_common::GNewsConfig;
use newsrisk_core::RawArticle;
use serde::Deserialize;

use crate::source::NewsSource;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<SearchArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    url: String,
    #[serde(default)]
    published_at: Option<String>,
}

/// Build the search queries for one vendor, dropping any that are too long.
pub fn build_queries(
    vendor: &str,
    keywords: &[String],
    per_batch: usize,
    max_len: usize,
) -> Vec<String> {
    keywords
        .chunks(per_batch.max(1))
        .filter_map(|batch| {
            let keyword_query = batch
                .iter()
                .map(|k| format!("\"{k}\""))
                .collect::<Vec<_>>()
                .join(" OR ");
            let query = format!("\"{vendor}\" AND ({keyword_query})");
            if query.chars().count() > max_len {
                tracing::warn!(query = %query, max_len, "Skipped query due to length");
                None
            } else {
                Some(query)
            }
        })
        .collect()
}

/// GNews adapter.
pub struct GNewsSource {
    client: reqwest::Client,
    config: GNewsConfig,
    today: Option<NaiveDate>,
}

impl GNewsSource {
    pub fn new(config: GNewsConfig, http_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .user_agent(concat!("newsrisk/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            config,
            today: None,
        }
    }

    /// Pin the date the lookback counts from.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn dates(&self) -> Vec<NaiveDate> {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        (0..self.config.days_back)
            .filter_map(|offset| today.checked_sub_days(chrono::Days::new(u64::from(offset))))
            .collect()
    }

    async fn search(
        &self,
        query: &str,
        date: NaiveDate,
        token: &str,
    ) -> Result<Vec<SearchArticle>> {
        let day = date.format("%Y-%m-%d").to_string();
        let max = self.config.max_articles_per_query.to_string();
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", query),
                ("from", day.as_str()),
                ("to", day.as_str()),
                ("lang", self.config.lang.as_str()),
                ("sort_by", "relevance"),
                ("max", max.as_str()),
                ("token", token),
            ])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(sanitize_for_log(&e.to_string())))
            .context("GNews request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("HTTP {}: {}", status, truncate_with_ellipsis(&body, 200));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse GNews response")?;
        Ok(parsed.articles)
    }
}

#[async_trait]
impl NewsSource for GNewsSource {
    fn name(&self) -> &str {
        "gnews"
    }

    fn body_field(&self) -> &str {
        "description"
    }

    async fn collect(&self, vendors: &[String]) -> Result<Vec<RawArticle>> {
        let Some(token) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            bail!("GNews API key not configured (set GNEWS_API_KEY)");
        };

        let mut articles = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut requests = 0usize;
        let mut failures = 0usize;

        for date in self.dates() {
            for vendor in vendors {
                let queries = build_queries(
                    vendor,
                    &self.config.keywords,
                    self.config.keywords_per_batch,
                    self.config.max_query_len,
                );
                for query in queries {
                    if requests > 0 && self.config.sleep_secs > 0 {
                        tokio::time::sleep(Duration::from_secs(self.config.sleep_secs)).await;
                    }
                    requests += 1;
                    tracing::debug!(query = %query, date = %date, "Fetching");

                    let found = match self.search(&query, date, token).await {
                        Ok(found) => found,
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(query = %query, error = %e, "GNews query failed");
                            continue;
                        }
                    };

                    for item in found {
                        if !seen_urls.insert(item.url.clone()) {
                            continue;
                        }
                        articles.push(RawArticle {
                            vendor: vendor.clone(),
                            title: item.title,
                            description: item.description,
                            url: item.url,
                            published: item.published_at,
                        });
                    }
                }
            }
        }

        tracing::info!(
            articles = articles.len(),
            requests,
            failures,
            "GNews ingestion complete"
        );
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_query_batching() {
        let queries = build_queries(
            "Okta",
            &keywords(&["data breach", "ransomware", "cyber attack", "lawsuit"]),
            3,
            200,
        );
        assert_eq!(
            queries,
            [
                r#""Okta" AND ("data breach" OR "ransomware" OR "cyber attack")"#,
                r#""Okta" AND ("lawsuit")"#,
            ]
        );
    }

    #[test]
    fn test_long_queries_are_skipped() {
        let queries = build_queries(
            "Amazon Web Services",
            &keywords(&["a very long keyword phrase", "x"]),
            1,
            40,
        );
        assert_eq!(queries, [r#""Amazon Web Services" AND ("x")"#]);
    }

    #[test]
    fn test_dates_count_back_from_today() {
        let config = GNewsConfig {
            days_back: 3,
            ..GNewsConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let source = GNewsSource::new(config, Duration::from_secs(5)).with_today(today);
        let days: Vec<String> = source.dates().iter().map(|d| d.to_string()).collect();
        assert_eq!(days, ["2024-03-01", "2024-02-29", "2024-02-28"]);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let source = GNewsSource::new(GNewsConfig::default(), Duration::from_secs(5));
        let err = source.collect(&["Okta".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("GNEWS_API_KEY"));
    }
}
