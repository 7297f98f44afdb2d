//! RSS feed adapter.
//!
//! An entry is kept when its lower-cased title and summary mention a vendor
//! and any risk keyword. Only the first matching vendor produces a record.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use newsrisk_common::util::normalize_whitespace;
use newsrisk_common::{FeedConfig, RssConfig};
use newsrisk_core::RawArticle;

use crate::source::NewsSource;

/// Strip markup from a feed field and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    normalize_whitespace(&text)
}

/// Turn a parsed channel into raw articles for the given vendors.
pub fn extract_articles(
    channel: &rss::Channel,
    vendors: &[String],
    keywords: &[String],
) -> Vec<RawArticle> {
    let vendors_lower: Vec<(String, &String)> =
        vendors.iter().map(|v| (v.to_lowercase(), v)).collect();
    let keywords_lower: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = strip_html(item.title().unwrap_or_default());
            let content = strip_html(item.description().unwrap_or_default());
            let combined = format!("{title} {content}").to_lowercase();

            if !keywords_lower.iter().any(|k| combined.contains(k.as_str())) {
                return None;
            }
            let (_, vendor) = vendors_lower
                .iter()
                .find(|(lower, _)| !lower.is_empty() && combined.contains(lower.as_str()))?;

            let published = item
                .pub_date()
                .map(str::to_string)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().first().cloned())
                });

            Some(RawArticle {
                vendor: (*vendor).clone(),
                title,
                description: Some(content),
                url: item.link().unwrap_or_default().to_string(),
                published,
            })
        })
        .collect()
}

/// RSS adapter over the configured feeds.
pub struct RssSource {
    client: reqwest::Client,
    config: RssConfig,
}

impl RssSource {
    pub fn new(config: RssConfig, http_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .user_agent(concat!("newsrisk/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    /// Fetch and parse one feed.
    pub async fn fetch_channel(&self, feed: &FeedConfig) -> Result<rss::Channel> {
        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .context("Failed to fetch RSS feed")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let content = response.bytes().await.context("Failed to read RSS content")?;
        rss::Channel::read_from(&content[..]).context("Failed to parse RSS feed")
    }
}

#[async_trait]
impl NewsSource for RssSource {
    fn name(&self) -> &str {
        "rss"
    }

    fn body_field(&self) -> &str {
        "content"
    }

    async fn collect(&self, vendors: &[String]) -> Result<Vec<RawArticle>> {
        let fetches = self.config.feeds.iter().map(|feed| async move {
            (feed, self.fetch_channel(feed).await)
        });
        let results = futures::future::join_all(fetches).await;

        let mut articles = Vec::new();
        let mut failed_feeds = 0usize;
        for (feed, result) in results {
            match result {
                Ok(channel) => {
                    let found = extract_articles(&channel, vendors, &self.config.keywords);
                    tracing::debug!(
                        feed = %feed.name,
                        entries = channel.items().len(),
                        matched = found.len(),
                        "Feed parsed"
                    );
                    articles.extend(found);
                }
                Err(e) => {
                    failed_feeds += 1;
                    tracing::warn!(
                        feed = %feed.name,
                        url = %feed.url,
                        error = %format!("{e:#}"),
                        "Feed skipped"
                    );
                }
            }
        }

        tracing::info!(
            articles = articles.len(),
            feeds = self.config.feeds.len(),
            failed_feeds,
            "RSS ingestion complete"
        );
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Security</title>
    <link>https://feed.example</link>
    <description>News</description>
    <item>
      <title>Okta and Cisco hit by &lt;b&gt;breach&lt;/b&gt;</title>
      <link>https://feed.example/1</link>
      <description>&lt;p&gt;Attackers &lt;em&gt;leaked&lt;/em&gt; data.&lt;/p&gt;</description>
      <pubDate>Wed, 01 May 2024 12:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Microsoft ships new laptop</title>
      <link>https://feed.example/2</link>
      <description>Nothing risky</description>
    </item>
    <item>
      <title>Cisco patches exploit</title>
      <link>https://feed.example/3</link>
      <description>Details</description>
      <dc:date>2024-05-02T08:00:00Z</dc:date>
    </item>
  </channel>
</rss>"#;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>\n"), "Hello world");
        assert_eq!(strip_html("plain &amp; simple"), "plain & simple");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_first_vendor_wins_and_keywords_required() {
        let channel = rss::Channel::read_from(FEED.as_bytes()).unwrap();
        let articles = extract_articles(
            &channel,
            &strings(&["Cisco", "Okta", "Microsoft"]),
            &strings(&["breach", "exploit"]),
        );

        assert_eq!(articles.len(), 2);
        // Vendor list order decides, not position in the text.
        assert_eq!(articles[0].vendor, "Cisco");
        assert_eq!(articles[0].title, "Okta and Cisco hit by breach");
        assert_eq!(articles[0].description.as_deref(), Some("Attackers leaked data."));
        assert_eq!(
            articles[0].published.as_deref(),
            Some("Wed, 01 May 2024 12:00:00 +0000")
        );
        assert_eq!(articles[1].url, "https://feed.example/3");
        assert_eq!(articles[1].published.as_deref(), Some("2024-05-02T08:00:00Z"));
    }
}
