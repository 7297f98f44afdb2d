//! Ingestion adapters against mock HTTP servers.

use std::time::Duration;

use chrono::NaiveDate;
use newsrisk_common::{Config, FeedConfig, GNewsConfig, RssConfig, SourceConfig};
use newsrisk_core::Pipeline;
use newsrisk_ingest::{run_source, GNewsSource, NewsSource, RssSource};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Feed</title>
    <link>https://feed.example</link>
    <description>d</description>
    <item>
      <title>Okta ransomware incident</title>
      <link>https://feed.example/okta</link>
      <description>&lt;p&gt;Okta systems hit by ransomware&lt;/p&gt;</description>
      <pubDate>Wed, 01 May 2024 12:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

fn gnews_config(server: &MockServer) -> GNewsConfig {
    GNewsConfig {
        base_url: format!("{}/api/v4/search", server.uri()),
        api_key: Some("gn-test".into()),
        keywords: vec!["data breach".into(), "ransomware".into()],
        keywords_per_batch: 1,
        sleep_secs: 0,
        ..GNewsConfig::default()
    }
}

#[tokio::test]
async fn gnews_collects_and_dedupes_by_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/search"))
        .and(query_param("q", r#""Okta" AND ("data breach")"#))
        .and(query_param("from", "2024-05-01"))
        .and(query_param("to", "2024-05-01"))
        .and(query_param("token", "gn-test"))
        .and(query_param("max", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalArticles": 2,
            "articles": [
                {
                    "title": "Okta breach",
                    "description": "Okta confirms breach",
                    "content": "...",
                    "url": "https://news.example/1",
                    "publishedAt": "2024-05-01T09:00:00Z"
                },
                {
                    "title": "Okta outage",
                    "description": null,
                    "url": "https://news.example/2",
                    "publishedAt": "2024-05-01T10:00:00Z"
                }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/search"))
        .and(query_param("q", r#""Okta" AND ("ransomware")"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "articles": [{
                "title": "Okta breach (repost)",
                "description": "dup",
                "url": "https://news.example/1",
                "publishedAt": "2024-05-01T11:00:00Z"
            }]
        })))
        .mount(&server)
        .await;

    let source = GNewsSource::new(gnews_config(&server), Duration::from_secs(5))
        .with_today(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    let articles = source.collect(&["Okta".to_string()]).await.unwrap();

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].title, "Okta breach");
    assert_eq!(articles[0].published.as_deref(), Some("2024-05-01T09:00:00Z"));
    assert_eq!(articles[1].description, None);
}

#[tokio::test]
async fn gnews_skips_failing_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/search"))
        .and(query_param("q", r#""Okta" AND ("data breach")"#))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/search"))
        .and(query_param("q", r#""Okta" AND ("ransomware")"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "articles": [{
                "title": "Okta ransomware",
                "description": "d",
                "url": "https://news.example/3",
                "publishedAt": "2024-05-01T11:00:00Z"
            }]
        })))
        .mount(&server)
        .await;

    let source = GNewsSource::new(gnews_config(&server), Duration::from_secs(5));
    let articles = source.collect(&["Okta".to_string()]).await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].url, "https://news.example/3");
}

#[tokio::test]
async fn rss_skips_broken_feeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed</html>"))
        .mount(&server)
        .await;

    let config = RssConfig {
        feeds: vec![
            FeedConfig {
                name: "good".into(),
                url: format!("{}/good.xml", server.uri()),
            },
            FeedConfig {
                name: "bad".into(),
                url: format!("{}/bad.xml", server.uri()),
            },
            FeedConfig {
                name: "gone".into(),
                url: format!("{}/missing.xml", server.uri()),
            },
        ],
        ..RssConfig::default()
    };
    let source = RssSource::new(config, Duration::from_secs(5));
    let articles = source
        .collect(&["Okta".to_string(), "Cisco".to_string()])
        .await
        .unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].vendor, "Okta");
    assert_eq!(articles[0].description.as_deref(), Some("Okta systems hit by ransomware"));
}

#[tokio::test]
async fn ingested_feed_flows_through_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        data_dir: dir.path().display().to_string(),
        sources: vec![SourceConfig {
            name: "rss".into(),
            path: "news_articles_rss.csv".into(),
            body_field: "content".into(),
        }],
        ..Config::default()
    };
    config.ingest.rss.feeds = vec![FeedConfig {
        name: "mock".into(),
        url: format!("{}/feed.xml", server.uri()),
    }];

    let source = RssSource::new(config.ingest.rss.clone(), Duration::from_secs(5));
    let raw_path = config.resolve_path(&config.ingest.rss.output_path);
    let report = run_source(&source, &["Okta".to_string()], raw_path)
        .await
        .unwrap();
    assert_eq!(report.articles, 1);

    let run = Pipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(run.merged, 1);
    assert_eq!(run.classification.tagged, 1);

    let stored = newsrisk_core::read_store(&config.tagged_store_path()).unwrap();
    assert_eq!(stored.articles[0].risk_tags().to_field(), "Ransomware Attack");
}
