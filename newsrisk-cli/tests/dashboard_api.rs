//! Dashboard API over a temporary tagged store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration as ChronoDuration, Utc};
use newsrisk_cli::{build_router, DashboardState};
use newsrisk_core::{write_store, CanonicalArticle, RiskTags, StoreCache, TaggedArticle};
use serde_json::Value;
use tower::ServiceExt;

fn article(vendor: &str, title: &str, days_ago: i64, tags: &str) -> TaggedArticle {
    TaggedArticle::new(
        CanonicalArticle {
            vendor: vendor.into(),
            title: title.into(),
            published: Utc::now() - ChronoDuration::days(days_ago),
            url: format!("https://news.example/{}", title.replace(' ', "-")),
            description: format!("{title} body"),
        },
        RiskTags::parse_field(tags),
    )
}

fn seed(path: &Path) {
    let articles = vec![
        article("Okta", "Okta breach", 1, "Data Breach"),
        article("Cisco", "Cisco outage", 2, "System Outage, DDoS Incident"),
        article("Okta", "Okta earnings", 3, ""),
        article("Cisco", "Cisco old lawsuit", 20, "Lawsuit"),
    ];
    write_store(path, &articles).unwrap();
}

fn app_for(path: &Path) -> axum::Router {
    let state = Arc::new(DashboardState {
        cache: StoreCache::new(path, Duration::from_secs(3600)),
        default_lookback_days: 7,
    });
    build_router(state)
}

async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
) -> (StatusCode, Vec<u8>, Option<String>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, body.to_vec(), disposition)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, body, _) = send(app, Method::GET, uri).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn titles(json: &Value) -> Vec<String> {
    json["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_service() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(&dir.path().join("tagged.csv"));

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "newsrisk-dashboard");
}

#[tokio::test]
async fn articles_default_lookback_keeps_store_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.csv");
    seed(&path);
    let app = app_for(&path);

    let (status, json) = get_json(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(titles(&json), ["Okta breach", "Cisco outage", "Okta earnings"]);
}

#[tokio::test]
async fn articles_filters_compose() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.csv");
    seed(&path);
    let app = app_for(&path);

    let (_, json) = get_json(&app, "/api/articles?vendor=Okta&days=30").await;
    assert_eq!(titles(&json), ["Okta breach", "Okta earnings"]);

    let (_, json) = get_json(&app, "/api/articles?tag=Lawsuit,DDoS%20Incident&days=30").await;
    assert_eq!(titles(&json), ["Cisco outage", "Cisco old lawsuit"]);

    let (_, json) = get_json(&app, "/api/articles?review_only=true").await;
    assert_eq!(titles(&json), ["Okta earnings"]);
    assert_eq!(json["articles"][0]["review_flag"], true);
    assert_eq!(json["articles"][0]["risk_tags"], "");
}

#[tokio::test]
async fn articles_rejects_out_of_range_days() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.csv");
    seed(&path);
    let app = app_for(&path);

    let (status, json) = get_json(&app, "/api/articles?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("days"));
}

#[tokio::test]
async fn missing_store_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(&dir.path().join("absent.csv"));

    let (status, _) = get_json(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csv_export_uses_store_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.csv");
    seed(&path);
    let app = app_for(&path);

    let (status, body, disposition) =
        send(&app, Method::GET, "/api/articles.csv?vendor=Cisco").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        disposition.as_deref(),
        Some("attachment; filename=\"filtered_risk_news.csv\"")
    );

    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("vendor,title,published,url,description,risk_tags,review_flag")
    );
    let rest: Vec<&str> = lines.collect();
    assert_eq!(rest.len(), 1);
    assert!(rest[0].contains("\"System Outage, DDoS Incident\""));
}

#[tokio::test]
async fn facets_cover_whole_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.csv");
    seed(&path);
    let app = app_for(&path);

    let (status, json) = get_json(&app, "/api/facets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["vendors"], serde_json::json!(["Cisco", "Okta"]));
    let tags: Vec<&str> = json["tags"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(tags.contains(&"Lawsuit"));
    assert!(tags.contains(&"DDoS Incident"));
}

#[tokio::test]
async fn refresh_picks_up_rewritten_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.csv");
    seed(&path);
    let app = app_for(&path);

    let (_, json) = get_json(&app, "/api/articles?days=30").await;
    assert_eq!(json["count"], 4);

    write_store(&path, &[article("Zoom", "Zoom fine", 1, "Regulatory Fine")]).unwrap();

    let (status, body, _) = send(&app, Method::POST, "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["records"], 1);

    let (_, json) = get_json(&app, "/api/articles?days=30").await;
    assert_eq!(titles(&json), ["Zoom fine"]);
}
