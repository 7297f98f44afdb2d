//! HTTP routes for the read-only dashboard API.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use newsrisk_common::Error;
use newsrisk_core::store::StoreRow;
use newsrisk_core::{export_csv, facets, ArticleFilter, Facets, TaggedArticle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::DashboardState;

/// Download name used by the CSV export.
pub const EXPORT_FILENAME: &str = "filtered_risk_news.csv";

// ============================================================================
// Request / Response Types
// ============================================================================

/// Filter parameters. Lists are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleQuery {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Lookback in days (1..=30); defaults to the configured lookback
    #[serde(default)]
    pub days: Option<u32>,
    /// RFC 3339 lower bound; takes precedence over `days`
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub review_only: bool,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl ArticleQuery {
    /// Build the filter, validating the recency bound.
    pub fn to_filter(&self, default_days: u32, now: DateTime<Utc>) -> Result<ArticleFilter, Error> {
        let filter = ArticleFilter::new()
            .with_vendors(split_list(self.vendor.as_deref()))
            .with_tags(split_list(self.tag.as_deref()))
            .review_only(self.review_only);

        if let Some(since) = &self.since {
            let since = DateTime::parse_from_rfc3339(since)
                .map_err(|e| Error::InvalidInput(format!("since must be RFC 3339: {e}")))?;
            return Ok(filter.since(since.with_timezone(&Utc)));
        }

        let days = self.days.unwrap_or(default_days);
        if !(1..=30).contains(&days) {
            return Err(Error::InvalidInput(format!(
                "days must be between 1 and 30, got {days}"
            )));
        }
        Ok(filter.lookback(days, now))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    pub count: usize,
    pub articles: Vec<StoreRow>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub records: usize,
    pub loaded_at: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps errors onto HTTP statuses via [`Error::status_code`].
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl From<newsrisk_core::StoreError> for ApiError {
    fn from(error: newsrisk_core::StoreError) -> Self {
        Self(match error {
            newsrisk_core::StoreError::Read { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Error::NotFound(format!("store {} does not exist yet", path.display()))
            }
            other => Error::Internal(other.to_string()),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Dashboard request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "newsrisk-dashboard".to_string(),
    })
}

async fn filtered(
    state: &DashboardState,
    query: &ArticleQuery,
) -> Result<Vec<TaggedArticle>, ApiError> {
    let filter = query.to_filter(state.default_lookback_days, Utc::now())?;
    let snapshot = state.cache.load().await?;
    Ok(filter.apply_cloned(&snapshot.articles))
}

/// Filtered articles as JSON, in store order.
pub async fn list_articles(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let articles: Vec<StoreRow> = filtered(&state, &query)
        .await?
        .iter()
        .map(StoreRow::from)
        .collect();
    Ok(Json(ArticlesResponse {
        count: articles.len(),
        articles,
    }))
}

/// Filtered articles as a CSV download in the store schema.
pub async fn export_articles(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<ArticleQuery>,
) -> Result<Response, ApiError> {
    let articles = filtered(&state, &query).await?;
    let mut body = Vec::new();
    export_csv(&mut body, &articles)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Distinct vendors and tags over the whole store.
pub async fn get_facets(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<Facets>, ApiError> {
    let snapshot = state.cache.load().await?;
    Ok(Json(facets(&snapshot.articles)))
}

/// Reload the store from disk.
pub async fn refresh(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let snapshot = state.cache.refresh().await?;
    Ok(Json(RefreshResponse {
        records: snapshot.articles.len(),
        loaded_at: snapshot.loaded_at.to_rfc3339(),
    }))
}
