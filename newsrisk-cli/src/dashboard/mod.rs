//! Read-only dashboard API over the tagged store.

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use newsrisk_common::Config;
use newsrisk_core::StoreCache;
use tower_http::cors::{Any, CorsLayer};

/// Shared handler state.
pub struct DashboardState {
    pub cache: StoreCache,
    pub default_lookback_days: u32,
}

impl DashboardState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: StoreCache::new(
                config.tagged_store_path(),
                Duration::from_secs(config.dashboard.refresh_secs),
            ),
            default_lookback_days: config.dashboard.default_lookback_days,
        }
    }
}

pub fn build_router(state: Arc<DashboardState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/articles", get(routes::list_articles))
        .route("/api/articles.csv", get(routes::export_articles))
        .route("/api/facets", get(routes::get_facets))
        .route("/api/refresh", post(routes::refresh))
        .layer(cors)
        .with_state(state)
}

/// Serve the dashboard API until the process is stopped.
pub async fn serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let state = Arc::new(DashboardState::from_config(config));

    // Load eagerly so a missing store is reported at startup, not on first request.
    match state.cache.load().await {
        Ok(snapshot) => tracing::info!(records = snapshot.articles.len(), "Store ready"),
        Err(e) => tracing::warn!(
            error = %e,
            "Store not loaded yet; serving errors until it exists"
        ),
    }

    let host = host.unwrap_or_else(|| config.dashboard.bind.clone());
    let port = port.unwrap_or(config.dashboard.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {host}:{port}"))?;
    tracing::info!(address = %addr, "Starting dashboard API");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
