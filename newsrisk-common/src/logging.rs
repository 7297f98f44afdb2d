//! Logging utilities for the newsrisk pipeline.
//!
//! Provides structured logging (pretty or JSON) plus a small per-run metrics
//! collector used to print the batch summary.
//!
//! # Noise Filtering
//!
//! By default, noisy library modules (hyper, reqwest, h2, rustls, ...) are set
//! to `warn` so that HTTP plumbing does not drown out pipeline logs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default noisy modules that should be filtered to warn level.
pub const NOISY_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "tokio_util",
    "tower_http",
    "html5ever",
    "selectors",
];

/// Build the default EnvFilter with noise suppression.
///
/// `RUST_LOG` wins when it is set.
fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(filter_directives(log_level))
}

fn filter_directives(log_level: &str) -> String {
    let mut directives = String::from(log_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }
    directives
}

/// Initialize logging with the given configuration.
///
/// # Arguments
///
/// * `log_level` - Base log level (trace, debug, info, warn, error)
/// * `log_format` - Output format: "json" for structured JSON, anything else for human-readable
///
/// Logs go to stderr so that commands printing results on stdout stay pipeable.
pub fn init_logging(log_level: &str, log_format: &str) {
    let filter = build_filter(log_level);

    let subscriber = tracing_subscriber::registry().with(filter);

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::debug!(
        log_level = %log_level,
        log_format = %log_format,
        noise_filtered = NOISY_MODULES.len(),
        "Logging initialized"
    );
}

/// Generate a new run ID used to correlate the logs of one batch run.
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Create a tracing span for one pipeline run.
///
/// # Example
///
/// ```ignore
/// let span = run_span!("classify", run_id, records = n);
/// let _enter = span.enter();
/// ```
#[macro_export]
macro_rules! run_span {
    ($stage:expr, $run_id:expr) => {
        tracing::info_span!("pipeline_run", stage = $stage, run_id = %$run_id)
    };
    ($stage:expr, $run_id:expr, $($field:tt)*) => {
        tracing::info_span!("pipeline_run", stage = $stage, run_id = %$run_id, $($field)*)
    };
}

// ============================================================================
// Run Metrics
// ============================================================================

/// Stage timing and counter collector for a single batch run.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    inner: Arc<RwLock<RunMetricsInner>>,
}

#[derive(Debug, Default)]
struct RunMetricsInner {
    stage_durations_ms: BTreeMap<String, u64>,
    counters: BTreeMap<String, u64>,
}

impl RunMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how long a stage took. Repeated stages accumulate.
    pub async fn record_stage(&self, stage: &str, elapsed: Duration) {
        let mut inner = self.inner.write().await;
        *inner
            .stage_durations_ms
            .entry(stage.to_string())
            .or_default() += elapsed.as_millis() as u64;
    }

    /// Add `value` to a named counter.
    pub async fn add(&self, counter: &str, value: u64) {
        let mut inner = self.inner.write().await;
        *inner.counters.entry(counter.to_string()).or_default() += value;
    }

    /// Get current metrics summary.
    pub async fn summary(&self) -> RunSummary {
        let inner = self.inner.read().await;
        RunSummary {
            total_duration_ms: inner.stage_durations_ms.values().sum(),
            stage_durations_ms: inner.stage_durations_ms.clone(),
            counters: inner.counters.clone(),
        }
    }
}

/// Metrics summary for reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub total_duration_ms: u64,
    pub stage_durations_ms: BTreeMap<String, u64>,
    pub counters: BTreeMap<String, u64>,
}

impl RunSummary {
    /// Log the summary as one structured event.
    pub fn log(&self) {
        let counters = serde_json::to_string(&self.counters).unwrap_or_default();
        let stages = serde_json::to_string(&self.stage_durations_ms).unwrap_or_default();
        tracing::info!(
            total_duration_ms = self.total_duration_ms,
            stages = %stages,
            counters = %counters,
            "Run summary"
        );
    }
}
