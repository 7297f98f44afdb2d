//! Configuration management for the newsrisk pipeline.
//!
//! The pipeline reads a single JSON file, by default `~/.newsrisk/config.json`.
//! A sibling `secrets.json` may hold API credentials (see [`crate::config_loader`]).
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. `secrets.json` values
//! 3. `config.json` values
//! 4. Default values
//!
//! # Environment Variable Mapping
//!
//! - `NEWSRISK_LOG_LEVEL` → observability.log_level
//! - `NEWSRISK_LOG_FORMAT` → observability.log_format
//! - `NEWSRISK_DATA_DIR` → data_dir
//! - `GNEWS_API_KEY` → ingest.gnews.api_key
//! - `HF_API_TOKEN` → classifier.zero_shot.api_token

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config_loader::load_layered_config;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".newsrisk"),
        |dirs| dirs.home_dir().join(".newsrisk"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Default risk label vocabulary, in serialization order.
pub const DEFAULT_RISK_LABELS: &[&str] = &[
    "Data Breach",
    "Ransomware Attack",
    "Compliance Violation",
    "Lawsuit",
    "Regulatory Fine",
    "System Outage",
    "Malware Attack",
    "DDoS Incident",
];

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Sources and Store
// ============================================================================

/// One raw input table consumed by the record merger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Source name used in logs and merge reports
    pub name: String,

    /// CSV path (relative paths resolve against `data_dir`)
    pub path: String,

    /// Column holding the article body; aliased to `description` on merge
    #[serde(default = "default_body_field")]
    pub body_field: String,
}

fn default_body_field() -> String {
    "description".into()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "gnews".into(),
            path: "news_articles.csv".into(),
            body_field: "description".into(),
        },
        SourceConfig {
            name: "rss".into(),
            path: "news_articles_rss.csv".into(),
            body_field: "content".into(),
        },
    ]
}

/// Locations of the merged intermediate file and the tagged store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Canonical (untagged) merge output
    #[serde(default = "default_merged_path")]
    pub merged_path: String,

    /// Persisted tagged store
    #[serde(default = "default_tagged_path")]
    pub tagged_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            merged_path: default_merged_path(),
            tagged_path: default_tagged_path(),
        }
    }
}

fn default_merged_path() -> String {
    "news_articles_combined.csv".into()
}

fn default_tagged_path() -> String {
    "news_tagged_final_combined.csv".into()
}

// ============================================================================
// Classifier
// ============================================================================

/// Which scoring model backs the risk classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    /// Rule-based keyword matching (offline, deterministic)
    #[default]
    Keyword,
    /// HTTP zero-shot classification endpoint
    ZeroShot,
}

impl std::fmt::Display for ClassifierBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::ZeroShot => write!(f, "zero_shot"),
        }
    }
}

/// Zero-shot inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroShotConfig {
    /// Inference API base URL
    #[serde(default = "default_zero_shot_endpoint")]
    pub endpoint: String,

    /// Model identifier appended to `{endpoint}/models/`
    #[serde(default = "default_zero_shot_model")]
    pub model: String,

    /// Bearer token (usually supplied via `HF_API_TOKEN` or secrets.json)
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for ZeroShotConfig {
    fn default() -> Self {
        Self {
            endpoint: default_zero_shot_endpoint(),
            model: default_zero_shot_model(),
            api_token: None,
        }
    }
}

fn default_zero_shot_endpoint() -> String {
    "https://api-inference.huggingface.co".into()
}

fn default_zero_shot_model() -> String {
    "facebook/bart-large-mnli".into()
}

/// Risk classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Scoring model backend
    #[serde(default)]
    pub backend: ClassifierBackend,

    /// Ordered label vocabulary; order is the tag serialization order
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// Inclusive confidence threshold
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Per-call timeout for the scoring model
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum in-flight scoring calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Score cache capacity (0 disables the cache)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Keyword overrides per label for the keyword backend
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,

    /// Zero-shot endpoint settings
    #[serde(default)]
    pub zero_shot: ZeroShotConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::default(),
            labels: default_labels(),
            threshold: default_threshold(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            cache_capacity: default_cache_capacity(),
            keywords: BTreeMap::new(),
            zero_shot: ZeroShotConfig::default(),
        }
    }
}

fn default_labels() -> Vec<String> {
    DEFAULT_RISK_LABELS.iter().map(|l| (*l).to_string()).collect()
}

fn default_threshold() -> f64 {
    0.5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

fn default_cache_capacity() -> usize {
    1024
}

// ============================================================================
// Ingestion
// ============================================================================

/// GNews search API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GNewsConfig {
    #[serde(default = "default_gnews_base_url")]
    pub base_url: String,

    /// API token (usually supplied via `GNEWS_API_KEY` or secrets.json)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Number of past days to query, counting today
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    /// Search keywords, OR-ed in batches
    #[serde(default = "default_gnews_keywords")]
    pub keywords: Vec<String>,

    #[serde(default = "default_keywords_per_batch")]
    pub keywords_per_batch: usize,

    #[serde(default = "default_max_articles")]
    pub max_articles_per_query: u32,

    /// Queries longer than this are skipped
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,

    /// Pause between API calls
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,

    #[serde(default = "default_lang")]
    pub lang: String,

    /// Raw output CSV
    #[serde(default = "default_gnews_output")]
    pub output_path: String,
}

impl Default for GNewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_gnews_base_url(),
            api_key: None,
            days_back: default_days_back(),
            keywords: default_gnews_keywords(),
            keywords_per_batch: default_keywords_per_batch(),
            max_articles_per_query: default_max_articles(),
            max_query_len: default_max_query_len(),
            sleep_secs: default_sleep_secs(),
            lang: default_lang(),
            output_path: default_gnews_output(),
        }
    }
}

fn default_gnews_base_url() -> String {
    "https://gnews.io/api/v4/search".into()
}

fn default_days_back() -> u32 {
    1
}

fn default_gnews_keywords() -> Vec<String> {
    [
        "data breach",
        "ransomware",
        "cyber attack",
        "security incident",
        "regulatory fine",
        "lawsuit",
        "compliance failure",
        "system outage",
        "DDoS attack",
        "hacking",
        "fraud",
        "whistleblower",
        "misconduct",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_keywords_per_batch() -> usize {
    3
}

fn default_max_articles() -> u32 {
    10
}

fn default_max_query_len() -> usize {
    200
}

fn default_sleep_secs() -> u64 {
    4
}

fn default_lang() -> String {
    "en".into()
}

fn default_gnews_output() -> String {
    "news_articles.csv".into()
}

/// A named RSS feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// RSS polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,

    /// Lower-case substrings; an entry must contain at least one
    #[serde(default = "default_rss_keywords")]
    pub keywords: Vec<String>,

    /// Raw output CSV
    #[serde(default = "default_rss_output")]
    pub output_path: String,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            keywords: default_rss_keywords(),
            output_path: default_rss_output(),
        }
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    [
        ("TechCrunch Security", "https://techcrunch.com/tag/security/feed/"),
        ("CyberScoop", "https://www.cyberscoop.com/feed/"),
        ("The Hacker News", "https://feeds.feedburner.com/TheHackersNews"),
        ("Dark Reading", "https://www.darkreading.com/rss.xml"),
    ]
    .iter()
    .map(|(name, url)| FeedConfig {
        name: (*name).to_string(),
        url: (*url).to_string(),
    })
    .collect()
}

fn default_rss_keywords() -> Vec<String> {
    [
        "breach",
        "hack",
        "vulnerability",
        "ransomware",
        "exploit",
        "leak",
        "exposure",
        "cyberattack",
        "data loss",
        "compromise",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_rss_output() -> String {
    "news_articles_rss.csv".into()
}

/// Ingestion adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Vendors to monitor when no vendor file is configured
    #[serde(default = "default_vendors")]
    pub vendors: Vec<String>,

    /// Optional CSV with a `vendor` column; takes precedence over `vendors`
    #[serde(default)]
    pub vendors_path: Option<String>,

    #[serde(default)]
    pub gnews: GNewsConfig,

    #[serde(default)]
    pub rss: RssConfig,

    /// HTTP timeout for adapter requests
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            vendors: default_vendors(),
            vendors_path: None,
            gnews: GNewsConfig::default(),
            rss: RssConfig::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_vendors() -> Vec<String> {
    ["Okta", "CrowdStrike", "Cisco", "Microsoft", "Amazon Web Services"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_http_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Dashboard
// ============================================================================

/// Read-only dashboard API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Lookback used when a request does not specify `days`
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u32,

    /// The store is reloaded from disk once the cached copy is older than this
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            default_lookback_days: default_lookback_days(),
            refresh_secs: default_refresh_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    4450
}

fn default_lookback_days() -> u32 {
    7
}

fn default_refresh_secs() -> u64 {
    300
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory that relative data paths resolve against
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Raw sources merged in list order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            observability: ObservabilityConfig::default(),
            sources: default_sources(),
            store: StoreConfig::default(),
            classifier: ClassifierConfig::default(),
            ingest: IngestConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path, merging a sibling `secrets.json`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let value = load_layered_config(path)?;
        serde_json::from_value(value)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration (explicit path or default) and apply environment overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("NEWSRISK_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("NEWSRISK_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(dir) = lookup("NEWSRISK_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Some(key) = lookup("GNEWS_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.ingest.gnews.api_key = Some(key);
        }
        if let Some(token) = lookup("HF_API_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.classifier.zero_shot.api_token = Some(token);
        }
    }

    /// Resolve a configured data path.
    ///
    /// `~` is expanded; relative paths are joined onto `data_dir`.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
        if expanded.is_absolute() {
            return expanded;
        }
        PathBuf::from(shellexpand::tilde(&self.data_dir).as_ref()).join(expanded)
    }

    /// Path of the persisted tagged store.
    pub fn tagged_store_path(&self) -> PathBuf {
        self.resolve_path(&self.store.tagged_path)
    }

    /// Path of the merged intermediate file.
    pub fn merged_path(&self) -> PathBuf {
        self.resolve_path(&self.store.merged_path)
    }
}
