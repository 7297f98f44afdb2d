//! Newsrisk Common - Shared configuration, errors and logging for the newsrisk pipeline.
//!
//! This crate provides:
//! - Configuration types and loading (with a layered secrets file)
//! - Configuration validation
//! - The dashboard error type
//! - Logging setup and per-run metrics
//! - Utility functions used across the newsrisk crates

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    ClassifierBackend, ClassifierConfig, Config, DashboardConfig, FeedConfig, GNewsConfig,
    IngestConfig, ObservabilityConfig, RssConfig, SourceConfig, StoreConfig, ZeroShotConfig,
    DEFAULT_RISK_LABELS,
};
pub use error::Error;
pub use validation::{Validate, ValidationError, ValidationResult};
