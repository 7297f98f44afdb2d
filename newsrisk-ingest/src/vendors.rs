//! Vendor list loading.

use std::path::Path;

use anyhow::{bail, Context, Result};
use newsrisk_common::Config;
use newsrisk_core::Table;

/// Read vendors from a CSV with a `vendor` column. Blank cells are dropped.
pub fn load_vendor_file(path: &Path) -> Result<Vec<String>> {
    let table = Table::from_path(path)
        .with_context(|| format!("Failed to read vendor file {}", path.display()))?;
    if table.column_index("vendor").is_none() {
        bail!("{} has no 'vendor' column", path.display());
    }
    Ok(table
        .rows()
        .filter_map(|row| row.get_non_blank("vendor"))
        .map(|v| v.trim().to_string())
        .collect())
}

/// Vendors to monitor: the configured vendor file, or the inline list.
pub fn load_vendors(config: &Config) -> Result<Vec<String>> {
    let vendors = match &config.ingest.vendors_path {
        Some(raw) => load_vendor_file(&config.resolve_path(raw))?,
        None => config.ingest.vendors.clone(),
    };
    if vendors.is_empty() {
        bail!("No vendors configured");
    }
    tracing::debug!(vendors = vendors.len(), "Vendors loaded");
    Ok(vendors)
}
