//! Raw per-source CSV output.

use std::path::Path;

use newsrisk_core::{write_atomic, RawArticle, StoreError};

/// Write adapter output with the adapter's own body column name.
///
/// Columns: `vendor, title, published, url, <body_field>`.
pub fn write_raw(path: &Path, body_field: &str, articles: &[RawArticle]) -> Result<(), StoreError> {
    write_atomic(path, |w| {
        let mut writer = csv::Writer::from_writer(w);
        writer.write_record(["vendor", "title", "published", "url", body_field])?;
        for article in articles {
            writer.write_record([
                article.vendor.as_str(),
                article.title.as_str(),
                article.published.as_deref().unwrap_or_default(),
                article.url.as_str(),
                article.description.as_deref().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    })?;
    tracing::info!(path = %path.display(), records = articles.len(), "Raw articles written");
    Ok(())
}
