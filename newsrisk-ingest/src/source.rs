//! The ingestion adapter seam.

use async_trait::async_trait;
use newsrisk_core::RawArticle;

/// An adapter that collects raw articles for a vendor list.
///
/// Adapters handle their own transport errors: a failing query or feed is
/// logged and skipped, so `collect` only errors when nothing can be tried.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Source name, matching `sources[].name` in config.
    fn name(&self) -> &str;

    /// Column the adapter writes article bodies to.
    fn body_field(&self) -> &str;

    async fn collect(&self, vendors: &[String]) -> anyhow::Result<Vec<RawArticle>>;
}
