//! Tagged store: CSV persistence for classified articles.
//!
//! Every write replaces the whole file atomically (temp file in the same
//! directory, fsync, rename), so a failed write leaves the previous store
//! intact. Readers get an explicit [`StoreCache`] with a refresh lifecycle.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{CanonicalArticle, RiskTags, TaggedArticle};
use crate::table::Table;
use crate::timestamp::{format_published, parse_published};

/// Column order of the persisted store.
pub const STORE_COLUMNS: &[&str] = &[
    "vendor",
    "title",
    "published",
    "url",
    "description",
    "risk_tags",
    "review_flag",
];

/// Column order of the merged (untagged) file.
pub const CANONICAL_COLUMNS: &[&str] = &["vendor", "title", "published", "url", "description"];

/// One store row as written to disk and returned by the dashboard API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRow {
    pub vendor: String,
    pub title: String,
    pub published: String,
    pub url: String,
    pub description: String,
    pub risk_tags: String,
    pub review_flag: bool,
}

impl From<&TaggedArticle> for StoreRow {
    fn from(tagged: &TaggedArticle) -> Self {
        let article = &tagged.article;
        Self {
            vendor: article.vendor.clone(),
            title: article.title.clone(),
            published: format_published(&article.published),
            url: article.url.clone(),
            description: article.description.clone(),
            risk_tags: tagged.risk_tags().to_field(),
            review_flag: tagged.review_flag(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CanonicalRow<'a> {
    vendor: &'a str,
    title: &'a str,
    published: String,
    url: &'a str,
    description: &'a str,
}

impl<'a> From<&'a CanonicalArticle> for CanonicalRow<'a> {
    fn from(article: &'a CanonicalArticle) -> Self {
        Self {
            vendor: &article.vendor,
            title: &article.title,
            published: format_published(&article.published),
            url: &article.url,
            description: &article.description,
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Replace `path` with whatever `write` produces, or leave it untouched on error.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), StoreError>,
{
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer.flush().map_err(write_err)?;
    }
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Serialize rows as CSV with a header.
pub fn write_rows<W, T, I>(writer: W, rows: I) -> Result<(), StoreError>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the header only, used when there is nothing to serialize.
fn write_header<W: Write>(writer: W, columns: &[&str]) -> Result<(), StoreError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(columns)?;
    csv_writer.flush()?;
    Ok(())
}

/// Export tagged articles in the store schema.
pub fn export_csv<W: Write>(writer: W, articles: &[TaggedArticle]) -> Result<(), StoreError> {
    if articles.is_empty() {
        return write_header(writer, STORE_COLUMNS);
    }
    write_rows(writer, articles.iter().map(StoreRow::from))
}

/// Overwrite the tagged store.
pub fn write_store(path: &Path, articles: &[TaggedArticle]) -> Result<(), StoreError> {
    write_atomic(path, |w| export_csv(w, articles))?;
    tracing::info!(path = %path.display(), records = articles.len(), "Tagged store written");
    Ok(())
}

/// Overwrite the merged (untagged) file.
pub fn write_canonical(path: &Path, articles: &[CanonicalArticle]) -> Result<(), StoreError> {
    write_atomic(path, |w| {
        if articles.is_empty() {
            write_header(w, CANONICAL_COLUMNS)
        } else {
            write_rows(w, articles.iter().map(CanonicalRow::from))
        }
    })?;
    tracing::info!(path = %path.display(), records = articles.len(), "Merged records written");
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

/// Records read back from a store file.
#[derive(Debug, Clone, Default)]
pub struct StoreContents {
    pub articles: Vec<TaggedArticle>,
    /// Rows skipped because `published` did not parse
    pub dropped: usize,
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// Read a store from any reader. `origin` names it in errors.
pub fn read_store_from<R: Read>(reader: R, origin: &Path) -> Result<StoreContents, StoreError> {
    let table = Table::from_reader(reader)?;
    let missing = table.missing_columns(STORE_COLUMNS);
    if !missing.is_empty() {
        return Err(StoreError::MissingColumns {
            path: origin.to_path_buf(),
            missing: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let mut contents = StoreContents::default();
    for row in table.rows() {
        let Some(published) = row.get("published").and_then(parse_published) else {
            contents.dropped += 1;
            continue;
        };
        let article = CanonicalArticle {
            vendor: row.get("vendor").unwrap_or_default().to_string(),
            title: row.get("title").unwrap_or_default().to_string(),
            published,
            url: row.get("url").unwrap_or_default().to_string(),
            description: row.get("description").unwrap_or_default().to_string(),
        };
        let tags = RiskTags::parse_field(row.get("risk_tags").unwrap_or_default());
        let tagged = TaggedArticle::new(article, tags);

        // The flag is always re-derived from the tags.
        let stored_flag = row.get("review_flag").and_then(parse_bool);
        if stored_flag.is_some_and(|flag| flag != tagged.review_flag()) {
            tracing::warn!(
                url = %tagged.article.url,
                "Stored review_flag disagrees with risk_tags; using risk_tags"
            );
        }
        contents.articles.push(tagged);
    }

    if contents.dropped > 0 {
        tracing::warn!(
            path = %origin.display(),
            dropped = contents.dropped,
            "Skipped store rows with unparseable timestamps"
        );
    }
    Ok(contents)
}

/// Read the store at `path`.
pub fn read_store(path: &Path) -> Result<StoreContents, StoreError> {
    let file = std::fs::File::open(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    read_store_from(std::io::BufReader::new(file), path)
}

// ============================================================================
// Cache
// ============================================================================

/// A loaded copy of the store.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub articles: Arc<Vec<TaggedArticle>>,
    pub loaded_at: DateTime<Utc>,
    loaded_instant: Instant,
    modified: Option<SystemTime>,
}

/// Read-side cache of the tagged store with explicit load and refresh.
///
/// `load` serves the cached copy until it is older than `max_age` or the
/// file's modification time changes.
pub struct StoreCache {
    path: PathBuf,
    max_age: Duration,
    state: RwLock<Option<StoreSnapshot>>,
}

impl StoreCache {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
            state: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot, reloading first if missing or stale.
    pub async fn load(&self) -> Result<StoreSnapshot, StoreError> {
        {
            let state = self.state.read().await;
            if let Some(snapshot) = state.as_ref() {
                if !self.is_stale(snapshot).await {
                    return Ok(snapshot.clone());
                }
            }
        }
        self.refresh().await
    }

    /// Reload from disk unconditionally.
    pub async fn refresh(&self) -> Result<StoreSnapshot, StoreError> {
        let path = self.path.clone();
        let (contents, modified) = tokio::task::spawn_blocking(move || {
            let modified = file_modified(&path);
            read_store(&path).map(|contents| (contents, modified))
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        let snapshot = StoreSnapshot {
            articles: Arc::new(contents.articles),
            loaded_at: Utc::now(),
            loaded_instant: Instant::now(),
            modified,
        };
        tracing::info!(
            path = %self.path.display(),
            records = snapshot.articles.len(),
            "Store loaded"
        );
        *self.state.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Time of the last successful load.
    pub async fn last_loaded(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.as_ref().map(|s| s.loaded_at)
    }

    async fn is_stale(&self, snapshot: &StoreSnapshot) -> bool {
        if snapshot.loaded_instant.elapsed() >= self.max_age {
            return true;
        }
        let path = self.path.clone();
        let current = tokio::task::spawn_blocking(move || file_modified(&path))
            .await
            .ok()
            .flatten();
        current != snapshot.modified
    }
}

fn file_modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
