//! Article record types shared by every pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::VocabularyError;

/// Separator used when serializing tags into one field.
pub const TAG_SEPARATOR: &str = ", ";

/// A per-source article as produced by an ingestion adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    pub vendor: String,
    pub title: String,
    /// Body text; adapters name this column differently on disk.
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    /// Source-local timestamp, unparsed.
    #[serde(default)]
    pub published: Option<String>,
}

/// A merged article with a UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    pub vendor: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl CanonicalArticle {
    /// Text the classifier scores.
    pub fn text(&self) -> &str {
        &self.description
    }

    /// Natural deduplication key.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.url)
    }
}

// ============================================================================
// Label vocabulary
// ============================================================================

/// Ordered, validated risk label vocabulary.
///
/// Order is the serialization order of matched tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new<I, S>(labels: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() || label.trim() != label {
                return Err(VocabularyError::Blank(label.clone()));
            }
            if label.contains(',') {
                return Err(VocabularyError::Comma(label.clone()));
            }
            if !seen.insert(label.as_str()) {
                return Err(VocabularyError::Duplicate(label.clone()));
            }
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

// ============================================================================
// Risk tags
// ============================================================================

/// The set of labels assigned to one article, kept in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RiskTags(Vec<String>);

impl RiskTags {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from labels already in vocabulary order.
    pub fn from_ordered<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !tags.contains(&label) {
                tags.push(label);
            }
        }
        Self(tags)
    }

    /// Parse a stored `risk_tags` field. Blank pieces are ignored.
    pub fn parse_field(field: &str) -> Self {
        Self::from_ordered(
            field
                .split(',')
                .map(str::trim)
                .filter(|piece| !piece.is_empty()),
        )
    }

    /// Serialize as the comma-joined store field.
    pub fn to_field(&self) -> String {
        self.0.join(TAG_SEPARATOR)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|t| t == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True when any tag is in `set`.
    pub fn intersects(&self, set: &HashSet<String>) -> bool {
        self.0.iter().any(|t| set.contains(t))
    }
}

impl std::fmt::Display for RiskTags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_field())
    }
}

// ============================================================================
// Tagged article
// ============================================================================

/// A classified article. The review flag is always derived from the tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedArticle {
    pub article: CanonicalArticle,
    risk_tags: RiskTags,
}

impl TaggedArticle {
    pub fn new(article: CanonicalArticle, risk_tags: RiskTags) -> Self {
        Self { article, risk_tags }
    }

    /// Tag a record for review with no labels.
    pub fn needs_review(article: CanonicalArticle) -> Self {
        Self::new(article, RiskTags::empty())
    }

    pub fn risk_tags(&self) -> &RiskTags {
        &self.risk_tags
    }

    pub fn review_flag(&self) -> bool {
        self.risk_tags.is_empty()
    }

    pub fn vendor(&self) -> &str {
        &self.article.vendor
    }

    pub fn published(&self) -> DateTime<Utc> {
        self.article.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article() -> CanonicalArticle {
        CanonicalArticle {
            vendor: "Okta".into(),
            title: "Okta breach".into(),
            published: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            url: "https://example.com/a".into(),
            description: "details".into(),
        }
    }

    #[test]
    fn test_vocabulary_rejects_bad_labels() {
        assert_eq!(
            LabelVocabulary::new(Vec::<String>::new()),
            Err(VocabularyError::Empty)
        );
        assert_eq!(
            LabelVocabulary::new(["Data Breach", "Fines, Penalties"]),
            Err(VocabularyError::Comma("Fines, Penalties".into()))
        );
        assert_eq!(
            LabelVocabulary::new(["Lawsuit", "Lawsuit"]),
            Err(VocabularyError::Duplicate("Lawsuit".into()))
        );
        assert_eq!(
            LabelVocabulary::new([" Lawsuit"]),
            Err(VocabularyError::Blank(" Lawsuit".into()))
        );
    }

    #[test]
    fn test_tags_field_format() {
        let tags = RiskTags::from_ordered(["Data Breach", "Lawsuit"]);
        assert_eq!(tags.to_field(), "Data Breach, Lawsuit");
        assert_eq!(RiskTags::parse_field("Data Breach, Lawsuit"), tags);
        assert_eq!(RiskTags::parse_field("Data Breach,Lawsuit"), tags);
        assert!(RiskTags::parse_field("").is_empty());
        assert!(RiskTags::parse_field(" , ").is_empty());
    }

    #[test]
    fn test_review_flag_follows_tags() {
        let flagged = TaggedArticle::needs_review(article());
        assert!(flagged.review_flag());

        let tagged = TaggedArticle::new(article(), RiskTags::from_ordered(["Lawsuit"]));
        assert!(!tagged.review_flag());
    }

    #[test]
    fn test_intersects() {
        let tags = RiskTags::from_ordered(["Data Breach", "Lawsuit"]);
        let set: HashSet<String> = ["Lawsuit".to_string()].into_iter().collect();
        assert!(tags.intersects(&set));
        assert!(!RiskTags::empty().intersects(&set));
    }
}
