//! Query/filter engine over the tagged store.
//!
//! Dimensions combine with AND; inside the tag dimension any overlap
//! matches. Output always keeps store order.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::TaggedArticle;

/// Article filter. Empty sets and `None` mean no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub vendors: HashSet<String>,
    pub tags: HashSet<String>,
    pub min_published: Option<DateTime<Utc>>,
    pub review_only: bool,
}

impl ArticleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vendors<I, S>(mut self, vendors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendors.extend(vendors.into_iter().map(Into::into));
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn since(mut self, min_published: DateTime<Utc>) -> Self {
        self.min_published = Some(min_published);
        self
    }

    /// Keep the last `days` days relative to `now`.
    pub fn lookback(self, days: u32, now: DateTime<Utc>) -> Self {
        self.since(now - Duration::days(i64::from(days)))
    }

    pub fn review_only(mut self, review_only: bool) -> Self {
        self.review_only = review_only;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
            && self.tags.is_empty()
            && self.min_published.is_none()
            && !self.review_only
    }

    pub fn matches(&self, article: &TaggedArticle) -> bool {
        if !self.vendors.is_empty() && !self.vendors.contains(article.vendor()) {
            return false;
        }
        if let Some(min) = self.min_published {
            if article.published() < min {
                return false;
            }
        }
        if !self.tags.is_empty() && !article.risk_tags().intersects(&self.tags) {
            return false;
        }
        if self.review_only && !article.review_flag() {
            return false;
        }
        true
    }

    /// Matching records, in store order.
    pub fn apply<'a>(&self, articles: &'a [TaggedArticle]) -> Vec<&'a TaggedArticle> {
        articles.iter().filter(|a| self.matches(a)).collect()
    }

    /// Owned copy of the matching records, in store order.
    pub fn apply_cloned(&self, articles: &[TaggedArticle]) -> Vec<TaggedArticle> {
        articles.iter().filter(|a| self.matches(a)).cloned().collect()
    }
}

/// Distinct filter values present in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub vendors: Vec<String>,
    pub tags: Vec<String>,
    /// Records per tag, plus `review` for flagged records
    pub counts: BTreeMap<String, usize>,
}

/// Sorted distinct vendors.
pub fn vendor_facets(articles: &[TaggedArticle]) -> Vec<String> {
    let mut vendors: Vec<String> = articles
        .iter()
        .map(|a| a.vendor().to_string())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    vendors.sort();
    vendors
}

/// Sorted distinct tags.
pub fn tag_facets(articles: &[TaggedArticle]) -> Vec<String> {
    let mut tags: Vec<String> = articles
        .iter()
        .flat_map(|a| a.risk_tags().iter())
        .map(str::to_string)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    tags.sort();
    tags
}

pub fn facets(articles: &[TaggedArticle]) -> Facets {
    let mut counts = BTreeMap::new();
    for article in articles {
        for tag in article.risk_tags().iter() {
            *counts.entry(tag.to_string()).or_insert(0) += 1;
        }
        if article.review_flag() {
            *counts.entry("review".to_string()).or_insert(0) += 1;
        }
    }
    Facets {
        vendors: vendor_facets(articles),
        tags: tag_facets(articles),
        counts,
    }
}
