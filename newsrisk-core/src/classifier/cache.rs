//! Memoizing decorator for scoring models.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LabelScores, ScoringModel};
use crate::error::ClassifyError;
use crate::model::LabelVocabulary;

/// Bounded FIFO cache of scores keyed by label set and text.
struct ScoreCache {
    entries: HashMap<String, LabelScores>,
    order: VecDeque<String>,
    max_size: usize,
}

impl ScoreCache {
    fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    fn get(&self, key: &str) -> Option<&LabelScores> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: String, scores: LabelScores) {
        if self.entries.contains_key(&key) {
            return;
        }
        while self.order.len() >= self.max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.entries.insert(key.clone(), scores);
        self.order.push_back(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cache_key(text: &str, labels: &LabelVocabulary) -> String {
    // Labels cannot contain commas, and a newline separates them from the text.
    format!("{}\n{}", labels.labels().join(","), text)
}

/// Wraps a model so repeated texts are scored once. Failures are not cached.
pub struct CachedModel<M> {
    inner: M,
    cache: RwLock<ScoreCache>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<M: ScoringModel> CachedModel<M> {
    pub fn new(inner: M, capacity: usize) -> Self {
        Self {
            inner,
            cache: RwLock::new(ScoreCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl<M: ScoringModel> ScoringModel for CachedModel<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn score(
        &self,
        text: &str,
        labels: &LabelVocabulary,
    ) -> Result<LabelScores, ClassifyError> {
        let key = cache_key(text, labels);
        if let Some(cached) = self.cache.read().await.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let scores = self.inner.score(text, labels).await?;
        self.cache.write().await.insert(key, scores.clone());
        Ok(scores)
    }
}
