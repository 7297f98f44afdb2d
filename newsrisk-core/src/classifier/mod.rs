//! Multi-label risk classifier.
//!
//! The classifier owns the decision policy (empty-text short-circuit,
//! inclusive threshold, vocabulary-ordered output, failure fallback). The
//! scores themselves come from a pluggable [`ScoringModel`].

pub mod cache;
pub mod keyword;
pub mod zero_shot;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use newsrisk_common::{ClassifierBackend, ClassifierConfig};
use serde::Serialize;

use crate::error::{ClassifyError, VocabularyError};
use crate::model::{CanonicalArticle, LabelVocabulary, RiskTags, TaggedArticle};

pub use cache::CachedModel;
pub use keyword::KeywordModel;
pub use zero_shot::ZeroShotModel;

/// Independent per-label confidence scores.
pub type LabelScores = HashMap<String, f64>;

/// A multi-label scoring capability: text and labels in, one score per label out.
///
/// Scores are independent (they need not sum to 1). Labels the model leaves
/// out are treated as 0.0.
#[async_trait]
pub trait ScoringModel: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn score(&self, text: &str, labels: &LabelVocabulary)
        -> Result<LabelScores, ClassifyError>;
}

#[async_trait]
impl<M: ScoringModel + ?Sized> ScoringModel for Arc<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn score(
        &self,
        text: &str,
        labels: &LabelVocabulary,
    ) -> Result<LabelScores, ClassifyError> {
        (**self).score(text, labels).await
    }
}

/// Check model output before the threshold is applied.
///
/// Every score must be a finite number in [0, 1], and at least one
/// vocabulary label must be present.
pub fn validate_scores(
    scores: &LabelScores,
    labels: &LabelVocabulary,
) -> Result<(), ClassifyError> {
    for (label, score) in scores {
        if !score.is_finite() || !(0.0..=1.0).contains(score) {
            return Err(ClassifyError::InvalidScore {
                label: label.clone(),
                score: *score,
            });
        }
    }
    if !labels.iter().any(|l| scores.contains_key(l)) {
        return Err(ClassifyError::InvalidResponse(
            "no scores for any known label".into(),
        ));
    }
    Ok(())
}

/// Labels scoring at or above `threshold`, in vocabulary order.
pub fn select_labels(scores: &LabelScores, labels: &LabelVocabulary, threshold: f64) -> RiskTags {
    RiskTags::from_ordered(
        labels
            .iter()
            .filter(|label| scores.get(*label).copied().unwrap_or(0.0) >= threshold),
    )
}

// ============================================================================
// Outcomes
// ============================================================================

/// How one record ended up with its tags.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    /// At least one label cleared the threshold
    Tagged,
    /// Scores were valid but none cleared the threshold
    NoMatch,
    /// Text was empty; the model was not called
    EmptyText,
    /// The model failed; the record is flagged for review
    Failed(ClassifyError),
}

impl ClassificationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome tallies for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationStats {
    pub total: usize,
    pub tagged: usize,
    pub no_match: usize,
    pub empty_text: usize,
    pub failed: usize,
}

impl ClassificationStats {
    fn record(&mut self, outcome: &ClassificationOutcome) {
        self.total += 1;
        match outcome {
            ClassificationOutcome::Tagged => self.tagged += 1,
            ClassificationOutcome::NoMatch => self.no_match += 1,
            ClassificationOutcome::EmptyText => self.empty_text += 1,
            ClassificationOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Records with the review flag set, for any reason.
    pub fn flagged(&self) -> usize {
        self.no_match + self.empty_text + self.failed
    }
}

/// A classified batch in input order.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub articles: Vec<TaggedArticle>,
    pub stats: ClassificationStats,
}

// ============================================================================
// Classifier
// ============================================================================

/// Applies the tagging policy over a scoring model.
pub struct RiskClassifier {
    model: Arc<dyn ScoringModel>,
    labels: LabelVocabulary,
    threshold: f64,
    timeout: Duration,
    concurrency: usize,
}

impl RiskClassifier {
    /// Defaults: threshold 0.5, 30 s per-call timeout, 4 calls in flight.
    pub fn new(model: Arc<dyn ScoringModel>, labels: LabelVocabulary) -> Self {
        Self {
            model,
            labels,
            threshold: 0.5,
            timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Classify one record. Never fails; failures are reported in the outcome.
    pub async fn classify(
        &self,
        article: CanonicalArticle,
    ) -> (TaggedArticle, ClassificationOutcome) {
        let text = article.text().trim();
        if text.is_empty() {
            return (TaggedArticle::needs_review(article), ClassificationOutcome::EmptyText);
        }

        let scoring = self.model.score(text, &self.labels);
        let scored = match tokio::time::timeout(self.timeout, scoring).await {
            Ok(result) => result,
            Err(_) => Err(ClassifyError::Timeout(self.timeout)),
        };
        let scored = scored.and_then(|scores| {
            validate_scores(&scores, &self.labels)?;
            Ok(scores)
        });

        match scored {
            Ok(scores) => {
                let tags = select_labels(&scores, &self.labels, self.threshold);
                let outcome = if tags.is_empty() {
                    ClassificationOutcome::NoMatch
                } else {
                    ClassificationOutcome::Tagged
                };
                (TaggedArticle::new(article, tags), outcome)
            }
            Err(e) => {
                tracing::warn!(
                    model = %self.model.name(),
                    url = %article.url,
                    error = %e,
                    "Classification failed, flagging for review"
                );
                (TaggedArticle::needs_review(article), ClassificationOutcome::Failed(e))
            }
        }
    }

    /// Classify a batch with bounded concurrency. Output keeps input order.
    pub async fn classify_batch(&self, articles: Vec<CanonicalArticle>) -> ClassifiedBatch {
        let results: Vec<(TaggedArticle, ClassificationOutcome)> = stream::iter(articles)
            .map(|article| self.classify(article))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut batch = ClassifiedBatch {
            articles: Vec::with_capacity(results.len()),
            stats: ClassificationStats::default(),
        };
        for (tagged, outcome) in results {
            batch.stats.record(&outcome);
            batch.articles.push(tagged);
        }

        tracing::info!(
            model = %self.model.name(),
            total = batch.stats.total,
            tagged = batch.stats.tagged,
            no_match = batch.stats.no_match,
            empty_text = batch.stats.empty_text,
            failed = batch.stats.failed,
            "Classification complete"
        );
        batch
    }
}

/// Build the scoring model selected in config.
pub fn build_model(config: &ClassifierConfig) -> anyhow::Result<Arc<dyn ScoringModel>> {
    let model: Arc<dyn ScoringModel> = match config.backend {
        ClassifierBackend::Keyword => Arc::new(KeywordModel::from_config(config)?),
        ClassifierBackend::ZeroShot => {
            let remote = ZeroShotModel::from_config(&config.zero_shot, config.timeout_secs)?;
            if config.cache_capacity > 0 {
                Arc::new(CachedModel::new(remote, config.cache_capacity))
            } else {
                Arc::new(remote)
            }
        }
    };
    Ok(model)
}

/// Build a classifier from config.
pub fn build_classifier(config: &ClassifierConfig) -> anyhow::Result<RiskClassifier> {
    let labels = vocabulary_from_config(config)?;
    let model = build_model(config)?;
    tracing::debug!(backend = %config.backend, labels = labels.len(), "Classifier ready");
    Ok(RiskClassifier::new(model, labels)
        .with_threshold(config.threshold)
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_concurrency(config.concurrency))
}

pub fn vocabulary_from_config(
    config: &ClassifierConfig,
) -> Result<LabelVocabulary, VocabularyError> {
    LabelVocabulary::new(config.labels.iter().cloned())
}
