//! Rule-based scoring model.
//!
//! Each label has a keyword list; a case-insensitive whole-word hit scores
//! the label 1.0, otherwise 0.0. Deterministic and offline.

use std::collections::HashMap;

use async_trait::async_trait;
use newsrisk_common::ClassifierConfig;
use regex::Regex;

use super::{LabelScores, ScoringModel};
use crate::error::ClassifyError;
use crate::model::LabelVocabulary;

/// Built-in keywords for the default vocabulary.
pub const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Data Breach",
        &[
            "data breach",
            "breach",
            "breached",
            "data leak",
            "leaked",
            "exposed data",
            "stolen data",
            "credentials stolen",
            "unauthorized access",
        ],
    ),
    (
        "Ransomware Attack",
        &["ransomware", "ransom demand", "encrypted files", "lockbit", "extortion"],
    ),
    (
        "Compliance Violation",
        &[
            "compliance violation",
            "compliance failure",
            "non-compliance",
            "violated",
            "gdpr violation",
            "hipaa violation",
            "misconduct",
        ],
    ),
    (
        "Lawsuit",
        &["lawsuit", "sued", "sues", "class action", "litigation", "court filing"],
    ),
    (
        "Regulatory Fine",
        &["fine", "fined", "penalty", "penalized", "settlement", "regulator"],
    ),
    (
        "System Outage",
        &["outage", "downtime", "service disruption", "went down", "unavailable"],
    ),
    (
        "Malware Attack",
        &["malware", "trojan", "spyware", "backdoor", "infostealer", "botnet"],
    ),
    (
        "DDoS Incident",
        &["ddos", "denial of service", "denial-of-service", "traffic flood"],
    ),
];

/// Keyword matcher with one compiled pattern per label.
pub struct KeywordModel {
    patterns: HashMap<String, Regex>,
}

impl KeywordModel {
    /// Compile patterns for the given `(label, keywords)` pairs.
    /// Labels with no keywords never match.
    pub fn new<'a, I, K>(table: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (&'a str, K)>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let mut patterns = HashMap::new();
        for (label, keywords) in table {
            let alternatives: Vec<String> = keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_string())
                .filter(|k| !k.is_empty())
                .map(|k| keyword_pattern(&k))
                .collect();
            if alternatives.is_empty() {
                continue;
            }
            let pattern = format!("(?i)(?:{})", alternatives.join("|"));
            patterns.insert(label.to_string(), Regex::new(&pattern)?);
        }
        Ok(Self { patterns })
    }

    /// Patterns for every configured label.
    ///
    /// Config overrides win; otherwise the built-in table is used; a label
    /// with neither matches its own name.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, regex::Error> {
        let table: Vec<(&str, Vec<String>)> = config
            .labels
            .iter()
            .map(|label| {
                let keywords = match config.keywords.get(label) {
                    Some(overrides) => overrides.clone(),
                    None => default_keywords_for(label)
                        .map(|kws| kws.iter().map(|k| (*k).to_string()).collect())
                        .unwrap_or_else(|| vec![label.clone()]),
                };
                (label.as_str(), keywords)
            })
            .collect();
        Self::new(table)
    }

    pub fn has_pattern(&self, label: &str) -> bool {
        self.patterns.contains_key(label)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-token pattern for one keyword. `\b` only holds next to a word
/// character, so edges like the `+` in `c++` need an explicit separator.
fn keyword_pattern(keyword: &str) -> String {
    let starts_word = keyword.chars().next().is_some_and(is_word_char);
    let ends_word = keyword.chars().next_back().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { r"(?:^|\W)" },
        regex::escape(keyword),
        if ends_word { r"\b" } else { r"(?:\W|$)" },
    )
}

fn default_keywords_for(label: &str) -> Option<&'static [&'static str]> {
    DEFAULT_KEYWORDS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, keywords)| *keywords)
}

#[async_trait]
impl ScoringModel for KeywordModel {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn score(
        &self,
        text: &str,
        labels: &LabelVocabulary,
    ) -> Result<LabelScores, ClassifyError> {
        Ok(labels
            .iter()
            .map(|label| {
                let hit = self
                    .patterns
                    .get(label)
                    .is_some_and(|re| re.is_match(text));
                (label.to_string(), if hit { 1.0 } else { 0.0 })
            })
            .collect())
    }
}
