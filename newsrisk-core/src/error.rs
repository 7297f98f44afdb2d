//! Error types for the merge, classification and store stages.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A source could not be projected onto the canonical schema.
///
/// Fatal for that source only; the merger keeps going with the others.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("source '{source_name}' is missing required column(s): {}", .missing.join(", "))]
    MissingColumns {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("source '{source_name}' could not be read: {reason}")]
    Unreadable { source_name: String, reason: String },
}

impl SchemaError {
    /// Name of the source that failed.
    pub fn source_name(&self) -> &str {
        match self {
            Self::MissingColumns { source_name, .. } | Self::Unreadable { source_name, .. } => {
                source_name
            }
        }
    }
}

/// A scoring model call failed for one record.
///
/// Always recovered by the classifier: the record is tagged with the empty set.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("scoring model timed out after {0:?}")]
    Timeout(Duration),

    #[error("scoring request failed: {0}")]
    Request(String),

    #[error("scoring model returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("score {score} for label '{label}' is outside [0, 1]")]
    InvalidScore { label: String, score: f64 },
}

/// The label vocabulary is unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("label vocabulary is empty")]
    Empty,

    #[error("label {0:?} is blank or has surrounding whitespace")]
    Blank(String),

    #[error("label {0:?} contains a comma")]
    Comma(String),

    #[error("label {0:?} is listed twice")]
    Duplicate(String),
}

/// Reading or writing a tabular file failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is missing column(s): {}", .path.display(), .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_message_lists_columns() {
        let err = SchemaError::MissingColumns {
            source_name: "rss".into(),
            missing: vec!["url".into(), "content".into()],
        };
        assert_eq!(
            err.to_string(),
            "source 'rss' is missing required column(s): url, content"
        );
        assert_eq!(err.source_name(), "rss");
    }

    #[test]
    fn test_store_error_mentions_path() {
        let err = StoreError::MissingColumns {
            path: PathBuf::from("data/tagged.csv"),
            missing: vec!["risk_tags".into()],
        };
        assert!(err.to_string().contains("data/tagged.csv"));
        assert!(err.to_string().contains("risk_tags"));
    }
}
