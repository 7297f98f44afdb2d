//! Configuration validation.
//!
//! Catches values that would silently break the pipeline: a threshold outside
//! `[0, 1]`, labels that cannot round-trip through the comma-joined tag column,
//! or a zero-sized worker pool.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::{ClassifierConfig, Config, DashboardConfig, GNewsConfig, SourceConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.classifier.validate() {
            errors.push(e);
        }
        if let Err(e) = self.dashboard.validate() {
            errors.push(e);
        }
        if let Err(e) = self.ingest.gnews.validate() {
            errors.push(e);
        }
        if let Err(e) = self.sources.as_slice().validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load (with environment overrides) and validate configuration.
    pub fn load_and_validate(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let config = Self::load_with_env(path)?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ClassifierConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.labels.is_empty() {
            return Err(ValidationError::MissingField {
                field: "classifier.labels".into(),
            });
        }

        let mut seen = HashSet::new();
        for label in &self.labels {
            if label.trim().is_empty() || label.trim() != label {
                return Err(ValidationError::InvalidValue {
                    field: "classifier.labels".into(),
                    reason: format!(
                        "label {label:?} must be non-empty without surrounding whitespace"
                    ),
                });
            }
            if label.contains(',') {
                return Err(ValidationError::InvalidValue {
                    field: "classifier.labels".into(),
                    reason: format!("label {label:?} must not contain a comma"),
                });
            }
            if !seen.insert(label.as_str()) {
                return Err(ValidationError::Conflict {
                    reason: format!("label {label:?} appears more than once"),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ValidationError::InvalidValue {
                field: "classifier.threshold".into(),
                reason: format!("{} is outside [0, 1]", self.threshold),
            });
        }

        if self.concurrency == 0 {
            return Err(ValidationError::InvalidValue {
                field: "classifier.concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "classifier.timeout_secs".into(),
                reason: "must be at least 1 second".into(),
            });
        }

        for label in self.keywords.keys() {
            if !self.labels.contains(label) {
                return Err(ValidationError::InvalidValue {
                    field: "classifier.keywords".into(),
                    reason: format!("{label:?} is not in classifier.labels"),
                });
            }
        }

        Ok(())
    }
}

impl Validate for DashboardConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !(1..=30).contains(&self.default_lookback_days) {
            return Err(ValidationError::InvalidValue {
                field: "dashboard.default_lookback_days".into(),
                reason: "must be between 1 and 30".into(),
            });
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidValue {
                field: "dashboard.port".into(),
                reason: "must be between 1 and 65535".into(),
            });
        }
        Ok(())
    }
}

impl Validate for GNewsConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.keywords_per_batch == 0 {
            return Err(ValidationError::InvalidValue {
                field: "ingest.gnews.keywords_per_batch".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.days_back == 0 {
            return Err(ValidationError::InvalidValue {
                field: "ingest.gnews.days_back".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Validate for [SourceConfig] {
    fn validate(&self) -> ValidationResult<()> {
        let mut names = HashSet::new();
        for source in self {
            if source.body_field.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    field: format!("sources.{}.body_field", source.name),
                });
            }
            if !names.insert(source.name.as_str()) {
                return Err(ValidationError::Conflict {
                    reason: format!("source name {:?} is used twice", source.name),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_label_with_comma_rejected() {
        let mut config = ClassifierConfig::default();
        config.labels.push("Fraud, Theft".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("comma"));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut config = ClassifierConfig::default();
        config.labels.push("Lawsuit".into());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Conflict { .. })
        ));
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = ClassifierConfig::default();
        config.threshold = 1.0;
        assert!(config.validate().is_ok());
        config.threshold = 1.01;
        assert!(config.validate().is_err());
        config.threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_keyword_override_for_unknown_label() {
        let mut config = ClassifierConfig::default();
        config
            .keywords
            .insert("Insider Trading".into(), vec!["insider".into()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiple_errors_aggregate() {
        let mut config = Config::default();
        config.classifier.concurrency = 0;
        config.dashboard.default_lookback_days = 90;
        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_source_names() {
        let mut config = Config::default();
        config.sources[1].name = "gnews".into();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Conflict { .. })
        ));
    }
}
