//! HTTP zero-shot scoring model.
//!
//! Speaks the Hugging Face inference API:
//! `POST {endpoint}/models/{model}` with
//! `{"inputs": text, "parameters": {"candidate_labels": [...], "multi_label": true}}`,
//! answered by `{"labels": [...], "scores": [...]}` (sometimes wrapped in an array).

use std::time::Duration;

use async_trait::async_trait;
use newsrisk_common::util::{sanitize_for_log, truncate_with_ellipsis};
use newsrisk_common::ZeroShotConfig;
use serde::{Deserialize, Serialize};

use super::{LabelScores, ScoringModel};
use crate::error::ClassifyError;
use crate::model::LabelVocabulary;

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
}

#[derive(Debug, Deserialize)]
struct ZeroShotOutput {
    labels: Vec<String>,
    scores: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Single(ZeroShotOutput),
    Batch(Vec<ZeroShotOutput>),
}

impl ZeroShotResponse {
    fn into_output(self) -> Option<ZeroShotOutput> {
        match self {
            Self::Single(output) => Some(output),
            Self::Batch(outputs) => outputs.into_iter().next(),
        }
    }
}

/// Remote zero-shot classifier.
pub struct ZeroShotModel {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
    model: String,
}

impl ZeroShotModel {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("newsrisk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/models/{}", endpoint.trim_end_matches('/'), model),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &ZeroShotConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        if config.api_token.is_none() {
            tracing::warn!("No zero-shot API token configured; requests will be anonymous");
        }
        Self::new(
            &config.endpoint,
            &config.model,
            config.api_token.clone(),
            Duration::from_secs(timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn output_to_scores(output: ZeroShotOutput) -> Result<LabelScores, ClassifyError> {
    if output.labels.len() != output.scores.len() {
        return Err(ClassifyError::InvalidResponse(format!(
            "{} labels but {} scores",
            output.labels.len(),
            output.scores.len()
        )));
    }
    Ok(output.labels.into_iter().zip(output.scores).collect())
}

#[async_trait]
impl ScoringModel for ZeroShotModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn score(
        &self,
        text: &str,
        labels: &LabelVocabulary,
    ) -> Result<LabelScores, ClassifyError> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels.labels(),
                multi_label: true,
            },
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClassifyError::Request(sanitize_for_log(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Request(format!(
                "HTTP {}: {}",
                status,
                truncate_with_ellipsis(&body, 200)
            )));
        }

        let parsed: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse(e.to_string()))?;
        let output = parsed
            .into_output()
            .ok_or_else(|| ClassifyError::InvalidResponse("empty response array".into()))?;
        output_to_scores(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_endpoint_and_model() {
        let model = ZeroShotModel::new(
            "https://api-inference.huggingface.co/",
            "facebook/bart-large-mnli",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            model.url(),
            "https://api-inference.huggingface.co/models/facebook/bart-large-mnli"
        );
        assert_eq!(model.name(), "facebook/bart-large-mnli");
    }

    #[test]
    fn test_response_shapes() {
        let single: ZeroShotResponse =
            serde_json::from_str(r#"{"sequence":"x","labels":["A","B"],"scores":[0.9,0.1]}"#)
                .unwrap();
        let scores = output_to_scores(single.into_output().unwrap()).unwrap();
        assert_eq!(scores["A"], 0.9);

        let batch: ZeroShotResponse =
            serde_json::from_str(r#"[{"labels":["B"],"scores":[0.4]}]"#).unwrap();
        let scores = output_to_scores(batch.into_output().unwrap()).unwrap();
        assert_eq!(scores["B"], 0.4);

        let empty: ZeroShotResponse = serde_json::from_str("[]").unwrap();
        assert!(empty.into_output().is_none());
    }

    #[test]
    fn test_mismatched_lengths_are_invalid() {
        let output = ZeroShotOutput {
            labels: vec!["A".into(), "B".into()],
            scores: vec![0.5],
        };
        assert!(matches!(
            output_to_scores(output),
            Err(ClassifyError::InvalidResponse(_))
        ));
    }
}
