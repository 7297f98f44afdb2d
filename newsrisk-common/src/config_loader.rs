//! Layered configuration loader.
//!
//! A config file may be accompanied by a `secrets.json` in the same directory:
//!
//! ```json
//! { "gnews_api_key": "...", "hf_api_token": "..." }
//! ```
//!
//! Secrets are merged into the matching config sections before deserialization,
//! so credentials never need to live in the main config file.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Name of the optional credentials file next to the config file.
pub const SECRETS_FILE: &str = "secrets.json";

/// Load a JSON file and return its contents as a Value.
/// Returns None if file doesn't exist.
fn load_json_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Deep merge two JSON values.
/// Source values override target values, with object merging at each level.
fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_value) => merge_json(target_value, source_value),
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Map the flat secrets file onto the nested config layout.
fn secrets_overlay(secrets: &Value) -> Value {
    let mut overlay = json!({});
    if let Some(key) = secrets.get("gnews_api_key").and_then(Value::as_str) {
        merge_json(&mut overlay, json!({ "ingest": { "gnews": { "api_key": key } } }));
    }
    if let Some(token) = secrets.get("hf_api_token").and_then(Value::as_str) {
        merge_json(
            &mut overlay,
            json!({ "classifier": { "zero_shot": { "api_token": token } } }),
        );
    }
    overlay
}

/// Load `path` and merge the sibling secrets file, if any.
///
/// The config file itself must exist; the secrets file is optional.
pub fn load_layered_config(path: &Path) -> Result<Value> {
    let mut config = load_json_file(path)?
        .with_context(|| format!("Config file {} does not exist", path.display()))?;

    let secrets_path = path
        .parent()
        .map(|dir| dir.join(SECRETS_FILE))
        .unwrap_or_else(|| Path::new(SECRETS_FILE).to_path_buf());

    if let Some(secrets) = load_json_file(&secrets_path)? {
        merge_json(&mut config, secrets_overlay(&secrets));
        tracing::debug!(path = %secrets_path.display(), "Loaded secrets file");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_json_objects() {
        let mut target = json!({
            "a": 1,
            "b": { "x": 10, "y": 20 }
        });
        let source = json!({
            "b": { "y": 25, "z": 30 },
            "c": 3
        });

        merge_json(&mut target, source);

        assert_eq!(target["a"], 1);
        assert_eq!(target["b"]["x"], 10);
        assert_eq!(target["b"]["y"], 25);
        assert_eq!(target["b"]["z"], 30);
        assert_eq!(target["c"], 3);
    }

    #[test]
    fn test_merge_json_overwrite_non_object() {
        let mut target = json!({ "a": [1, 2, 3] });
        merge_json(&mut target, json!({ "a": [4, 5] }));
        assert_eq!(target["a"], json!([4, 5]));
    }

    #[test]
    fn test_secrets_are_layered_into_sections() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{"ingest": {"gnews": {"days_back": 2}}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(SECRETS_FILE),
            r#"{"gnews_api_key": "gn", "hf_api_token": "hf"}"#,
        )
        .unwrap();

        let value = load_layered_config(&config_path).unwrap();
        assert_eq!(value["ingest"]["gnews"]["days_back"], 2);
        assert_eq!(value["ingest"]["gnews"]["api_key"], "gn");
        assert_eq!(value["classifier"]["zero_shot"]["api_token"], "hf");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_layered_config(&dir.path().join("nope.json")).is_err());
    }
}
