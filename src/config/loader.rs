// dbassist/src/config/loader.rs
use serde_json::Value;
use std::path::Path;

use crate::errors::{AssistError, Result};

/// Document formats a config or schema file may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Some(DocumentFormat::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// Parses file contents into an untyped document according to its format.
pub fn parse_document(format: DocumentFormat, contents: &str) -> std::result::Result<Value, String> {
    match format {
        DocumentFormat::Toml => toml::from_str::<Value>(contents).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::from_str::<Value>(contents).map_err(|e| e.to_string()),
    }
}

/// Loads a config file into an untyped object document.
///
/// A document of the form `{ "default": { ... } }` is unwrapped to its inner object.
pub async fn load_config_document(path: &Path) -> Result<Value> {
    let load_error = |reason: String| AssistError::ConfigLoad {
        path: path.to_path_buf(),
        reason,
    };

    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| load_error("unsupported file extension, expected .toml or .json".into()))?;
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| load_error(e.to_string()))?;
    let document = parse_document(format, &contents).map_err(load_error)?;

    match unwrap_default(document) {
        document @ Value::Object(_) => Ok(document),
        other => Err(load_error(format!(
            "expected an object at the top level, found {}",
            kind_of(&other)
        ))),
    }
}

fn unwrap_default(document: Value) -> Value {
    match document {
        Value::Object(mut map) if map.len() == 1 && map.get("default").is_some_and(Value::is_object) => {
            map.remove("default").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Short name of a JSON value's type, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
