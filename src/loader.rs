//! Configuration Loading
//!
//! Reads rule and Snakefile configurations from JSON or YAML files into an
//! order-preserving [`serde_yaml::Value`] tree. Rule order in the input is
//! the order rules are emitted, so the tree must keep mapping order.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde_yaml::Value;

use crate::error::{Result, SnakeMakerError};

/// Loads a configuration file, choosing the parser from the extension.
///
/// # Example
///
/// ```rust,no_run
/// use snakemaker::loader::load_config;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_config("config/rules.yaml")?;
///     println!("{} top-level keys", config.as_mapping().map_or(0, |m| m.len()));
///     Ok(())
/// }
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let content = match extension.as_deref() {
        Some("json" | "yaml" | "yml") => {
            fs::read_to_string(path).map_err(|source| SnakeMakerError::Read {
                path: path.to_path_buf(),
                source,
            })?
        }
        _ => {
            return Err(SnakeMakerError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    debug!("Configuration content loaded ({} bytes)", content.len());

    if extension.as_deref() == Some("json") {
        parse_json(&content, path)
    } else {
        parse_yaml(&content, path)
    }
}

/// Parses JSON text into the shared value tree.
pub fn parse_json(content: &str, path: &Path) -> Result<Value> {
    serde_json::from_str(content).map_err(|source| SnakeMakerError::ParseJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses YAML text into the shared value tree.
pub fn parse_yaml(content: &str, path: &Path) -> Result<Value> {
    serde_yaml::from_str(content).map_err(|source| SnakeMakerError::ParseYaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders a scalar config value the way it appears in generated text.
///
/// Strings are returned verbatim, numbers and booleans in their literal
/// form, null as an empty string. Collections render as Python literals.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => python_bool(*b),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => python_literal(other),
    }
}

/// Renders a value as a Python literal (`['a', 'b']`, `{'k': 1}`).
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => python_bool(*b),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Mapping(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", python_literal(k), python_literal(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Tagged(tagged) => python_literal(&tagged.value),
    }
}

fn python_bool(value: bool) -> String {
    let literal = if value { "True" } else { "False" };
    literal.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_yaml_preserves_order() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("rules.yaml");
        std::fs::write(&path, "zeta: 1\nalpha: 2\nmid: 3\n").unwrap();

        let config = load_config(&path).unwrap();
        let keys: Vec<&str> = config
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_load_json_preserves_order() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("rules.json");
        std::fs::write(&path, r#"{"second": {"a": 1}, "first": {"b": 2}}"#).unwrap();

        let config = load_config(&path).unwrap();
        let keys: Vec<&str> = config
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["second", "first"]);
    }

    #[test]
    fn test_load_unsupported_extension() {
        let result = load_config("/tmp/rules.toml");
        assert!(matches!(
            result,
            Err(SnakeMakerError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/rules.yaml");
        assert!(matches!(result, Err(SnakeMakerError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        std::fs::write(&path, "this is not valid yaml: [[[").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(SnakeMakerError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_python_literal() {
        let value: Value = serde_yaml::from_str("[a, 'b', 3]").unwrap();
        assert_eq!(python_literal(&value), "['a', 'b', 3]");

        let value: Value = serde_yaml::from_str("it's").unwrap();
        assert_eq!(python_literal(&value), "'it\\'s'");
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&Value::Bool(true)), "True");
        assert_eq!(scalar_text(&Value::String("x".into())), "x");
        assert_eq!(scalar_text(&Value::Null), "");
    }
}
