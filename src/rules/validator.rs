//! Rule Configuration Validation
//!
//! Checks a rule configuration before generation and reports problems
//! that would make the generated workflow fail later:
//! - Rules without an executable step, or with two of them
//! - Shell commands using `{input}`/`{output}` with nothing declared
//! - Rule names the workflow engine cannot parse
//! - Input wildcards that no output defines
//!
//! Only an empty rule set is fatal. Everything else is a warning.

use std::collections::HashSet;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use super::model::{EntryValue, RuleSpec, RULE_KEYS};
use super::wildcards::extract_wildcard_names;
use crate::environment::OUTPUT_PATH_VARIABLE;
use crate::error::{Result, SnakeMakerError};
use crate::loader::scalar_text;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Validation warning types for user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    NoAction(String),
    ShellAndRun(String),
    InvalidName(String),
    UnknownKey { rule: String, key: String },
    UnusedPlaceholder { rule: String, placeholder: String },
    UnmatchedWildcard { rule: String, wildcard: String },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAction(rule) => write!(f, "Rule '{}' has neither shell nor run", rule),
            Self::ShellAndRun(rule) => {
                write!(f, "Rule '{}' has both shell and run, only one will be used", rule)
            }
            Self::InvalidName(rule) => write!(f, "Rule name '{}' is not a valid identifier", rule),
            Self::UnknownKey { rule, key } => {
                write!(f, "Rule '{}': unknown key '{}' is ignored", rule, key)
            }
            Self::UnusedPlaceholder { rule, placeholder } => {
                write!(f, "Rule '{}': shell uses {} but none is specified", rule, placeholder)
            }
            Self::UnmatchedWildcard { rule, wildcard } => write!(
                f,
                "Rule '{}': input wildcard {{{}}} does not appear in any output",
                rule, wildcard
            ),
        }
    }
}

fn has_section(rule: &Mapping, key: &str) -> bool {
    match rule.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Mapping(m)) => !m.is_empty(),
        Some(Value::Sequence(s)) => !s.is_empty(),
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn shell_text(rule: &Mapping) -> String {
    match rule.get("shell") {
        Some(Value::Sequence(lines)) => lines.iter().map(scalar_text).collect::<Vec<_>>().join("\n"),
        Some(value) => scalar_text(value),
        None => String::new(),
    }
}

/// Validates a single rule entry.
fn validate_rule(name: &str, value: &Value) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if !IDENTIFIER.is_match(name.trim()) {
        warnings.push(ValidationWarning::InvalidName(name.to_string()));
    }

    let Some(rule) = value.as_mapping() else {
        return warnings;
    };

    for key in rule.keys().filter_map(Value::as_str) {
        if !RULE_KEYS.contains(&key) {
            warnings.push(ValidationWarning::UnknownKey {
                rule: name.to_string(),
                key: key.to_string(),
            });
        }
    }

    match (has_section(rule, "shell"), has_section(rule, "run")) {
        (false, false) => warnings.push(ValidationWarning::NoAction(name.to_string())),
        (true, true) => warnings.push(ValidationWarning::ShellAndRun(name.to_string())),
        _ => {}
    }

    let shell = shell_text(rule);
    for (placeholder, section) in [("{input", "input"), ("{output", "output")] {
        if shell.contains(placeholder) && !has_section(rule, section) {
            warnings.push(ValidationWarning::UnusedPlaceholder {
                rule: name.to_string(),
                placeholder: format!("{}}}", placeholder),
            });
        }
    }

    warnings
}

/// Validates the whole rule mapping.
///
/// Returns the warnings found; an empty rule mapping is an error.
pub fn validate_rule_config(rules: &Mapping) -> Result<Vec<ValidationWarning>> {
    info!("Validating rule configuration with {} rules", rules.len());

    if rules.is_empty() {
        return Err(SnakeMakerError::ConfigShape(
            "rule configuration has no rules".to_string(),
        ));
    }

    let mut warnings = Vec::new();
    for (name, value) in rules {
        let name = scalar_text(name);
        warnings.extend(validate_rule(&name, value));
    }

    debug!("Validation produced {} warnings", warnings.len());
    Ok(warnings)
}

/// Checks that every wildcard in a resolved rule's inputs is defined by
/// one of its outputs.
///
/// Rules without outputs (target rules such as `all`) are skipped, and so
/// is the `output_path` Snakefile variable.
pub fn check_rule_wildcards(rule: &RuleSpec) -> Vec<ValidationWarning> {
    let quoted = |value: &EntryValue| match value {
        EntryValue::Quoted(text) => Some(extract_wildcard_names(text)),
        _ => None,
    };

    let output_wildcards: HashSet<String> = rule
        .outputs
        .iter()
        .filter_map(|e| quoted(&e.value))
        .flatten()
        .collect();

    if output_wildcards.is_empty() && rule.outputs.iter().all(|e| e.value.is_empty()) {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    rule.inputs
        .iter()
        .filter_map(|e| quoted(&e.value))
        .flatten()
        .filter(|w| w != OUTPUT_PATH_VARIABLE && !output_wildcards.contains(w))
        .filter(|w| seen.insert(w.clone()))
        .map(|wildcard| ValidationWarning::UnmatchedWildcard {
            rule: rule.name.clone(),
            wildcard,
        })
        .collect()
}

/// Quick validation that returns a list of messages.
pub fn quick_validate(rules: &Mapping) -> Vec<String> {
    match validate_rule_config(rules) {
        Ok(warnings) => warnings.iter().map(|w| w.to_string()).collect(),
        Err(e) => vec![e.to_string()],
    }
}
