//! Error Types
//!
//! Fatal errors abort a generation pass. Descriptor-level problems are
//! not fatal: they are logged, recorded as diagnostics and the affected
//! entry is left empty (see [`crate::rules::maker::RuleMaker`]).

use std::path::PathBuf;

/// Errors that stop a generation pass.
#[derive(Debug, thiserror::Error)]
pub enum SnakeMakerError {
    #[error("rule configuration is not provided, check the config")]
    ConfigMissing,

    #[error("configuration is not in the expected shape: {0}")]
    ConfigShape(String),

    #[error("unsupported file format for {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid yaml in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid csv in {path}: {source}")]
    ParseCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid json in {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("included file {path} does not exist")]
    MissingInclude { path: PathBuf },

    #[error("settings validation failed: {0}")]
    Settings(String),
}

/// A malformed or unresolvable descriptor.
///
/// Never propagated out of a generation pass; the rule maker downgrades it
/// to a diagnostic and an empty entry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("path for '{key}' is not provided in the {section} section")]
    MissingPath { key: String, section: &'static str },

    #[error("'{key}' in the {section} section is missing required key '{field}'")]
    MissingField {
        key: String,
        section: &'static str,
        field: &'static str,
    },

    #[error("function for '{key}' is not provided correctly: {reason}")]
    BadFunction { key: String, reason: String },

    #[error("'{key}' references '{name}', which is not registered by any earlier rule")]
    Unresolved { key: String, name: String },

    #[error("incorrect value for '{key}' in the {section} section")]
    Incorrect { key: String, section: &'static str },
}

pub type Result<T> = std::result::Result<T, SnakeMakerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SnakeMakerError::ConfigMissing;
        assert!(err.to_string().contains("not provided"));

        let err = SnakeMakerError::MissingInclude {
            path: PathBuf::from("/tmp/rules.smk"),
        };
        assert!(err.to_string().contains("/tmp/rules.smk"));
    }

    #[test]
    fn test_descriptor_error_display() {
        let err = DescriptorError::Unresolved {
            key: "reads".to_string(),
            name: "trimmed".to_string(),
        };
        assert!(err.to_string().contains("trimmed"));
        assert!(err.to_string().contains("reads"));

        let err = DescriptorError::MissingField {
            key: "bam".to_string(),
            section: "output",
            field: "output_name",
        };
        assert_eq!(
            err.to_string(),
            "'bam' in the output section is missing required key 'output_name'"
        );
    }
}
