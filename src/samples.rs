//! Sample Lists
//!
//! Samples fill the `samples` variable of the main Snakefile. They come
//! from one of:
//! - an inline list: `samples: [s1, s2]`
//! - a mapping: `samples: {samples: [s1, s2]}`
//! - a `.txt` file, one sample per line
//! - a `.csv` file with a `samples` column
//! - a `.json`/`.yaml` file holding either of the two forms above
//!
//! With a `level`, each sample is cut down to its last `level` path
//! components (`/data/sub-01/ses-1` with level 2 gives `sub-01/ses-1`).

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_yaml::Value;

use crate::error::{Result, SnakeMakerError};
use crate::loader::{load_config, scalar_text};

/// Header of the sample column in CSV sample files.
const SAMPLES_COLUMN: &str = "samples";

/// Resolves a sample source into a list of samples.
///
/// Relative file paths are resolved against `base_dir`.
pub fn load_samples(source: &Value, base_dir: &Path, level: Option<usize>) -> Result<Vec<String>> {
    let samples = match source {
        Value::Null => Vec::new(),
        Value::Sequence(_) | Value::Mapping(_) => samples_from_value(source)?,
        Value::String(path) => {
            let path = if Path::new(path).is_absolute() {
                PathBuf::from(path)
            } else {
                base_dir.join(path)
            };
            samples_from_file(&path)?
        }
        _ => {
            return Err(SnakeMakerError::ConfigShape(
                "samples must be a list, a {samples: [...]} mapping or a file path".to_string(),
            ))
        }
    };

    let samples = match level {
        Some(level) => samples.iter().map(|s| last_components(s, level)).collect(),
        None => samples,
    };

    info!("Loaded {} samples", samples.len());
    debug!("Samples: {:?}", samples);
    Ok(samples)
}

fn samples_from_value(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Sequence(items) => Ok(items
            .iter()
            .map(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        Value::Mapping(map) => match map.get("samples") {
            Some(inner @ Value::Sequence(_)) => samples_from_value(inner),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(SnakeMakerError::ConfigShape(
                "`samples` must be a list".to_string(),
            )),
        },
        _ => Err(SnakeMakerError::ConfigShape(
            "sample file must hold a list or a {samples: [...]} mapping".to_string(),
        )),
    }
}

fn samples_from_file(path: &Path) -> Result<Vec<String>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("txt") => {
            let content = fs::read_to_string(path).map_err(|source| SnakeMakerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect())
        }
        Some("csv") => samples_from_csv(path),
        Some("json" | "yaml" | "yml") => samples_from_value(&load_config(path)?),
        _ => Err(SnakeMakerError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Reads the `samples` column of a CSV file with a header row.
fn samples_from_csv(path: &Path) -> Result<Vec<String>> {
    let csv_error = |source: csv::Error| SnakeMakerError::ParseCsv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let column = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|h| h.trim() == SAMPLES_COLUMN)
        .ok_or_else(|| {
            SnakeMakerError::ConfigShape(format!(
                "{} has no `{}` column",
                path.display(),
                SAMPLES_COLUMN
            ))
        })?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if let Some(sample) = record.get(column).map(str::trim).filter(|s| !s.is_empty()) {
            samples.push(sample.to_string());
        }
    }
    Ok(samples)
}

/// Keeps the last `level` components of a path.
///
/// # Example
/// ```
/// use snakemaker::samples::last_components;
///
/// assert_eq!(last_components("/data/sub-01/ses-1", 2), "sub-01/ses-1");
/// assert_eq!(last_components("sub-01", 3), "sub-01");
/// ```
pub fn last_components(path: &str, level: usize) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let start = parts.len().saturating_sub(level);
    parts[start..].join("/")
}
