//! Generation Pass
//!
//! Runs one complete pass: rules file first (the main Snakefile includes
//! it, and includes must exist), then the main Snakefile, then the
//! launcher scripts.

use std::path::PathBuf;

use log::{info, warn};
use serde_yaml::Value;

use crate::environment::{PathRoots, Settings};
use crate::error::{Result, SnakeMakerError};
use crate::loader::load_config;
use crate::rules::{Diagnostic, RuleMaker};
use crate::samples::load_samples;
use crate::scripts::write_launcher_scripts;
use crate::snakefile::{SnakefileConfig, SnakefileMaker};

/// Everything one generation pass needs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub rule_config: Value,
    /// `Value::Null` uses the Snakefile defaults
    pub snakefile_config: Value,
    pub roots: PathRoots,
    pub samples: Vec<String>,
    pub wildcards: Vec<String>,
    pub write_scripts: bool,
}

impl GenerationRequest {
    pub fn new(rule_config: Value, roots: PathRoots) -> Self {
        Self {
            rule_config,
            snakefile_config: Value::Null,
            roots,
            samples: Vec::new(),
            wildcards: Vec::new(),
            write_scripts: true,
        }
    }

    /// Builds a request from application settings, loading the referenced
    /// configuration and sample files.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let rule_path = settings
            .rule_configuration()?
            .ok_or(SnakeMakerError::ConfigMissing)?;
        let rule_config = load_config(&rule_path)?;

        let snakefile_config = match settings.snakefile_configuration()? {
            Some(path) => load_config(&path)?,
            None => {
                info!("No Snakefile configuration given, using defaults");
                Value::Null
            }
        };

        let samples = match &settings.samples {
            Some(source) => load_samples(source, &settings.application_root()?, settings.sample_level)?,
            None => Vec::new(),
        };

        Ok(Self {
            rule_config,
            snakefile_config,
            roots: settings.path_roots()?,
            samples,
            wildcards: settings.wildcards.clone(),
            write_scripts: true,
        })
    }
}

/// What a generation pass produced.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub rules_path: PathBuf,
    pub snakefile_path: PathBuf,
    pub scripts: Vec<PathBuf>,
    pub rule_names: Vec<String>,
    pub sample_count: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs a full generation pass.
pub fn generate(request: &GenerationRequest) -> Result<GenerationReport> {
    let mut rule_maker = RuleMaker::new(request.roots.clone()).with_wildcards(&request.wildcards);
    rule_maker.from_config(&request.rule_config)?;
    let rules_path = rule_maker.write()?;

    if request.samples.is_empty() {
        warn!("Sample list is empty");
    }

    let snakefile_config = SnakefileConfig::from_value(&request.snakefile_config)?;
    let snakefile_path = SnakefileMaker::new(snakefile_config, request.roots.clone())
        .with_samples(request.samples.clone())
        .write()?;

    let scripts = if request.write_scripts {
        write_launcher_scripts(&request.roots.snakefile_dir)?
    } else {
        Vec::new()
    };

    Ok(GenerationReport {
        rules_path,
        snakefile_path,
        scripts,
        rule_names: rule_maker.rules().iter().map(|r| r.name.clone()).collect(),
        sample_count: request.samples.len(),
        diagnostics: rule_maker.diagnostics().to_vec(),
    })
}
