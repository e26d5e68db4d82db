//! Application Settings and Path Roots
//!
//! Settings are read from a YAML file:
//!
//! ```yaml
//! app:
//!   APPLICATION_ROOT_PATH: default        # or an absolute path
//!   INPUT_DIR_PATH: data/input
//!   OUTPUT_RULE_MAKER_PATH: output/rules
//!   OUTPUT_SNAKEMAKE_PATH: output
//! configuration_files:
//!   rule_configuration: config/rules.yaml
//!   snakefile_configuration: config/snakefile.yaml
//! samples: config/samples.txt
//! shortened: true
//! ```
//!
//! Relative paths are joined onto the application root. Environment
//! variables named like the `app` keys override the file.
//!
//! # Settings Resolution Priority
//!
//! When no settings file is given, it is looked up in the following order:
//! 1. Production path: `settings.yaml` next to the snakemaker executable
//! 2. Development path: `{project_root}/config/settings.yaml`
//! 3. Working directory: `config/settings.yaml`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Result, SnakeMakerError};

pub const APPLICATION_ROOT_PATH: &str = "APPLICATION_ROOT_PATH";
pub const INPUT_DIR_PATH: &str = "INPUT_DIR_PATH";
pub const OUTPUT_RULE_MAKER_PATH: &str = "OUTPUT_RULE_MAKER_PATH";
pub const OUTPUT_SNAKEMAKE_PATH: &str = "OUTPUT_SNAKEMAKE_PATH";

/// Value of `APPLICATION_ROOT_PATH` meaning "the settings file's directory".
pub const DEFAULT_ROOT: &str = "default";

/// Name of the main Snakefile variable that shortened paths are relative to.
pub const OUTPUT_PATH_VARIABLE: &str = "output_path";

/// Lazily-resolved location of the default settings file.
pub static DEFAULT_SETTINGS_PATH: Lazy<PathBuf> = Lazy::new(|| {
    // Priority 1: Production environment (next to executable)
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let prod_path = exe_dir.join("settings.yaml");
            if prod_path.exists() {
                info!("Using production settings: {}", prod_path.display());
                return prod_path;
            }
        }
    }

    // Priority 2: Development environment
    let dev_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join("settings.yaml");

    if dev_path.exists() {
        info!("Using development settings: {}", dev_path.display());
        return dev_path;
    }

    // Priority 3: Current working directory
    let cwd_path = PathBuf::from("config").join("settings.yaml");
    info!("Using CWD settings: {}", cwd_path.display());
    cwd_path
});

/// Directory roots every generated path is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRoots {
    /// Root of the per-sample input data
    pub input_dir: PathBuf,
    /// Where `rules.smk` and per-rule outputs live
    pub rule_dir: PathBuf,
    /// Where `Snakemake.smk` and the launcher scripts are written
    pub snakefile_dir: PathBuf,
    /// Emit paths relative to the `output_path` Snakefile variable
    pub shortened: bool,
}

impl PathRoots {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        rule_dir: impl Into<PathBuf>,
        snakefile_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            rule_dir: rule_dir.into(),
            snakefile_dir: snakefile_dir.into(),
            shortened: false,
        }
    }

    /// Switches shortened path mode on or off.
    pub fn with_shortened(mut self, shortened: bool) -> Self {
        self.shortened = shortened;
        self
    }

    /// Joins `parts` onto a root, producing `/`-separated text.
    pub fn join(root: &Path, parts: &[&str]) -> String {
        parts
            .iter()
            .filter(|p| !p.is_empty())
            .fold(root.to_path_buf(), |acc, part| acc.join(part))
            .to_string_lossy()
            .into_owned()
    }
}

/// The `app` section of the settings file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AppSettings {
    #[serde(rename = "APPLICATION_ROOT_PATH", default)]
    pub application_root_path: Option<String>,

    #[serde(rename = "INPUT_DIR_PATH", default)]
    pub input_dir_path: Option<String>,

    #[serde(rename = "OUTPUT_RULE_MAKER_PATH", default)]
    pub output_rule_maker_path: Option<String>,

    #[serde(rename = "OUTPUT_SNAKEMAKE_PATH", default)]
    pub output_snakemake_path: Option<String>,
}

/// Paths to the rule and Snakefile configurations.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigurationFiles {
    #[serde(default)]
    pub rule_configuration: Option<String>,

    #[serde(default)]
    pub snakefile_configuration: Option<String>,
}

/// Application settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub configuration_files: ConfigurationFiles,

    /// Sample source: inline list, `{samples: [...]}`, or a file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Value>,

    /// Keep only the last N path components of each sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_level: Option<usize>,

    /// Emit paths relative to the `output_path` Snakefile variable
    #[serde(default = "default_shortened")]
    pub shortened: bool,

    /// Wildcard names rewritten inside deferred expressions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wildcards: Vec<String>,

    /// Directory of the file these settings were loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_shortened() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            configuration_files: ConfigurationFiles::default(),
            samples: None,
            sample_level: None,
            shortened: default_shortened(),
            wildcards: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SnakeMakerError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings: Settings =
            serde_yaml::from_str(&content).map_err(|source| SnakeMakerError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?;

        settings.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Overrides `app` paths with environment variables of the same name.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Overrides `app` paths from a lookup function.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = &mut self.app;
        let slots: [(&str, &mut Option<String>); 4] = [
            (APPLICATION_ROOT_PATH, &mut app.application_root_path),
            (INPUT_DIR_PATH, &mut app.input_dir_path),
            (OUTPUT_RULE_MAKER_PATH, &mut app.output_rule_maker_path),
            (OUTPUT_SNAKEMAKE_PATH, &mut app.output_snakemake_path),
        ];

        for (key, slot) in slots {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                debug!("{} overridden from environment: {}", key, value);
                *slot = Some(value);
            }
        }
    }

    /// Returns the application root all relative paths are joined onto.
    pub fn application_root(&self) -> Result<PathBuf> {
        match self.app.application_root_path.as_deref() {
            None | Some("") | Some(DEFAULT_ROOT) => Ok(self.base_dir.clone()),
            Some(path) if Path::new(path).is_absolute() => Ok(PathBuf::from(path)),
            Some(path) => Err(SnakeMakerError::Settings(format!(
                "invalid path provided for {}: '{}' (use an absolute path or '{}')",
                APPLICATION_ROOT_PATH, path, DEFAULT_ROOT
            ))),
        }
    }

    /// Resolves a settings path against the application root.
    pub fn resolve(&self, value: &str) -> Result<PathBuf> {
        let path = Path::new(value);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        Ok(self.application_root()?.join(path))
    }

    /// Builds the path roots for a generation pass.
    pub fn path_roots(&self) -> Result<PathRoots> {
        let root = self.application_root()?;
        let pick = |value: &Option<String>, fallback: Option<&str>| -> Result<PathBuf> {
            match (value.as_deref().filter(|v| !v.is_empty()), fallback) {
                (Some(v), _) => self.resolve(v),
                (None, Some(dir)) => Ok(root.join(dir)),
                (None, None) => Ok(root.clone()),
            }
        };

        let roots = PathRoots {
            input_dir: pick(&self.app.input_dir_path, Some("input"))?,
            rule_dir: pick(&self.app.output_rule_maker_path, Some("rules"))?,
            snakefile_dir: pick(&self.app.output_snakemake_path, None)?,
            shortened: self.shortened,
        };

        debug!("Path roots: {:?}", roots);
        Ok(roots)
    }

    /// Path of the rule configuration, if configured.
    pub fn rule_configuration(&self) -> Result<Option<PathBuf>> {
        self.configuration_files
            .rule_configuration
            .as_deref()
            .map(|p| self.resolve(p))
            .transpose()
    }

    /// Path of the Snakefile configuration, if configured.
    pub fn snakefile_configuration(&self) -> Result<Option<PathBuf>> {
        self.configuration_files
            .snakefile_configuration
            .as_deref()
            .map(|p| self.resolve(p))
            .transpose()
    }
}
