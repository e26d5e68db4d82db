//! Main Snakefile Assembly
//!
//! Builds `Snakemake.smk` from a Snakefile configuration:
//!
//! ```yaml
//! imports:
//!   - import re
//! include:
//!   global_path: default          # the rule output directory
//!   rules: [rules.smk]
//! configfile: config/params.yaml
//! vars:
//!   samples: {}                   # the sample list given to the maker
//!   wildcard_constraints: default
//!   sides: [left, right]
//! config_vars:
//!   threshold: {config_nested: [filters, threshold]}
//! rules:
//!   all:
//!     input: expand('{default_path}/{sample}/done.txt', sample=samples)
//! ```
//!
//! Sections are emitted in the order imports, includes, configfile,
//! variables, config variables, rules.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_yaml::{Mapping, Value};

use super::defaults::{
    default_include, default_vars, DEFAULT_GLOBAL_PATH, DEFAULT_IMPORTS, DEFAULT_PATH_TOKEN,
    DEFAULT_WILDCARD_CONSTRAINTS, SNAKEFILE_NAME,
};
use crate::environment::{PathRoots, OUTPUT_PATH_VARIABLE};
use crate::error::{Result, SnakeMakerError};
use crate::loader::{python_literal, scalar_text};

/// Parsed Snakefile configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SnakefileConfig {
    pub imports: Vec<String>,
    /// Either `{global_path, rules}` or a list of paths
    pub include: Value,
    pub configfile: Option<String>,
    pub vars: Mapping,
    pub config_vars: Mapping,
    pub rules: Mapping,
}

impl Default for SnakefileConfig {
    fn default() -> Self {
        Self {
            imports: DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect(),
            include: default_include(),
            configfile: None,
            vars: default_vars(),
            config_vars: Mapping::new(),
            rules: Mapping::new(),
        }
    }
}

impl SnakefileConfig {
    /// Reads a configuration; missing keys keep their defaults.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut config = Self::default();
        let map = match value {
            Value::Null => return Ok(config),
            Value::Mapping(map) => map,
            _ => {
                return Err(SnakeMakerError::ConfigShape(
                    "Snakefile configuration must be a mapping".to_string(),
                ))
            }
        };

        let mapping = |key: &str| -> Result<Option<Mapping>> {
            match map.get(key) {
                None => Ok(None),
                Some(Value::Null) => Ok(Some(Mapping::new())),
                Some(Value::Mapping(m)) => Ok(Some(m.clone())),
                Some(_) => Err(SnakeMakerError::ConfigShape(format!(
                    "Snakefile `{}` must be a mapping",
                    key
                ))),
            }
        };

        match map.get("imports") {
            None => {}
            Some(Value::Null) => config.imports.clear(),
            Some(Value::Sequence(items)) => {
                config.imports = items.iter().map(scalar_text).collect();
            }
            Some(Value::String(line)) => config.imports = vec![line.clone()],
            Some(_) => {
                return Err(SnakeMakerError::ConfigShape(
                    "Snakefile `imports` must be a list".to_string(),
                ))
            }
        }

        if let Some(include) = map.get("include") {
            config.include = include.clone();
        }
        config.configfile = map
            .get("configfile")
            .map(scalar_text)
            .filter(|s| !s.is_empty());
        if let Some(vars) = mapping("vars")? {
            config.vars = vars;
        }
        if let Some(config_vars) = mapping("config_vars")? {
            config.config_vars = config_vars;
        }
        if let Some(rules) = mapping("rules")? {
            config.rules = rules;
        }

        Ok(config)
    }
}

/// Assembles the main Snakefile.
pub struct SnakefileMaker {
    config: SnakefileConfig,
    roots: PathRoots,
    samples: Vec<String>,
    env_overrides: HashMap<String, String>,
}

impl SnakefileMaker {
    pub fn new(config: SnakefileConfig, roots: PathRoots) -> Self {
        Self {
            config,
            roots,
            samples: Vec::new(),
            env_overrides: HashMap::new(),
        }
    }

    /// Sets the sample list used for `samples: {}`.
    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = samples;
        self
    }

    /// Supplies values for `{type: env}` variables ahead of the process
    /// environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env_overrides = vars;
        self
    }

    pub fn config(&self) -> &SnakefileConfig {
        &self.config
    }

    fn env_value(&self, name: &str) -> Option<String> {
        self.env_overrides
            .get(name)
            .cloned()
            .or_else(|| env::var(name).ok())
    }

    /// `#Imported libraries` section.
    pub fn process_imports(&self) -> String {
        if self.config.imports.is_empty() {
            return String::new();
        }
        format!("\n\n#Imported libraries\n{}", self.config.imports.join("\n"))
    }

    /// `#Includes` section. Every included file must exist.
    pub fn process_includes(&self) -> Result<String> {
        let paths = self.include_paths()?;
        if paths.is_empty() {
            return Ok(String::new());
        }

        let mut output = String::from("\n\n#Includes\n");
        for path in paths {
            if !path.exists() {
                return Err(SnakeMakerError::MissingInclude { path });
            }
            output.push_str(&format!("\ninclude: '{}'", path.display()));
        }
        Ok(output)
    }

    fn include_paths(&self) -> Result<Vec<PathBuf>> {
        let rule_dir = &self.roots.rule_dir;
        let under_rule_dir = |path: &str| {
            if Path::new(path).is_absolute() {
                PathBuf::from(path)
            } else {
                rule_dir.join(path)
            }
        };

        match &self.config.include {
            Value::Null => Ok(Vec::new()),
            Value::String(path) => Ok(vec![under_rule_dir(path)]),
            Value::Sequence(paths) => Ok(paths
                .iter()
                .map(scalar_text)
                .filter(|p| !p.is_empty())
                .map(|p| under_rule_dir(&p))
                .collect()),
            Value::Mapping(include) => {
                let global = match include.get("global_path").map(scalar_text).as_deref() {
                    None | Some("") | Some(DEFAULT_GLOBAL_PATH) => rule_dir.clone(),
                    Some(path) => PathBuf::from(path),
                };
                let rules: Vec<String> = match include.get("rules") {
                    Some(Value::Sequence(rules)) => rules.iter().map(scalar_text).collect(),
                    Some(Value::String(rule)) => vec![rule.clone()],
                    _ => Vec::new(),
                };
                Ok(rules.iter().map(|rule| global.join(rule)).collect())
            }
            _ => Err(SnakeMakerError::ConfigShape(
                "`include` must be a {global_path, rules} mapping or a list of paths".to_string(),
            )),
        }
    }

    /// `configfile:` directive.
    pub fn process_configfile(&self) -> String {
        match &self.config.configfile {
            Some(path) => format!("\n\nconfigfile: '{}'", path),
            None => String::new(),
        }
    }

    /// `#Variables` section followed by the `wildcard_constraints:` block.
    pub fn process_vars(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut constraints: Vec<(String, String)> = Vec::new();

        if self.roots.shortened && !self.config.vars.contains_key(OUTPUT_PATH_VARIABLE) {
            lines.push(format!(
                "{} = '{}'",
                OUTPUT_PATH_VARIABLE,
                self.roots.rule_dir.display()
            ));
        }

        for (key, value) in &self.config.vars {
            let key = scalar_text(key);

            if key == "wildcard_constraints" {
                match value {
                    Value::String(s) if s == "default" => constraints.extend(
                        DEFAULT_WILDCARD_CONSTRAINTS
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string())),
                    ),
                    Value::Mapping(user) => constraints
                        .extend(user.iter().map(|(k, v)| (scalar_text(k), scalar_text(v)))),
                    other => warn!("Ignoring wildcard_constraints value {:?}", other),
                }
                continue;
            }

            let rendered = if key == "samples" {
                self.samples_value(value)
            } else {
                self.var_value(&key, value)
            };
            lines.push(format!("{} = {}", key, rendered));
        }

        let mut output = String::new();
        if !lines.is_empty() {
            output.push_str("\n\n#Variables\n");
            output.push_str(&lines.join("\n"));
        }
        if !constraints.is_empty() {
            output.push_str("\n\n#Wildcard constraints\nwildcard_constraints:");
            for (key, value) in constraints {
                output.push_str(&format!("\n\t{}={},", key, value));
            }
        }
        output
    }

    fn samples_value(&self, value: &Value) -> String {
        match value {
            Value::Mapping(map) if map.contains_key("paths") => {
                python_literal(map.get("paths").unwrap_or(&Value::Null))
            }
            Value::Mapping(map) if map.contains_key("function") => {
                map.get("function").map(scalar_text).unwrap_or_default()
            }
            Value::Sequence(_) => python_literal(value),
            _ => {
                let samples = self
                    .samples
                    .iter()
                    .map(|s| Value::String(s.clone()))
                    .collect();
                python_literal(&Value::Sequence(samples))
            }
        }
    }

    fn var_value(&self, key: &str, value: &Value) -> String {
        match value {
            Value::Sequence(_) => python_literal(value),
            Value::Mapping(map) if map.contains_key("function") => {
                map.get("function").map(scalar_text).unwrap_or_default()
            }
            Value::Mapping(map) if map.contains_key("paths") => {
                python_literal(map.get("paths").unwrap_or(&Value::Null))
            }
            Value::Mapping(map) if map.get("type").and_then(Value::as_str) == Some("env") => {
                let name = map.get("name").map(scalar_text).unwrap_or_default();
                let resolved = self.env_value(&name).unwrap_or_else(|| {
                    warn!("Environment variable '{}' for '{}' is not set", name, key);
                    String::new()
                });
                format!("'{}'", resolved)
            }
            other => scalar_text(other),
        }
    }

    /// `#Config variables` section.
    pub fn process_config_vars(&self) -> String {
        if self.config.config_vars.is_empty() {
            return String::new();
        }

        let mut output = String::from("\n\n#Config variables\n");
        for (key, value) in &self.config.config_vars {
            let rendered = match value {
                Value::Mapping(map) if map.contains_key("config_nested") => {
                    let keys: Vec<String> = match map.get("config_nested") {
                        Some(Value::Sequence(keys)) => keys.iter().map(scalar_text).collect(),
                        Some(other) => vec![scalar_text(other)],
                        None => Vec::new(),
                    };
                    let path: String = keys.iter().map(|k| format!("[\"{}\"]", k)).collect();
                    format!("config{}", path)
                }
                other => scalar_text(other),
            };
            output.push_str(&format!("{} = {}\n", scalar_text(key), rendered));
        }
        output
    }

    /// `#Rules` section of rules defined directly in the main file.
    pub fn process_rules(&self) -> String {
        if self.config.rules.is_empty() {
            return String::new();
        }

        let default_path = self.roots.snakefile_dir.display().to_string();
        let mut output = String::from("\n\n#Rules\n");

        for (name, rule) in &self.config.rules {
            output.push_str(&format!("rule {}:\n", scalar_text(name)));

            let Some(directives) = rule.as_mapping() else {
                warn!("Rule '{}' in the Snakefile configuration is empty", scalar_text(name));
                output.push('\n');
                continue;
            };

            for (key, value) in directives {
                let key = scalar_text(key);
                let lines: Vec<String> = match value {
                    Value::Sequence(items) => items.iter().map(scalar_text).collect(),
                    other => vec![scalar_text(other)],
                };
                let lines: Vec<String> = lines
                    .into_iter()
                    .map(|l| l.replace(DEFAULT_PATH_TOKEN, &default_path))
                    .collect();

                if key == "shell" {
                    output.push_str("\tshell:\n\t\t\"\"\"");
                    for line in &lines {
                        output.push_str(&format!("\n\t\t\t{}", line));
                    }
                    output.push_str("\n\t\t\"\"\"\n");
                } else {
                    output.push_str(&format!("\t{}:\n\t\t{}\n", key, lines.join(",\n\t\t")));
                }
            }
            output.push('\n');
        }
        output
    }

    /// Full text of the main Snakefile.
    pub fn render(&self) -> Result<String> {
        if !self.config.rules.contains_key("all") {
            warn!("No `all` rule in the Snakefile configuration, the launcher scripts target `all`");
        }

        let mut output = String::new();
        output.push_str(&self.process_imports());
        output.push_str(&self.process_includes()?);
        output.push_str(&self.process_configfile());
        output.push_str(&self.process_vars());
        output.push_str(&self.process_config_vars());
        output.push_str(&self.process_rules());

        debug!("Snakefile assembled ({} bytes)", output.len());
        Ok(output)
    }

    /// Writes `Snakemake.smk` into the Snakefile directory.
    pub fn write(&self) -> Result<PathBuf> {
        let content = self.render()?;
        let dir = &self.roots.snakefile_dir;
        fs::create_dir_all(dir).map_err(|source| SnakeMakerError::Write {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(SNAKEFILE_NAME);
        fs::write(&path, content).map_err(|source| SnakeMakerError::Write {
            path: path.clone(),
            source,
        })?;

        info!("Main Snakefile written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn roots(dir: &Path) -> PathRoots {
        PathRoots::new(dir.join("in"), dir.join("rules"), dir.to_path_buf())
    }

    fn maker(config: &str, dir: &Path) -> SnakefileMaker {
        let config = SnakefileConfig::from_value(&yaml(config)).unwrap();
        SnakefileMaker::new(config, roots(dir))
    }

    #[test]
    fn test_default_config() {
        let config = SnakefileConfig::from_value(&Value::Null).unwrap();
        assert_eq!(config.imports.len(), 3);
        assert!(config.imports.contains(&"import re".to_string()));
        assert_eq!(config.include, default_include());
    }

    #[test]
    fn test_imports() {
        let temp_dir = tempdir().unwrap();
        let maker = maker("imports: [import os, import sys]", temp_dir.path());
        assert_eq!(
            maker.process_imports(),
            "\n\n#Imported libraries\nimport os\nimport sys"
        );

        let maker = self::maker("imports: ~", temp_dir.path());
        assert_eq!(maker.process_imports(), "");
    }

    #[test]
    fn test_includes_default_global_path() {
        let temp_dir = tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("rules")).unwrap();
        std::fs::write(temp_dir.path().join("rules/rules.smk"), "").unwrap();

        let maker = maker("{}", temp_dir.path());
        let expected = format!(
            "\n\n#Includes\n\ninclude: '{}'",
            temp_dir.path().join("rules/rules.smk").display()
        );
        assert_eq!(maker.process_includes().unwrap(), expected);
    }

    #[test]
    fn test_includes_list_every_path() {
        let temp_dir = tempdir().unwrap();
        let rules = temp_dir.path().join("rules");
        std::fs::create_dir_all(&rules).unwrap();
        std::fs::write(rules.join("a.smk"), "").unwrap();
        let absolute = temp_dir.path().join("b.smk");
        std::fs::write(&absolute, "").unwrap();

        let config = format!("include: [a.smk, '{}']", absolute.display());
        let output = maker(&config, temp_dir.path()).process_includes().unwrap();
        assert!(output.contains(&format!("include: '{}'", rules.join("a.smk").display())));
        assert!(output.contains(&format!("include: '{}'", absolute.display())));
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let temp_dir = tempdir().unwrap();
        let maker = maker("include: [missing.smk]", temp_dir.path());
        assert!(matches!(
            maker.process_includes(),
            Err(SnakeMakerError::MissingInclude { .. })
        ));
        assert!(maker.render().is_err());
    }

    #[test]
    fn test_vars() {
        let temp_dir = tempdir().unwrap();
        let config = r#"
vars:
  samples: {}
  sides: [left, right]
  reader: {function: "glob_wildcards('data/{sample}.txt').sample"}
  atlases: {paths: [/a.nii, /b.nii]}
  home: {type: env, name: SNAKEMAKER_TEST_HOME}
  threads: 4
  wildcard_constraints: default
"#;
        let maker = maker(config, temp_dir.path())
            .with_samples(vec!["s1".to_string(), "s2".to_string()])
            .with_env(HashMap::from([(
                "SNAKEMAKER_TEST_HOME".to_string(),
                "/home/test".to_string(),
            )]));

        let expected = "\n\n#Variables\n\
samples = ['s1', 's2']\n\
sides = ['left', 'right']\n\
reader = glob_wildcards('data/{sample}.txt').sample\n\
atlases = ['/a.nii', '/b.nii']\n\
home = '/home/test'\n\
threads = 4\n\
\n\
#Wildcard constraints\n\
wildcard_constraints:\n\
\tsample='|'.join([re.escape(x) for x in samples]),";
        assert_eq!(maker.process_vars(), expected);
    }

    #[test]
    fn test_samples_from_paths_and_function() {
        let temp_dir = tempdir().unwrap();
        let maker = maker("vars: {samples: {paths: [x, y]}}", temp_dir.path());
        assert_eq!(maker.process_vars(), "\n\n#Variables\nsamples = ['x', 'y']");

        let maker = self::maker("vars: {samples: {function: load_samples()}}", temp_dir.path());
        assert_eq!(maker.process_vars(), "\n\n#Variables\nsamples = load_samples()");
    }

    #[test]
    fn test_user_wildcard_constraints_only() {
        let temp_dir = tempdir().unwrap();
        let maker = maker(r#"vars: {wildcard_constraints: {run: '"\d+"'}}"#, temp_dir.path());
        assert_eq!(
            maker.process_vars(),
            "\n\n#Wildcard constraints\nwildcard_constraints:\n\trun=\"\\d+\","
        );
    }

    #[test]
    fn test_shortened_defines_output_path() {
        let temp_dir = tempdir().unwrap();
        let config = SnakefileConfig::from_value(&yaml("vars: {}")).unwrap();
        let maker = SnakefileMaker::new(config, roots(temp_dir.path()).with_shortened(true));
        assert_eq!(
            maker.process_vars(),
            format!(
                "\n\n#Variables\noutput_path = '{}'",
                temp_dir.path().join("rules").display()
            )
        );
    }

    #[test]
    fn test_config_vars() {
        let temp_dir = tempdir().unwrap();
        let config = r#"
config_vars:
  sides: {config_nested: [sides]}
  threshold: {config_nested: [filters, threshold]}
  plain: 3
"#;
        assert_eq!(
            maker(config, temp_dir.path()).process_config_vars(),
            "\n\n#Config variables\n\
sides = config[\"sides\"]\n\
threshold = config[\"filters\"][\"threshold\"]\n\
plain = 3\n"
        );
    }

    #[test]
    fn test_rules_section() {
        let temp_dir = tempdir().unwrap();
        let config = r#"
rules:
  all:
    input: "expand('{default_path}/{sample}/done.txt', sample=samples)"
  report:
    input: summary.txt
    shell: cat {input}
"#;
        let output = maker(config, temp_dir.path()).process_rules();
        let expected = format!(
            "\n\n#Rules\n\
rule all:\n\
\tinput:\n\
\t\texpand('{}/{{sample}}/done.txt', sample=samples)\n\
\n\
rule report:\n\
\tinput:\n\
\t\tsummary.txt\n\
\tshell:\n\
\t\t\"\"\"\n\
\t\t\tcat {{input}}\n\
\t\t\"\"\"\n\
\n",
            temp_dir.path().display()
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_configfile() {
        let temp_dir = tempdir().unwrap();
        let maker = maker("configfile: config/params.yaml", temp_dir.path());
        assert_eq!(maker.process_configfile(), "\n\nconfigfile: 'config/params.yaml'");
    }

    #[test]
    fn test_wrong_shape() {
        assert!(SnakefileConfig::from_value(&yaml("[a]")).is_err());
        assert!(SnakefileConfig::from_value(&yaml("vars: [a]")).is_err());
    }

    #[test]
    fn test_write_snakefile() {
        let temp_dir = tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("rules")).unwrap();
        std::fs::write(temp_dir.path().join("rules/rules.smk"), "").unwrap();

        let maker = maker("{}", temp_dir.path()).with_samples(vec!["a".to_string()]);
        let path = maker.write().unwrap();
        assert_eq!(path, temp_dir.path().join(SNAKEFILE_NAME));

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("\n\n#Imported libraries\nfrom datetime import datetime"));
        assert!(content.contains("samples = ['a']"));
        assert!(content.contains("wildcard_constraints:"));
    }
}
