//! Rule Maker
//!
//! Walks a rule configuration in order, resolves every descriptor through
//! the [`ExpressionBuilder`], registers inputs and outputs by name so later
//! rules can reference them, and collects the resolved [`RuleSpec`]s.
//!
//! Descriptor problems never abort the pass: the entry is left empty, the
//! problem is logged and kept as a [`Diagnostic`]. Configuration that is
//! missing or of the wrong shape is fatal.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{debug, error, info, warn};
use serde_yaml::{Mapping, Value};

use super::expression::ExpressionBuilder;
use super::model::{
    Entry, EntryValue, FunctionCall, InputDescriptor, OutputDescriptor, ParamDescriptor,
    RuleConfig, RuleSpec,
};
use super::registry::NameRegistry;
use super::serializer::render_rules;
use super::validator::{check_rule_wildcards, validate_rule_config};
use super::wildcards::wildcard_names;
use crate::environment::PathRoots;
use crate::error::{DescriptorError, Result, SnakeMakerError};
use crate::loader::scalar_text;

/// File name of the generated rules file.
pub const RULES_FILE_NAME: &str = "rules.smk";

/// A descriptor problem that degraded one entry of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub rule: String,
    pub error: DescriptorError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule '{}': {}", self.rule, self.error)
    }
}

/// Builds rule blocks from a rule configuration.
pub struct RuleMaker {
    roots: PathRoots,
    wildcards: Vec<String>,
    registry: NameRegistry,
    rules: Vec<RuleSpec>,
    diagnostics: Vec<Diagnostic>,
    rule0: Option<Value>,
}

impl RuleMaker {
    pub fn new(roots: PathRoots) -> Self {
        Self {
            roots,
            wildcards: wildcard_names(&[]),
            registry: NameRegistry::new(),
            rules: Vec::new(),
            diagnostics: Vec::new(),
            rule0: None,
        }
    }

    /// Sets the wildcard names rewritten inside deferred expressions.
    pub fn with_wildcards(mut self, wildcards: &[String]) -> Self {
        self.wildcards = wildcard_names(wildcards);
        self
    }

    /// Processes a whole rule configuration.
    ///
    /// Rules may sit at the top level or under a `rules` key next to an
    /// optional `rule0` preprocessing entry.
    pub fn from_config(&mut self, config: &Value) -> Result<()> {
        let map = match config {
            Value::Null => return Err(SnakeMakerError::ConfigMissing),
            Value::Mapping(map) => map,
            _ => {
                return Err(SnakeMakerError::ConfigShape(
                    "rule configuration must be a mapping of rule names".to_string(),
                ))
            }
        };

        let rules = if map.contains_key("rules") {
            if let Some(rule0) = map.get("rule0").filter(|v| !v.is_null()) {
                warn!("rule0 preprocessing is recorded but not executed");
                self.rule0 = Some(rule0.clone());
            }
            match map.get("rules") {
                Some(Value::Mapping(rules)) => rules,
                Some(Value::Null) | None => return Err(SnakeMakerError::ConfigMissing),
                Some(_) => {
                    return Err(SnakeMakerError::ConfigShape(
                        "`rules` must be a mapping of rule names".to_string(),
                    ))
                }
            }
        } else {
            map
        };

        self.create_rules(rules)
    }

    /// Resolves every rule of `rules` in configuration order.
    pub fn create_rules(&mut self, rules: &Mapping) -> Result<()> {
        for warning in validate_rule_config(rules)? {
            warn!("{}", warning);
        }

        info!("Creating {} rules", rules.len());

        for (name, value) in rules {
            let name = name.as_str().ok_or_else(|| {
                SnakeMakerError::ConfigShape(format!("rule name {:?} is not a string", name))
            })?;
            let config = RuleConfig::from_value(name, value)?;
            let rule = self.create_rule(&config);

            for warning in check_rule_wildcards(&rule) {
                warn!("{}", warning);
            }

            debug!("Rule '{}' created", rule.name);
            self.rules.push(rule);
        }

        info!(
            "Created {} rules, {} names registered, {} diagnostics",
            self.rules.len(),
            self.registry.len(),
            self.diagnostics.len()
        );
        Ok(())
    }

    /// Resolves a single rule, registering its inputs and outputs.
    pub fn create_rule(&mut self, config: &RuleConfig) -> RuleSpec {
        let mut rule = RuleSpec::new(config.name.as_str());
        let builder = ExpressionBuilder::new(&self.roots, &self.wildcards);
        let diagnostics = &mut self.diagnostics;
        let registry = &mut self.registry;

        match &config.input {
            Some(inputs) => {
                for (key, value) in string_keys(inputs) {
                    let resolved = InputDescriptor::from_value(key, value)
                        .and_then(|d| builder.resolve_input(key, &d, registry));
                    let value = degrade(diagnostics, &rule.name, resolved);
                    registry.register(key, value.clone());
                    rule.inputs.push(Entry::new(key, value));
                }
            }
            None => warn!("Input section is missing for rule '{}'", rule.name),
        }

        match &config.output {
            Some(outputs) => {
                for (key, value) in string_keys(outputs) {
                    let resolved = OutputDescriptor::from_value(key, value).map(|d| builder.output(&d));
                    let value = degrade(diagnostics, &rule.name, resolved);
                    registry.register(key, value.clone());
                    rule.outputs.push(Entry::new(key, value));
                }
            }
            None => warn!("Output section is missing for rule '{}'", rule.name),
        }

        if let Some(params) = &config.params {
            for (key, value) in string_keys(params) {
                let resolved = ParamDescriptor::from_value(key, value)
                    .and_then(|d| builder.param(key, &d, registry));
                let value = degrade(diagnostics, &rule.name, resolved);
                rule.params.push(Entry::new(key, value));
            }
        }

        match &config.resources {
            Some(Value::Mapping(resources)) => {
                for (key, value) in string_keys(resources) {
                    rule.resources
                        .push(Entry::new(key, EntryValue::Raw(scalar_text(value))));
                }
            }
            Some(_) => {
                degrade(
                    diagnostics,
                    &rule.name,
                    Err(DescriptorError::Incorrect {
                        key: "resources".to_string(),
                        section: "resources",
                    }),
                );
            }
            None => {}
        }

        if let Some(shell) = &config.shell {
            rule.shell = text_lines(shell);
        }

        rule.description = config.description.clone();

        if let Some(run) = &config.run {
            rule.run = match run {
                Value::Mapping(map) if map.contains_key("function") => {
                    match FunctionCall::from_mapping("run", map) {
                        Ok(call) => builder.run_entries(&call),
                        Err(err) => {
                            degrade(diagnostics, &rule.name, Err(err));
                            Vec::new()
                        }
                    }
                }
                Value::Mapping(_) => {
                    degrade(
                        diagnostics,
                        &rule.name,
                        Err(DescriptorError::BadFunction {
                            key: "run".to_string(),
                            reason: "expected a `function` descriptor".to_string(),
                        }),
                    );
                    Vec::new()
                }
                other => text_lines(other)
                    .into_iter()
                    .map(|line| Entry::new("", EntryValue::Raw(line)))
                    .collect(),
            };
        }

        rule
    }

    /// Resolved rules in configuration order.
    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&RuleSpec> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    /// Descriptor problems collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The unexecuted `rule0` preprocessing entry, if one was configured.
    pub fn rule0(&self) -> Option<&Value> {
        self.rule0.as_ref()
    }

    pub fn roots(&self) -> &PathRoots {
        &self.roots
    }

    /// Text of the rules file.
    pub fn render(&self) -> String {
        render_rules(&self.rules)
    }

    /// Writes `rules.smk` into the rule output directory.
    pub fn write(&self) -> Result<PathBuf> {
        let dir = &self.roots.rule_dir;
        fs::create_dir_all(dir).map_err(|source| SnakeMakerError::Write {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(RULES_FILE_NAME);
        fs::write(&path, self.render()).map_err(|source| SnakeMakerError::Write {
            path: path.clone(),
            source,
        })?;

        info!("Rules written to {}", path.display());
        Ok(path)
    }
}

/// Unwraps a resolution, downgrading a failure to an empty entry.
fn degrade(
    diagnostics: &mut Vec<Diagnostic>,
    rule: &str,
    resolved: std::result::Result<EntryValue, DescriptorError>,
) -> EntryValue {
    match resolved {
        Ok(value) => value,
        Err(err) => {
            error!("Rule '{}': {}", rule, err);
            diagnostics.push(Diagnostic {
                rule: rule.to_string(),
                error: err,
            });
            EntryValue::Empty
        }
    }
}

/// Iterates the string-keyed entries of a section, skipping other keys.
fn string_keys(map: &Mapping) -> impl Iterator<Item = (&str, &Value)> {
    map.iter().filter_map(|(k, v)| match k.as_str() {
        Some(key) => Some((key, v)),
        None => {
            warn!("Ignoring non-string key {:?}", k);
            None
        }
    })
}

/// Splits a string or list value into non-empty lines.
fn text_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(scalar_text)
            .filter(|l| !l.trim().is_empty())
            .collect(),
        other => scalar_text(other)
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn roots(shortened: bool) -> PathRoots {
        PathRoots::new("/data/in", "/data/out/rules", "/data/out").with_shortened(shortened)
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_cross_rule_reference() {
        let config = yaml(
            r#"
rule_a:
  output:
    x: {output_folder: f, output_name: n.txt}
  shell: touch {output.x}
rule_b:
  input:
    x: ~
  shell: cat {input.x}
"#,
        );

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();

        let a = maker.rule("rule_a").unwrap();
        let b = maker.rule("rule_b").unwrap();
        assert_eq!(b.input("x"), a.output("x"));
        assert_eq!(b.input("x").unwrap().text(), "/data/out/rules/f/{sample}/n.txt");
        assert!(maker.diagnostics().is_empty());
    }

    #[test]
    fn test_nested_rules_and_rule0() {
        let config = yaml(
            r#"
rule0:
  function: prepare_inputs
rules:
  only:
    output: {done: done.txt}
    shell: touch {output.done}
"#,
        );

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();
        assert_eq!(maker.rules().len(), 1);
        assert!(maker.rule0().is_some());
    }

    #[test]
    fn test_missing_descriptor_key_degrades() {
        let config = yaml(
            r#"
broken:
  input:
    t1: {input_folder: anat}
    ok: reads.fq
  output:
    out: {output_folder: res}
  shell: run {input.ok}
"#,
        );

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();

        let rule = maker.rule("broken").unwrap();
        assert_eq!(rule.input("t1"), Some(&EntryValue::Empty));
        assert_eq!(rule.input("ok").unwrap().text(), "reads.fq");
        assert_eq!(rule.output("out"), Some(&EntryValue::Empty));
        assert_eq!(maker.diagnostics().len(), 2);
        assert!(!maker.registry().contains("t1"));

        let text = maker.render();
        assert!(!text.contains("t1="));
        assert!(!text.contains("\toutput:"));
    }

    #[test]
    fn test_unresolved_reference_degrades() {
        let config = yaml("lonely: {input: {ghost: ~}, shell: echo}");

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();

        assert_eq!(maker.diagnostics().len(), 1);
        assert!(matches!(
            maker.diagnostics()[0].error,
            DescriptorError::Unresolved { .. }
        ));
        assert!(maker.diagnostics()[0].to_string().contains("lonely"));
    }

    #[test]
    fn test_deferred_input_is_not_a_function_argument() {
        let config = yaml(
            r#"
rule_a:
  input:
    meta:
      function:
        name: read_meta
        args:
          from_input:
            js: {input_folder: dwi, filename: b0.json}
  output: {done: a.txt}
  shell: touch {output.done}
rule_b:
  input: {done: ~}
  params:
    t:
      function:
        name: total
        args:
          from_input:
            meta: ~
  output: {report: b.txt}
  shell: echo {params.t} > {output.report}
"#,
        );

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();

        let a = maker.rule("rule_a").unwrap();
        assert!(a.input("meta").unwrap().text().starts_with("lambda wildcards: read_meta("));

        let b = maker.rule("rule_b").unwrap();
        assert_eq!(b.param("t"), Some(&EntryValue::Empty));
        assert_eq!(maker.diagnostics().len(), 1);
        assert_eq!(maker.diagnostics()[0].rule, "rule_b");
        assert_eq!(
            maker.diagnostics()[0].error,
            DescriptorError::Incorrect {
                key: "t".to_string(),
                section: "params",
            }
        );
        assert!(!maker.render().contains("total("));
    }

    #[test]
    fn test_first_registration_wins_across_rules() {
        let config = yaml(
            r#"
first:
  output: {bam: first.bam}
  shell: a
second:
  output: {bam: second.bam}
  shell: b
third:
  input: {bam: ~}
  shell: c
"#,
        );

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();
        assert_eq!(maker.rule("third").unwrap().input("bam").unwrap().text(), "first.bam");
        assert_eq!(maker.rule("second").unwrap().output("bam").unwrap().text(), "second.bam");
    }

    #[test]
    fn test_wrong_shape_is_fatal() {
        let mut maker = RuleMaker::new(roots(false));
        assert!(matches!(
            maker.from_config(&Value::Null),
            Err(SnakeMakerError::ConfigMissing)
        ));
        assert!(matches!(
            maker.from_config(&yaml("[a, b]")),
            Err(SnakeMakerError::ConfigShape(_))
        ));
        assert!(matches!(
            maker.from_config(&yaml("rules: [a]")),
            Err(SnakeMakerError::ConfigShape(_))
        ));
        assert!(maker.from_config(&yaml("{}")).is_err());
    }

    #[test]
    fn test_params_resources_and_run() {
        let config = yaml(
            r#"
index:
  input:
    bvec: {input_folder: dwi, filename: dwi.bvec}
  params:
    mode: fast
    mask: {name: mask.nii, folder: bet}
    threshold: 0.3
  resources:
    mem_mb: 2000
  run:
    function:
      name: create_index
      args:
        from_input:
          index: {name: bvec}
"#,
        );

        let mut maker = RuleMaker::new(roots(true));
        maker.from_config(&config).unwrap();
        let rule = maker.rule("index").unwrap();

        assert_eq!(rule.param("mode").unwrap().render(), "\"fast\"");
        assert_eq!(
            rule.param("mask").unwrap().text(),
            "/data/out/rules/bet/{sample}/mask.nii"
        );
        assert_eq!(rule.input("bvec").unwrap().text(), "{output_path}/dwi/dwi.bvec");
        assert_eq!(rule.param("threshold").unwrap().render(), "0.3");
        assert_eq!(rule.resources[0].value.render(), "2000");
        assert_eq!(rule.run[0].value.render(), "create_index(input.bvec)");

        let text = maker.render();
        assert!(text.contains("\tresources:\n\t\tmem_mb=2000,"));
        assert!(text.contains("\trun:\n\t\tindex=create_index(input.bvec)"));
    }

    #[test]
    fn test_shell_list_and_multiline() {
        let config = yaml(
            r#"
multi:
  output: {o: o.txt}
  shell: |
    step one
    step two
listed:
  output: {p: p.txt}
  shell: [first, second]
"#,
        );

        let mut maker = RuleMaker::new(roots(false));
        maker.from_config(&config).unwrap();
        assert_eq!(maker.rule("multi").unwrap().shell, vec!["step one", "step two"]);
        assert_eq!(maker.rule("listed").unwrap().shell, vec!["first", "second"]);
    }

    #[test]
    fn test_write_rules_file() {
        let temp_dir = tempdir().unwrap();
        let roots = PathRoots::new(
            temp_dir.path().join("in"),
            temp_dir.path().join("rules"),
            temp_dir.path(),
        );

        let mut maker = RuleMaker::new(roots);
        maker
            .from_config(&yaml("hello:\n  output: {o: o.txt}\n  shell: echo hi > {output.o}\n"))
            .unwrap();

        let path = maker.write().unwrap();
        assert_eq!(path, temp_dir.path().join("rules").join(RULES_FILE_NAME));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, maker.render());
        assert!(content.starts_with("# Description missing\nrule hello:"));
    }
}
