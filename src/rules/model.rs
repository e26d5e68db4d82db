//! Rule Data Model
//!
//! Typed descriptors for the values a rule configuration may carry, and the
//! resolved [`RuleSpec`] produced from them.
//!
//! # Example YAML Format
//!
//! ```yaml
//! rules:
//!   trim_reads:
//!     description: Trim adapters
//!     input:
//!       raw: {input_folder: raw, filename: reads.fastq}
//!     output:
//!       trimmed: {output_folder: trimmed, output_name: reads.fastq}
//!     params:
//!       quality: 20
//!     shell: trimmer -q {params.quality} {input.raw} > {output.trimmed}
//!
//!   align_reads:
//!     input:
//!       trimmed: ~
//!       index:
//!         function:
//!           name: find_index
//!           args:
//!             from_input:
//!               reads: {ref: trimmed}
//!     output:
//!       bam: {output_folder: aligned, output_name: reads, file_extension: bam}
//!     shell: aligner {input.index} {input.trimmed} > {output.bam}
//! ```

use serde_yaml::{Mapping, Value};

use crate::error::{DescriptorError, SnakeMakerError};
use crate::loader::{python_literal, scalar_text};

/// How an input entry is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum InputDescriptor {
    /// A literal path (`"a/b.txt"` or `{path: "a/b.txt"}`)
    Path(String),
    /// A file inside the per-sample input folder
    Folder { input_folder: String, filename: String },
    /// A function call producing the path
    Function(FunctionCall),
    /// A name registered by an earlier rule (`None` means the entry's own key)
    Reference(Option<String>),
}

/// How an output entry is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputDescriptor {
    Path(String),
    Folder {
        output_folder: String,
        output_name: String,
        file_extension: Option<String>,
    },
}

/// How a params entry is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDescriptor {
    /// A scalar or list value, emitted as-is (strings are quoted)
    Literal(Value),
    /// A file inside the per-sample rule output folder
    Folder { name: String, folder: String },
    Function(FunctionCall),
}

/// A `{function: {name, args}}` descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: FunctionArgs,
    /// Sibling `folder` key, used by `base_input_dir`
    pub folder: Option<String>,
    /// Sibling `filename` key, used by `base_input_dir`
    pub filename: Option<String>,
}

/// Arguments of a function descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgs {
    None,
    /// Argument expressions passed through verbatim
    Literal(Vec<String>),
    /// Named arguments resolved from inputs, in configuration order
    FromInput(Vec<(String, FunctionArg)>),
}

/// A single `from_input` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    /// Resolved to a path like any input entry
    Descriptor(InputDescriptor),
    /// `{name: X}`: the rule's own `input.X` attribute
    InputAttr(String),
}

/// Name of the function that expands to the per-sample input directory.
pub const BASE_INPUT_DIR_FUNCTION: &str = "base_input_dir";

fn get_str<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn get_text(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(v @ Value::Number(_)) => Some(scalar_text(v)),
        _ => None,
    }
}

impl InputDescriptor {
    /// Classifies an input config value.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, DescriptorError> {
        match value {
            Value::Null => Ok(Self::Reference(None)),
            Value::String(s) if !s.is_empty() => Ok(Self::Path(s.clone())),
            Value::Mapping(map) => Self::from_mapping(key, map),
            _ => Err(DescriptorError::MissingPath {
                key: key.to_string(),
                section: "input",
            }),
        }
    }

    fn from_mapping(key: &str, map: &Mapping) -> Result<Self, DescriptorError> {
        if map.is_empty() {
            return Ok(Self::Reference(None));
        }
        if let Some(path) = get_str(map, "path") {
            return Ok(Self::Path(path.to_string()));
        }
        if map.contains_key("function") {
            return FunctionCall::from_mapping(key, map).map(Self::Function);
        }
        if let Some(name) = get_str(map, "ref") {
            return Ok(Self::Reference(Some(name.to_string())));
        }

        match (get_text(map, "input_folder"), get_text(map, "filename")) {
            (Some(input_folder), Some(filename)) => Ok(Self::Folder {
                input_folder,
                filename,
            }),
            (Some(_), None) => Err(DescriptorError::MissingField {
                key: key.to_string(),
                section: "input",
                field: "filename",
            }),
            (None, Some(_)) => Err(DescriptorError::MissingField {
                key: key.to_string(),
                section: "input",
                field: "input_folder",
            }),
            (None, None) => Err(DescriptorError::MissingPath {
                key: key.to_string(),
                section: "input",
            }),
        }
    }
}

impl OutputDescriptor {
    /// Classifies an output config value.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, DescriptorError> {
        let map = match value {
            Value::String(s) if !s.is_empty() => return Ok(Self::Path(s.clone())),
            Value::Mapping(map) => map,
            _ => {
                return Err(DescriptorError::MissingPath {
                    key: key.to_string(),
                    section: "output",
                })
            }
        };

        if let Some(path) = get_str(map, "path") {
            return Ok(Self::Path(path.to_string()));
        }

        let output_folder = get_text(map, "output_folder").ok_or(DescriptorError::MissingField {
            key: key.to_string(),
            section: "output",
            field: "output_folder",
        })?;
        let output_name = get_text(map, "output_name").ok_or(DescriptorError::MissingField {
            key: key.to_string(),
            section: "output",
            field: "output_name",
        })?;

        Ok(Self::Folder {
            output_folder,
            output_name,
            file_extension: get_text(map, "file_extension"),
        })
    }
}

impl ParamDescriptor {
    /// Classifies a params config value.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, DescriptorError> {
        let Value::Mapping(map) = value else {
            return Ok(Self::Literal(value.clone()));
        };

        if map.contains_key("function") {
            return FunctionCall::from_mapping(key, map).map(Self::Function);
        }

        match (get_text(map, "name"), get_text(map, "folder")) {
            (Some(name), Some(folder)) => Ok(Self::Folder { name, folder }),
            _ => Err(DescriptorError::Incorrect {
                key: key.to_string(),
                section: "params",
            }),
        }
    }
}

impl FunctionCall {
    /// Parses the mapping that holds a `function` key.
    pub fn from_mapping(key: &str, map: &Mapping) -> Result<Self, DescriptorError> {
        let bad = |reason: &str| DescriptorError::BadFunction {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let function = map
            .get("function")
            .and_then(Value::as_mapping)
            .ok_or_else(|| bad("`function` must be a mapping with `name` and `args`"))?;

        let name = get_str(function, "name")
            .ok_or_else(|| bad("missing function `name`"))?
            .to_string();

        let args = match function.get("args") {
            None | Some(Value::Null) => FunctionArgs::None,
            Some(Value::Sequence(items)) => {
                FunctionArgs::Literal(items.iter().map(scalar_text).collect())
            }
            Some(Value::Mapping(args)) => {
                let from_input = args
                    .get("from_input")
                    .and_then(Value::as_mapping)
                    .ok_or_else(|| bad("`args` mapping must contain `from_input`"))?;

                let mut parsed = Vec::with_capacity(from_input.len());
                for (arg_key, arg_value) in from_input {
                    let arg_key = arg_key
                        .as_str()
                        .ok_or_else(|| bad("`from_input` keys must be strings"))?;
                    parsed.push((arg_key.to_string(), FunctionArg::from_value(arg_key, arg_value)?));
                }
                FunctionArgs::FromInput(parsed)
            }
            Some(other) => FunctionArgs::Literal(vec![scalar_text(other)]),
        };

        Ok(Self {
            name,
            args,
            folder: get_text(map, "folder"),
            filename: get_text(map, "filename"),
        })
    }
}

impl FunctionArg {
    fn from_value(key: &str, value: &Value) -> Result<Self, DescriptorError> {
        if let Value::Mapping(map) = value {
            if map.len() == 1 {
                if let Some(name) = get_str(map, "name") {
                    return Ok(Self::InputAttr(name.to_string()));
                }
            }
        }
        InputDescriptor::from_value(key, value).map(Self::Descriptor)
    }
}

/// A resolved value ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// Emitted inside double quotes
    Quoted(String),
    /// Emitted verbatim (function calls, lambdas, numbers)
    Raw(String),
    /// Dropped from the output; produced by a degraded descriptor
    Empty,
}

impl EntryValue {
    /// The unquoted text of this value.
    pub fn text(&self) -> &str {
        match self {
            Self::Quoted(s) | Self::Raw(s) => s,
            Self::Empty => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Renders the value in target syntax.
    pub fn render(&self) -> String {
        match self {
            Self::Quoted(s) => format!("\"{}\"", s),
            Self::Raw(s) => s.clone(),
            Self::Empty => String::new(),
        }
    }
}

/// A `key=value` line inside a rule section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: EntryValue,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: EntryValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A fully resolved rule.
///
/// Built once by the rule maker and serialized with
/// [`crate::rules::serializer::render_rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    pub description: Option<String>,
    pub inputs: Vec<Entry>,
    pub params: Vec<Entry>,
    pub outputs: Vec<Entry>,
    pub resources: Vec<Entry>,
    pub shell: Vec<String>,
    pub run: Vec<Entry>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Looks up a resolved input by key.
    pub fn input(&self, key: &str) -> Option<&EntryValue> {
        self.inputs.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Looks up a resolved output by key.
    pub fn output(&self, key: &str) -> Option<&EntryValue> {
        self.outputs.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Looks up a resolved param by key.
    pub fn param(&self, key: &str) -> Option<&EntryValue> {
        self.params.iter().find(|e| e.key == key).map(|e| &e.value)
    }
}

/// The raw, unresolved sections of one rule entry.
#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    pub name: String,
    pub input: Option<Mapping>,
    pub output: Option<Mapping>,
    pub params: Option<Mapping>,
    pub shell: Option<Value>,
    pub run: Option<Value>,
    pub resources: Option<Value>,
    pub description: Option<String>,
}

/// Keys a rule entry may carry.
pub const RULE_KEYS: &[&str] = &[
    "input",
    "output",
    "params",
    "shell",
    "run",
    "resources",
    "description",
];

impl RuleConfig {
    /// Splits a rule entry into its sections.
    ///
    /// A rule that is not a mapping, or a section of the wrong kind, makes
    /// the whole configuration unusable and is fatal.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, SnakeMakerError> {
        let map = match value {
            Value::Mapping(map) => map,
            Value::Null => return Ok(Self {
                name: name.to_string(),
                ..Self::default()
            }),
            _ => {
                return Err(SnakeMakerError::ConfigShape(format!(
                    "rule '{}' must be a mapping",
                    name
                )))
            }
        };

        let section = |key: &str| -> Result<Option<Mapping>, SnakeMakerError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Mapping(m)) => Ok(Some(m.clone())),
                Some(_) => Err(SnakeMakerError::ConfigShape(format!(
                    "section '{}' of rule '{}' must be a mapping",
                    key, name
                ))),
            }
        };

        let non_null = |key: &str| map.get(key).filter(|v| !v.is_null()).cloned();

        Ok(Self {
            name: name.to_string(),
            input: section("input")?,
            output: section("output")?,
            params: section("params")?,
            shell: non_null("shell"),
            run: non_null("run"),
            resources: non_null("resources"),
            description: map.get("description").map(scalar_text).filter(|d| !d.is_empty()),
        })
    }
}

/// Renders a param literal: strings quoted unless they are lambdas,
/// numbers and booleans bare, lists as Python literals.
pub fn param_literal(value: &Value) -> EntryValue {
    match value {
        Value::String(s) if s.starts_with("lambda") => EntryValue::Raw(s.clone()),
        Value::String(s) => EntryValue::Quoted(s.clone()),
        Value::Null => EntryValue::Raw("None".to_string()),
        Value::Bool(_) | Value::Number(_) => EntryValue::Raw(scalar_text(value)),
        other => EntryValue::Raw(python_literal(other)),
    }
}
