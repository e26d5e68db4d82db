//! Expression Builder
//!
//! Turns typed descriptors into the text fragments that appear in a rule:
//! quoted paths, direct function calls, or deferred `lambda wildcards:`
//! expressions when a call depends on a wildcard.

use log::debug;

use super::model::{
    param_literal, Entry, EntryValue, FunctionArg, FunctionArgs, FunctionCall, InputDescriptor,
    OutputDescriptor, ParamDescriptor, BASE_INPUT_DIR_FUNCTION,
};
use super::registry::NameRegistry;
use super::wildcards::{defer_wildcards, has_wildcards, DEFAULT_WILDCARDS};
use crate::environment::{PathRoots, OUTPUT_PATH_VARIABLE};
use crate::error::DescriptorError;

/// Rule section a function descriptor appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Input,
    Params,
    Run,
}

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::Input => "input",
            Section::Params => "params",
            Section::Run => "run",
        }
    }
}

/// Resolves descriptors against the path roots and the name registry.
pub struct ExpressionBuilder<'a> {
    roots: &'a PathRoots,
    wildcards: &'a [String],
}

impl<'a> ExpressionBuilder<'a> {
    pub fn new(roots: &'a PathRoots, wildcards: &'a [String]) -> Self {
        Self { roots, wildcards }
    }

    /// The per-sample path token, `{sample}` unless configured otherwise.
    fn sample_token(&self) -> String {
        let name = self
            .wildcards
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_WILDCARDS[0]);
        format!("{{{}}}", name)
    }

    /// `{input_dir}/{folder}/{sample}/{filename}`, or
    /// `{output_path}/{folder}/{filename}` in shortened mode.
    pub fn input_folder_path(&self, folder: &str, filename: &str) -> String {
        if self.roots.shortened {
            format!("{{{}}}/{}/{}", OUTPUT_PATH_VARIABLE, folder, filename)
        } else {
            self.absolute_input_path(folder, filename)
        }
    }

    /// Layout of `base_input_dir`, which keeps the sample segment in both
    /// modes.
    pub fn base_input_path(&self, folder: &str, filename: &str) -> String {
        if self.roots.shortened {
            format!(
                "{{{}}}/{}/{}/{}",
                OUTPUT_PATH_VARIABLE,
                folder,
                self.sample_token(),
                filename
            )
        } else {
            self.absolute_input_path(folder, filename)
        }
    }

    /// `{rule_dir}/{folder}/{sample}/{name}`, or relative to `{output_path}`
    /// in shortened mode.
    pub fn rule_folder_path(&self, folder: &str, name: &str) -> String {
        if self.roots.shortened {
            format!(
                "{{{}}}/{}/{}/{}",
                OUTPUT_PATH_VARIABLE,
                folder,
                self.sample_token(),
                name
            )
        } else {
            self.absolute_rule_path(folder, name)
        }
    }

    fn absolute_input_path(&self, folder: &str, filename: &str) -> String {
        PathRoots::join(&self.roots.input_dir, &[folder, &self.sample_token(), filename])
    }

    fn absolute_rule_path(&self, folder: &str, name: &str) -> String {
        PathRoots::join(&self.roots.rule_dir, &[folder, &self.sample_token(), name])
    }

    /// Resolves an input entry, preferring a value already registered
    /// under the same key.
    pub fn resolve_input(
        &self,
        key: &str,
        descriptor: &InputDescriptor,
        registry: &NameRegistry,
    ) -> Result<EntryValue, DescriptorError> {
        if let Some(value) = registry.resolve(key) {
            debug!("Input '{}' resolved from registry: {}", key, value.text());
            return Ok(value.clone());
        }
        self.input(key, descriptor, registry)
    }

    /// Resolves an input descriptor without the registry shortcut.
    pub fn input(
        &self,
        key: &str,
        descriptor: &InputDescriptor,
        registry: &NameRegistry,
    ) -> Result<EntryValue, DescriptorError> {
        match descriptor {
            InputDescriptor::Path(path) => Ok(EntryValue::Quoted(path.clone())),
            InputDescriptor::Folder {
                input_folder,
                filename,
            } => Ok(EntryValue::Quoted(
                self.input_folder_path(input_folder, filename),
            )),
            InputDescriptor::Reference(target) => {
                let name = target.as_deref().unwrap_or(key);
                registry
                    .resolve(name)
                    .cloned()
                    .ok_or_else(|| DescriptorError::Unresolved {
                        key: key.to_string(),
                        name: name.to_string(),
                    })
            }
            InputDescriptor::Function(call) => self.function(key, call, registry, Section::Input),
        }
    }

    /// Resolves an output descriptor.
    pub fn output(&self, descriptor: &OutputDescriptor) -> EntryValue {
        match descriptor {
            OutputDescriptor::Path(path) => EntryValue::Quoted(path.clone()),
            OutputDescriptor::Folder {
                output_folder,
                output_name,
                file_extension,
            } => {
                let name = with_extension(output_name, file_extension.as_deref());
                EntryValue::Quoted(self.rule_folder_path(output_folder, &name))
            }
        }
    }

    /// Resolves a params descriptor.
    pub fn param(
        &self,
        key: &str,
        descriptor: &ParamDescriptor,
        registry: &NameRegistry,
    ) -> Result<EntryValue, DescriptorError> {
        match descriptor {
            ParamDescriptor::Literal(value) => Ok(param_literal(value)),
            // Absolute in both modes
            ParamDescriptor::Folder { name, folder } => {
                Ok(EntryValue::Quoted(self.absolute_rule_path(folder, name)))
            }
            ParamDescriptor::Function(call) => self.function(key, call, registry, Section::Params),
        }
    }

    /// Builds the expression for a function descriptor in the input or
    /// params section.
    ///
    /// A call whose text carries a wildcard after argument resolution is
    /// deferred: wildcards become `{wildcards.name}` and the call is
    /// wrapped in `lambda wildcards: ...`. Arguments taken from the rule's
    /// own inputs always need the `lambda wildcards, input:` form.
    pub fn function(
        &self,
        key: &str,
        call: &FunctionCall,
        registry: &NameRegistry,
        section: Section,
    ) -> Result<EntryValue, DescriptorError> {
        if call.name == BASE_INPUT_DIR_FUNCTION && section != Section::Run {
            let missing = |field: &'static str| DescriptorError::MissingField {
                key: key.to_string(),
                section: section.name(),
                field,
            };
            let folder = call.folder.as_deref().ok_or_else(|| missing("folder"))?;
            let filename = call.filename.as_deref().ok_or_else(|| missing("filename"))?;
            return Ok(EntryValue::Quoted(self.base_input_path(folder, filename)));
        }

        let args = match &call.args {
            FunctionArgs::None => return Ok(EntryValue::Raw(format!("{}()", call.name))),
            FunctionArgs::Literal(args) => {
                return Ok(EntryValue::Raw(format!("{}({})", call.name, args.join(", "))))
            }
            FunctionArgs::FromInput(args) => args,
        };

        let mut rendered = Vec::with_capacity(args.len());
        let mut uses_input = false;

        for (arg_key, arg) in args {
            match arg {
                FunctionArg::InputAttr(name) => {
                    rendered.push(format!("input.{}", name));
                    uses_input = true;
                }
                FunctionArg::Descriptor(descriptor) => {
                    match self.resolve_argument(arg_key, descriptor, registry)? {
                        EntryValue::Quoted(path) => rendered.push(format!("f'{}'", path)),
                        // A deferred expression cannot stand in for a path
                        EntryValue::Raw(expr) if is_deferred(&expr) => {
                            return Err(DescriptorError::Incorrect {
                                key: key.to_string(),
                                section: section.name(),
                            })
                        }
                        EntryValue::Raw(expr) => rendered.push(expr),
                        EntryValue::Empty => {
                            return Err(DescriptorError::Unresolved {
                                key: key.to_string(),
                                name: arg_key.clone(),
                            })
                        }
                    }
                }
            }
        }

        let call_text = format!("{}({})", call.name, rendered.join(", "));
        let lambda_args = if uses_input { "wildcards, input" } else { "wildcards" };

        if has_wildcards(&call_text) {
            let deferred = defer_wildcards(&call_text, self.wildcards);
            debug!("Deferring '{}' for '{}': wildcard in arguments", call.name, key);
            Ok(EntryValue::Raw(format!("lambda {}: {}", lambda_args, deferred)))
        } else if uses_input {
            Ok(EntryValue::Raw(format!("lambda {}: {}", lambda_args, call_text)))
        } else {
            Ok(EntryValue::Raw(call_text))
        }
    }

    /// Resolves a `from_input` argument. Registered names win; folder
    /// descriptors use the absolute input layout in both modes.
    fn resolve_argument(
        &self,
        key: &str,
        descriptor: &InputDescriptor,
        registry: &NameRegistry,
    ) -> Result<EntryValue, DescriptorError> {
        if let Some(value) = registry.resolve(key) {
            return Ok(value.clone());
        }
        match descriptor {
            InputDescriptor::Folder {
                input_folder,
                filename,
            } => Ok(EntryValue::Quoted(
                self.absolute_input_path(input_folder, filename),
            )),
            other => self.input(key, other, registry),
        }
    }

    /// Builds the lines of a `run:` section from a function descriptor.
    ///
    /// Each `from_input` argument becomes `ARG=NAME(input.X)`, where X is
    /// the argument's `name` (or reference target) and defaults to the
    /// argument key.
    pub fn run_entries(&self, call: &FunctionCall) -> Vec<Entry> {
        match &call.args {
            FunctionArgs::None => vec![Entry::new("", EntryValue::Raw(format!("{}()", call.name)))],
            FunctionArgs::Literal(args) => vec![Entry::new(
                "",
                EntryValue::Raw(format!("{}({})", call.name, args.join(", "))),
            )],
            FunctionArgs::FromInput(args) => args
                .iter()
                .map(|(arg_key, arg)| {
                    let attr = match arg {
                        FunctionArg::InputAttr(name) => name.as_str(),
                        FunctionArg::Descriptor(InputDescriptor::Reference(Some(name))) => {
                            name.as_str()
                        }
                        FunctionArg::Descriptor(_) => arg_key.as_str(),
                    };
                    Entry::new(
                        arg_key.clone(),
                        EntryValue::Raw(format!("{}(input.{})", call.name, attr)),
                    )
                })
                .collect(),
        }
    }
}

fn is_deferred(expr: &str) -> bool {
    expr.trim_start().starts_with("lambda")
}

/// Appends `.ext` to `name` unless it already ends with it.
fn with_extension(name: &str, extension: Option<&str>) -> String {
    match extension.map(|e| e.trim_start_matches('.')).filter(|e| !e.is_empty()) {
        Some(ext) if !name.ends_with(&format!(".{}", ext)) => format!("{}.{}", name, ext),
        _ => name.to_string(),
    }
}
