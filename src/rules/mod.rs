//! Rule Generation Module
//!
//! Turns a rule configuration into the text of `rules.smk`.
//!
//! # Components
//!
//! - [`model`]: Typed descriptors and the resolved rule representation
//! - [`registry`]: Name registry shared across rules
//! - [`wildcards`]: Wildcard detection and deferral
//! - [`expression`]: Descriptor to expression resolution
//! - [`serializer`]: Rule block rendering
//! - [`validator`]: Pre-generation checks
//! - [`maker`]: The generation pass tying these together

pub mod expression;
pub mod maker;
pub mod model;
pub mod registry;
pub mod serializer;
pub mod validator;
pub mod wildcards;

pub use expression::ExpressionBuilder;
pub use maker::{Diagnostic, RuleMaker, RULES_FILE_NAME};
pub use model::{Entry, EntryValue, RuleConfig, RuleSpec};
pub use registry::NameRegistry;
pub use serializer::{render_rule, render_rules};
pub use validator::{quick_validate, validate_rule_config, ValidationWarning};
