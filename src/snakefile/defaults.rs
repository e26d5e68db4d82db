//! Main Snakefile defaults.

use serde_yaml::{Mapping, Value};

/// Output file name of the main Snakefile.
pub const SNAKEFILE_NAME: &str = "Snakemake.smk";

/// Imports emitted when the configuration names none.
pub const DEFAULT_IMPORTS: &[&str] = &[
    "from datetime import datetime",
    "import numpy as np",
    "import re",
];

/// `global_path` value meaning the rule output directory.
pub const DEFAULT_GLOBAL_PATH: &str = "default";

/// Token in main-file rules replaced by the Snakefile directory.
pub const DEFAULT_PATH_TOKEN: &str = "{default_path}";

/// Constraint emitted for `wildcard_constraints: default`.
pub const DEFAULT_WILDCARD_CONSTRAINTS: &[(&str, &str)] =
    &[("sample", "'|'.join([re.escape(x) for x in samples])")];

/// `{global_path: default, rules: [rules.smk]}`
pub fn default_include() -> Value {
    let mut include = Mapping::new();
    include.insert("global_path".into(), DEFAULT_GLOBAL_PATH.into());
    include.insert(
        "rules".into(),
        Value::Sequence(vec![crate::rules::RULES_FILE_NAME.into()]),
    );
    Value::Mapping(include)
}

/// `{samples: {}, wildcard_constraints: default}`: samples come from the
/// caller's sample list.
pub fn default_vars() -> Mapping {
    let mut vars = Mapping::new();
    vars.insert("samples".into(), Value::Mapping(Mapping::new()));
    vars.insert("wildcard_constraints".into(), "default".into());
    vars
}
