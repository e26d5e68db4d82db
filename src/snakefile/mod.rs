//! Main Snakefile Module
//!
//! Assembles `Snakemake.smk`: imports, includes of the generated rules
//! file, variables, wildcard constraints, config variables and the rules
//! defined directly in the main file.

pub mod defaults;
pub mod maker;

pub use defaults::SNAKEFILE_NAME;
pub use maker::{SnakefileConfig, SnakefileMaker};
