//! SnakeMaker - Snakemake Workflow Generator
//!
//! Generates Snakemake rule files and a main Snakefile from JSON/YAML
//! pipeline configurations. One rule's output can be referenced by name as
//! another rule's input; function calls depending on a wildcard are
//! emitted as deferred `lambda wildcards:` expressions.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`rules`]: Descriptors, name registry and `rules.smk` generation
//! - [`snakefile`]: Main `Snakemake.smk` assembly
//! - [`environment`]: Application settings and path roots
//! - [`samples`]: Sample list loading
//! - [`scripts`]: Launcher shell scripts
//! - [`generator`]: A complete generation pass
//!
//! # Example
//!
//! ```rust,no_run
//! use snakemaker::environment::PathRoots;
//! use snakemaker::rules::RuleMaker;
//! use snakemaker::load_config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("config/rules.yaml")?;
//!
//!     let roots = PathRoots::new("/data/input", "/data/output/rules", "/data/output");
//!     let mut maker = RuleMaker::new(roots);
//!     maker.from_config(&config)?;
//!
//!     for diagnostic in maker.diagnostics() {
//!         eprintln!("{}", diagnostic);
//!     }
//!     maker.write()?;
//!     Ok(())
//! }
//! ```

pub mod environment;
pub mod error;
pub mod generator;
pub mod loader;
pub mod rules;
pub mod samples;
pub mod scripts;
pub mod snakefile;

// Re-export commonly used types
pub use environment::{PathRoots, Settings};
pub use error::{DescriptorError, Result, SnakeMakerError};
pub use generator::{generate, GenerationReport, GenerationRequest};
pub use loader::load_config;
pub use rules::{RuleMaker, RuleSpec};
pub use snakefile::{SnakefileConfig, SnakefileMaker};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "SnakeMaker";
