//! Environment Module
//!
//! Application settings, environment-variable overrides and the directory
//! roots generated paths are built from.

pub mod settings;

pub use settings::{PathRoots, Settings, DEFAULT_SETTINGS_PATH, OUTPUT_PATH_VARIABLE};
