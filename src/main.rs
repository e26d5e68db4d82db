//! SnakeMaker CLI Entry Point
//!
//! Generates `rules.smk`, `Snakemake.smk` and the launcher scripts from a
//! settings file.
//!
//! # Usage
//!
//! ```bash
//! # Use the default settings file
//! snakemaker
//!
//! # Explicit settings file
//! snakemaker config/settings.yaml
//!
//! # Override the rule configuration and the sample list
//! snakemaker config/settings.yaml --rules pipelines/dwi.yaml --samples subjects.txt
//!
//! # Absolute paths instead of paths relative to `output_path`
//! snakemaker --full-paths
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info, warn};
use serde_yaml::Value;

use snakemaker::environment::DEFAULT_SETTINGS_PATH;
use snakemaker::samples::load_samples;
use snakemaker::{generate, load_config, GenerationReport, GenerationRequest, Settings};
use snakemaker::{APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    settings_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    snakefile_path: Option<PathBuf>,
    samples_path: Option<PathBuf>,
    full_paths: bool,
    no_scripts: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Snakemake Workflow Generator");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: snakemaker [OPTIONS] [SETTINGS_FILE]");
    println!();
    println!("Arguments:");
    println!("  [SETTINGS_FILE]     Path to settings YAML (default: {})", DEFAULT_SETTINGS_PATH.display());
    println!();
    println!("Options:");
    println!("  --rules FILE        Rule configuration (JSON or YAML)");
    println!("  --snakefile FILE    Main Snakefile configuration (JSON or YAML)");
    println!("  --samples FILE      Sample list (.txt, .csv, .json or .yaml)");
    println!("  --full-paths        Emit absolute paths instead of output_path-relative ones");
    println!("  --no-scripts        Do not write dry_run.sh and run.sh");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  snakemaker config/settings.yaml");
    println!("  snakemaker --rules rules.yaml --samples samples.txt");
    println!("  snakemaker config/settings.yaml --full-paths --no-scripts");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    let value = |i: usize, flag: &str| -> Result<PathBuf, String> {
        args.get(i)
            .map(PathBuf::from)
            .ok_or_else(|| format!("{} requires a path argument", flag))
    };

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--full-paths" => {
                config.full_paths = true;
            }
            "--no-scripts" => {
                config.no_scripts = true;
            }
            "--rules" => {
                i += 1;
                config.rules_path = Some(value(i, "--rules")?);
            }
            "--snakefile" => {
                i += 1;
                config.snakefile_path = Some(value(i, "--snakefile")?);
            }
            "--samples" => {
                i += 1;
                config.samples_path = Some(value(i, "--samples")?);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.settings_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.settings_path = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Loads settings and applies environment and command-line overrides.
fn load_settings(config: &Config) -> Result<Settings, Box<dyn std::error::Error>> {
    let path = config
        .settings_path
        .clone()
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.clone());

    let mut settings = if path.exists() {
        Settings::from_path(&path)?
    } else if config.rules_path.is_some() {
        warn!("Settings file {} not found, using defaults", path.display());
        Settings {
            base_dir: env::current_dir()?,
            ..Settings::default()
        }
    } else {
        return Err(format!("Settings file not found: {}", path.display()).into());
    };

    settings.apply_env_overrides();
    if config.full_paths {
        settings.shortened = false;
    }
    Ok(settings)
}

/// Builds the generation request, honouring `--rules`, `--snakefile`
/// and `--samples`.
fn build_request(
    config: &Config,
    settings: &mut Settings,
) -> Result<GenerationRequest, Box<dyn std::error::Error>> {
    let cwd = env::current_dir()?;
    let absolute = |p: &PathBuf| if p.is_absolute() { p.clone() } else { cwd.join(p) };

    if let Some(rules) = &config.rules_path {
        settings.configuration_files.rule_configuration =
            Some(absolute(rules).to_string_lossy().into_owned());
    }
    if let Some(snakefile) = &config.snakefile_path {
        settings.configuration_files.snakefile_configuration =
            Some(absolute(snakefile).to_string_lossy().into_owned());
    }

    let mut request = GenerationRequest::from_settings(settings)?;
    request.write_scripts = !config.no_scripts;

    if let Some(samples) = &config.samples_path {
        let source = Value::String(absolute(samples).to_string_lossy().into_owned());
        request.samples = load_samples(&source, &cwd, settings.sample_level)?;
    }

    Ok(request)
}

/// Prints the colored generation summary.
fn print_summary(report: &GenerationReport) {
    println!();
    println!("{}", "Generation complete".green().bold());
    println!("  Rules:      {} ({})", report.rules_path.display(), report.rule_names.len());
    println!("  Snakefile:  {}", report.snakefile_path.display());
    for script in &report.scripts {
        println!("  Script:     {}", script.display());
    }
    println!("  Samples:    {}", report.sample_count);

    if report.diagnostics.is_empty() {
        println!("  Problems:   {}", "none".green());
    } else {
        println!(
            "  Problems:   {}",
            format!("{} entries left empty", report.diagnostics.len()).yellow()
        );
        for diagnostic in &report.diagnostics {
            println!("    {} {}", "-".yellow(), diagnostic);
        }
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    let mut settings = load_settings(&config)?;
    if !settings.shortened {
        info!("Mode: FULL PATHS");
    }

    let request = build_request(&config, &mut settings).map_err(|e| {
        error!("Failed to prepare generation: {}", e);
        e
    })?;

    info!(
        "Generating into {} (rules: {})",
        request.roots.snakefile_dir.display(),
        request.roots.rule_dir.display()
    );

    let report = generate(&request)?;
    print_summary(&report);

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("snakemaker")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&[])).unwrap();
        assert!(config.settings_path.is_none());
        assert!(!config.full_paths);
        assert!(!config.no_scripts);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_arguments(&args(&[
            "settings.yaml",
            "--rules",
            "r.yaml",
            "--samples",
            "s.txt",
            "--full-paths",
            "--no-scripts",
            "-v",
        ]))
        .unwrap();

        assert_eq!(config.settings_path, Some(PathBuf::from("settings.yaml")));
        assert_eq!(config.rules_path, Some(PathBuf::from("r.yaml")));
        assert_eq!(config.samples_path, Some(PathBuf::from("s.txt")));
        assert!(config.full_paths);
        assert!(config.no_scripts);
        assert!(config.verbose);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&["--rules"])).is_err());
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
    }
}
