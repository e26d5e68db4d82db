//! Launcher Scripts
//!
//! Writes `dry_run.sh` and `run.sh` next to the main Snakefile so the
//! generated workflow can be checked and started without remembering the
//! Snakemake flags.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;

use crate::error::{Result, SnakeMakerError};
use crate::snakefile::SNAKEFILE_NAME;

pub const DRY_RUN_SCRIPT: &str = "dry_run.sh";
pub const RUN_SCRIPT: &str = "run.sh";

/// Command previewing the job graph.
pub fn dry_run_command() -> String {
    format!("snakemake all --dry-run --debug-dag --snakefile {}", SNAKEFILE_NAME)
}

/// Command running the whole workflow.
pub fn run_command() -> String {
    format!(
        "snakemake all --cores all --debug-dag --keep-going --snakefile {}",
        SNAKEFILE_NAME
    )
}

/// Writes an executable bash script containing `command`.
pub fn write_script(path: &Path, command: &str) -> Result<()> {
    let write_err = |source| SnakeMakerError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(write_err)?;
    writeln!(file, "#!/bin/bash").map_err(write_err)?;
    writeln!(
        file,
        "# Generated by SnakeMaker on {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
    .map_err(write_err)?;
    writeln!(file, "{}", command).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(write_err)?;
    }

    info!("Shell script created: {}", path.display());
    Ok(())
}

/// Writes both launcher scripts into `dir`.
pub fn write_launcher_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| SnakeMakerError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let scripts = [
        (DRY_RUN_SCRIPT, dry_run_command()),
        (RUN_SCRIPT, run_command()),
    ];

    let mut written = Vec::with_capacity(scripts.len());
    for (name, command) in scripts {
        let path = dir.join(name);
        write_script(&path, &command)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_commands() {
        assert_eq!(
            dry_run_command(),
            "snakemake all --dry-run --debug-dag --snakefile Snakemake.smk"
        );
        assert!(run_command().contains("--cores all"));
        assert!(run_command().contains("--keep-going"));
    }

    #[test]
    fn test_write_launcher_scripts() {
        let temp_dir = tempdir().unwrap();
        let out = temp_dir.path().join("workflow");

        let written = write_launcher_scripts(&out).unwrap();
        assert_eq!(written, vec![out.join(DRY_RUN_SCRIPT), out.join(RUN_SCRIPT)]);

        let content = std::fs::read_to_string(out.join(DRY_RUN_SCRIPT)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "#!/bin/bash");
        assert!(lines[1].starts_with("# Generated by SnakeMaker on "));
        assert_eq!(lines[2], dry_run_command());
    }

    #[cfg(unix)]
    #[test]
    fn test_scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("x.sh");
        write_script(&path, "echo hi").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
