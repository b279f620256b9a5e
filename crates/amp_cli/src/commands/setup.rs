//! Setup command implementation.
//!
//! Builds or refreshes the managed virtual environment from the
//! dependency manifest.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use amp_core::bootstrap::{EnvBuilder, PackageIndex};

use super::AppContext;

/// Run the setup command.
///
/// Flags override the settings file; anything not given falls back to
/// the configured paths.
#[allow(clippy::too_many_arguments)]
pub fn run(
    app: &AppContext,
    manifest: Option<PathBuf>,
    venv: Option<PathBuf>,
    python: Option<PathBuf>,
    hardware: Option<String>,
    index_url: Option<String>,
    force: bool,
) -> Result<ExitCode> {
    let manifest_path = manifest.unwrap_or_else(|| app.manifest_path());
    let venv_dir = venv.unwrap_or_else(|| app.venv_dir());

    // An explicit URL wins over the hardware shorthand.
    let index = index_url
        .map(PackageIndex::Custom)
        .or_else(|| hardware.as_deref().and_then(PackageIndex::from_hardware));

    println!("{} {}", "Manifest:".cyan().bold(), manifest_path.display());
    println!("{} {}", "Environment:".cyan().bold(), venv_dir.display());
    if let Some(index) = &index {
        println!("{} {}", "Package index:".cyan().bold(), index.url());
    }

    let logger = app.run_logger("setup")?;

    let mut builder = EnvBuilder::new(&manifest_path, &venv_dir).force(force);
    if let Some(python) = python {
        builder = builder.interpreter(python);
    }
    if let Some(index) = index {
        builder = builder.index(index);
    }

    let report = builder.run(&logger)?;
    if report.skipped {
        println!(
            "{} environment already matches the manifest ({} packages)",
            "UP-TO-DATE".green().bold(),
            report.package_count
        );
    } else {
        println!(
            "{} environment ready at {} ({} packages)",
            "SUCCESS".green().bold(),
            venv_dir.display(),
            report.package_count
        );
    }
    Ok(ExitCode::SUCCESS)
}
