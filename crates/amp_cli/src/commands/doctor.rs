//! Doctor command implementation.
//!
//! Checks the host for the tools provisioning relies on.

use std::process::{Command, ExitCode};

use anyhow::Result;
use colored::Colorize;

use amp_core::bootstrap::{discover_interpreter, EnvPaths};

use super::AppContext;

/// Run the doctor command.
///
/// Checks:
/// - Python interpreter and docker client
/// - Managed environment state
/// - Settings file
/// - Project directory permissions
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run(app: &AppContext) -> Result<ExitCode> {
    println!("{}", "amp doctor".cyan().bold());
    println!("{}", "==========".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!("  {} amp v{}", "->".green(), amp_core::version());
    println!();

    println!("{}", "Dependencies:".bold());
    match check_python() {
        ToolStatus::Found(version) => {
            println!("  {} Python {} (found in PATH)", "ok".green(), version);
        }
        ToolStatus::NotFound => {
            println!("  {} Python not found in PATH", "!!".yellow());
            println!(
                "     {}",
                "A Python 3 interpreter is required to build the environment.".dimmed()
            );
        }
        ToolStatus::Error(e) => {
            println!("  {} Python check failed: {}", "!!".red(), e);
            all_ok = false;
        }
    }
    match check_docker() {
        ToolStatus::Found(version) => {
            println!("  {} Docker {} (found in PATH)", "ok".green(), version);
        }
        ToolStatus::NotFound => {
            println!("  {} Docker not found in PATH", "!!".yellow());
            println!(
                "     {}",
                "Docker is only required for `amp image build`.".dimmed()
            );
        }
        ToolStatus::Error(e) => {
            println!("  {} Docker check failed: {}", "!!".red(), e);
            all_ok = false;
        }
    }
    println!();

    println!("{}", "Environment:".bold());
    let env = EnvPaths::new(app.venv_dir());
    if env.is_ready() {
        println!(
            "  {} managed environment ready ({})",
            "ok".green(),
            env.venv_dir.display()
        );
    } else {
        println!(
            "  {} no managed environment at {}",
            "!!".yellow(),
            env.venv_dir.display()
        );
        println!("     {}", "Run `amp setup` to create it.".dimmed());
    }
    if app.config_path().exists() {
        println!(
            "  {} settings file present ({})",
            "ok".green(),
            app.config_path().display()
        );
    } else {
        println!(
            "  {} settings file will be created at {}",
            "!!".yellow(),
            app.config_path().display()
        );
    }
    println!();

    println!("{}", "Permissions:".bold());
    let test_file = app.project_dir().join(".amp_write_test");
    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = std::fs::remove_file(&test_file);
            println!(
                "  {} project directory is writable ({})",
                "ok".green(),
                app.project_dir().display()
            );
        }
        Err(e) => {
            println!(
                "  {} cannot write to project directory: {}",
                "!!".red(),
                e
            );
            all_ok = false;
        }
    }
    println!();

    if all_ok {
        println!("{} All checks passed!", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Some checks failed. See above for details.",
            "WARNING".yellow().bold()
        );
        Ok(ExitCode::from(1))
    }
}

/// Status of an external tool check.
enum ToolStatus {
    Found(String),
    NotFound,
    Error(String),
}

fn parse_python_version(output: &str) -> Option<String> {
    output
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("Python "))
        .map(|v| v.trim().to_string())
}

fn parse_docker_version(output: &str) -> Option<String> {
    output
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("Docker version "))
        .and_then(|rest| rest.split(',').next())
        .map(|v| v.trim().to_string())
}

/// Check for a Python 3 interpreter and get its version.
fn check_python() -> ToolStatus {
    let Some(python) = discover_interpreter(None) else {
        return ToolStatus::NotFound;
    };

    match Command::new(&python).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version =
                parse_python_version(&stdout).unwrap_or_else(|| "unknown".to_string());
            ToolStatus::Found(version)
        }
        Ok(output) => ToolStatus::Error(format!(
            "{} exited with status: {}",
            python.display(),
            output.status
        )),
        Err(e) => ToolStatus::Error(e.to_string()),
    }
}

/// Check if the docker client is installed and get its version.
fn check_docker() -> ToolStatus {
    let result = Command::new("docker").arg("--version").output();

    match result {
        Ok(output) => {
            if output.status.success() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let version =
                    parse_docker_version(&stdout).unwrap_or_else(|| "unknown".to_string());
                ToolStatus::Found(version)
            } else {
                ToolStatus::Error(format!("docker exited with status: {}", output.status))
            }
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolStatus::NotFound
            } else {
                ToolStatus::Error(e.to_string())
            }
        }
    }
}
