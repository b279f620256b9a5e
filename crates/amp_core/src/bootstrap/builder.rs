//! Environment builder: venv creation and dependency installation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::logging::RunLogger;
use crate::manifest::{Manifest, ManifestError};

use super::paths::{discover_interpreter, EnvPaths};

/// Errors fatal to environment setup.
///
/// There are no retries; the only recovery is to fix the cause and
/// re-run, which rebuilds from a clean state.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("No usable Python interpreter ({0})")]
    MissingInterpreter(String),

    #[error("Dependency manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid dependency manifest: {0}")]
    InvalidManifest(#[source] ManifestError),

    #[error("Failed to create virtual environment: {0}")]
    CreateVenv(String),

    #[error("Failed to install {what}: {message}")]
    InstallFailure { what: String, message: String },

    #[error("I/O error during setup: {0}")]
    Io(#[from] io::Error),
}

pub type SetupResult<T> = Result<T, SetupError>;

/// Alternate package index for hardware-specific torch wheels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageIndex {
    /// CPU-only wheels.
    Cpu,
    /// CUDA 12.1 wheels.
    Cuda121,
    /// Caller-supplied index URL.
    Custom(String),
}

impl PackageIndex {
    /// Index URL passed to the installer.
    pub fn url(&self) -> &str {
        match self {
            PackageIndex::Cpu => "https://download.pytorch.org/whl/cpu",
            PackageIndex::Cuda121 => "https://download.pytorch.org/whl/cu121",
            PackageIndex::Custom(url) => url,
        }
    }

    /// Map a hardware variant name to its index.
    pub fn from_hardware(name: &str) -> Option<Self> {
        match name {
            "cpu" => Some(PackageIndex::Cpu),
            "cu121" => Some(PackageIndex::Cuda121),
            _ => None,
        }
    }
}

/// Summary of a completed setup run.
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub venv_dir: PathBuf,

    /// Interpreter the environment was bootstrapped from; `None` when
    /// the run was skipped because the environment was already current.
    pub interpreter: Option<PathBuf>,

    pub package_count: usize,
    pub manifest_digest: String,

    /// True when the environment was already up to date.
    pub skipped: bool,
}

/// Sequential, fail-fast builder for the service's virtual environment.
///
/// Stage order: manifest validation, up-to-date check, interpreter
/// discovery, venv creation, installer upgrade, dependency install,
/// stamp write. The manifest is validated before anything touches the
/// filesystem, so a bad manifest never leaves a partial environment.
#[derive(Debug, Clone)]
pub struct EnvBuilder {
    manifest_path: PathBuf,
    venv_dir: PathBuf,
    interpreter: Option<PathBuf>,
    index: Option<PackageIndex>,
    force: bool,
}

impl EnvBuilder {
    pub fn new(manifest_path: impl Into<PathBuf>, venv_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            venv_dir: venv_dir.into(),
            interpreter: None,
            index: None,
            force: false,
        }
    }

    /// Bootstrap from a specific interpreter instead of searching PATH.
    pub fn interpreter(mut self, path: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(path.into());
        self
    }

    /// Install from an alternate package index.
    pub fn index(mut self, index: PackageIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Rebuild even when the stamp says the environment is current.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Run the full setup sequence.
    pub fn run(&self, logger: &RunLogger) -> SetupResult<EnvReport> {
        let manifest = Manifest::load(&self.manifest_path).map_err(|e| match e {
            ManifestError::NotFound(path) => SetupError::ManifestNotFound(path),
            other => SetupError::InvalidManifest(other),
        })?;
        let digest = manifest.digest();
        let package_count = manifest.requirements().count();
        let paths = EnvPaths::new(&self.venv_dir);

        logger.section("Environment");
        logger.info(&format!(
            "Manifest: {} ({} packages)",
            self.manifest_path.display(),
            package_count
        ));
        logger.info(&format!("Target: {}", paths.venv_dir.display()));

        if !self.force && paths.is_ready() && read_stamp(&paths).as_deref() == Some(digest.as_str())
        {
            logger.success("Environment is up to date");
            return Ok(EnvReport {
                venv_dir: paths.venv_dir,
                interpreter: None,
                package_count,
                manifest_digest: digest,
                skipped: true,
            });
        }

        let interpreter = discover_interpreter(self.interpreter.as_deref()).ok_or_else(|| {
            SetupError::MissingInterpreter(match &self.interpreter {
                Some(path) => format!("{} does not exist", path.display()),
                None => "no python3 or python on PATH".to_string(),
            })
        })?;
        logger.info(&format!("Interpreter: {}", interpreter.display()));

        // A stale stamp must not survive a failed reinstall.
        let stamp = paths.stamp_path();
        if stamp.exists() {
            fs::remove_file(&stamp)?;
        }

        logger.phase("Create virtual environment");
        logger.progress(25, "creating environment");
        if paths.is_ready() {
            logger.info("Reusing existing virtual environment");
        } else {
            create_venv(&interpreter, &paths, logger)?;
        }

        logger.phase("Upgrade installer");
        logger.progress(50, "upgrading pip");
        upgrade_pip(&paths, logger)?;

        logger.phase("Install dependencies");
        logger.progress(75, "installing packages");
        install_requirements(&paths, &manifest, self.index.as_ref(), logger)?;

        write_stamp(&paths, &digest)?;
        logger.progress(100, "environment ready");
        logger.success(&format!(
            "Installed {} packages into {}",
            package_count,
            paths.venv_dir.display()
        ));

        Ok(EnvReport {
            venv_dir: paths.venv_dir,
            interpreter: Some(interpreter),
            package_count,
            manifest_digest: digest,
            skipped: false,
        })
    }
}

fn create_venv(interpreter: &Path, paths: &EnvPaths, logger: &RunLogger) -> SetupResult<()> {
    if let Some(parent) = paths.venv_dir.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    logger.command(&format!(
        "{} -m venv {}",
        interpreter.display(),
        paths.venv_dir.display()
    ));
    let output = Command::new(interpreter)
        .args(["-m", "venv"])
        .arg(&paths.venv_dir)
        .output()
        .map_err(|e| SetupError::CreateVenv(e.to_string()))?;

    if !output.status.success() {
        return Err(SetupError::CreateVenv(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

fn upgrade_pip(paths: &EnvPaths, logger: &RunLogger) -> SetupResult<()> {
    logger.command(&format!(
        "{} -m pip install --upgrade pip",
        paths.python.display()
    ));
    let output = Command::new(&paths.python)
        .args(["-m", "pip", "install", "--upgrade", "pip"])
        .output()
        .map_err(|e| SetupError::InstallFailure {
            what: "pip upgrade".to_string(),
            message: e.to_string(),
        })?;
    log_output(logger, &output);

    if !output.status.success() {
        logger.show_tail("pip upgrade");
        return Err(SetupError::InstallFailure {
            what: "pip upgrade".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn install_requirements(
    paths: &EnvPaths,
    manifest: &Manifest,
    index: Option<&PackageIndex>,
    logger: &RunLogger,
) -> SetupResult<()> {
    let mut args: Vec<String> = vec![
        "install".to_string(),
        "-r".to_string(),
        manifest.path().display().to_string(),
        "--no-warn-script-location".to_string(),
    ];
    if let Some(index) = index {
        args.push("--index-url".to_string());
        args.push(index.url().to_string());
    }

    debug!("Running: {} {}", paths.pip.display(), args.join(" "));
    logger.command(&format!("{} {}", paths.pip.display(), args.join(" ")));

    let output = Command::new(&paths.pip)
        .args(&args)
        .output()
        .map_err(|e| SetupError::InstallFailure {
            what: format!("packages from {}", manifest.path().display()),
            message: e.to_string(),
        })?;
    log_output(logger, &output);

    if !output.status.success() {
        logger.show_tail("pip install");
        return Err(SetupError::InstallFailure {
            what: format!("packages from {}", manifest.path().display()),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn log_output(logger: &RunLogger, output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        logger.output_line(line, false);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        logger.output_line(line, true);
    }
}

fn read_stamp(paths: &EnvPaths) -> Option<String> {
    fs::read_to_string(paths.stamp_path())
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|digest| !digest.is_empty())
}

fn write_stamp(paths: &EnvPaths, digest: &str) -> SetupResult<()> {
    fs::write(paths.stamp_path(), format!("{}\n", digest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_tracing;

    fn test_logger(dir: &Path) -> RunLogger {
        RunLogger::new("setup-test", &dir.join("logs")).unwrap()
    }

    fn fake_ready_env(paths: &EnvPaths) {
        fs::create_dir_all(paths.python.parent().unwrap()).unwrap();
        fs::write(&paths.python, "").unwrap();
        fs::write(&paths.pip, "").unwrap();
    }

    #[test]
    fn missing_manifest_leaves_no_trace() {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        let venv = dir.path().join(".venv");
        let logger = test_logger(dir.path());

        let result = EnvBuilder::new(dir.path().join("requirements.txt"), &venv).run(&logger);
        assert!(matches!(result, Err(SetupError::ManifestNotFound(_))));
        assert!(!venv.exists());
    }

    #[test]
    fn missing_interpreter_before_any_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "fastapi==0.111.0\n").unwrap();
        let venv = dir.path().join(".venv");
        let logger = test_logger(dir.path());

        let result = EnvBuilder::new(&manifest, &venv)
            .interpreter(dir.path().join("no-such-python"))
            .run(&logger);
        assert!(matches!(result, Err(SetupError::MissingInterpreter(_))));
        assert!(!venv.exists());
    }

    #[test]
    fn up_to_date_environment_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "demucs==4.0.1\n").unwrap();
        let venv = dir.path().join(".venv");

        let paths = EnvPaths::new(&venv);
        fake_ready_env(&paths);
        let digest = Manifest::load(&manifest).unwrap().digest();
        write_stamp(&paths, &digest).unwrap();

        let logger = test_logger(dir.path());
        let report = EnvBuilder::new(&manifest, &venv).run(&logger).unwrap();
        assert!(report.skipped);
        assert!(report.interpreter.is_none());
        assert_eq!(report.package_count, 1);
        assert_eq!(report.manifest_digest, digest);
    }

    #[test]
    fn force_bypasses_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "demucs==4.0.1\n").unwrap();
        let venv = dir.path().join(".venv");

        let paths = EnvPaths::new(&venv);
        fake_ready_env(&paths);
        let digest = Manifest::load(&manifest).unwrap().digest();
        write_stamp(&paths, &digest).unwrap();

        // A bogus interpreter proves the stamp was ignored: the run gets
        // past the up-to-date check and fails at discovery.
        let logger = test_logger(dir.path());
        let result = EnvBuilder::new(&manifest, &venv)
            .force(true)
            .interpreter(dir.path().join("no-such-python"))
            .run(&logger);
        assert!(matches!(result, Err(SetupError::MissingInterpreter(_))));
    }

    #[test]
    fn changed_manifest_invalidates_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "demucs==4.0.1\n").unwrap();
        let venv = dir.path().join(".venv");

        let paths = EnvPaths::new(&venv);
        fake_ready_env(&paths);
        let digest = Manifest::load(&manifest).unwrap().digest();
        write_stamp(&paths, &digest).unwrap();

        fs::write(&manifest, "demucs==4.1.0\n").unwrap();

        let logger = test_logger(dir.path());
        let result = EnvBuilder::new(&manifest, &venv)
            .interpreter(dir.path().join("no-such-python"))
            .run(&logger);
        assert!(matches!(result, Err(SetupError::MissingInterpreter(_))));
    }

    #[test]
    fn stamp_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = EnvPaths::new(dir.path().join(".venv"));
        fs::create_dir_all(&paths.venv_dir).unwrap();

        assert_eq!(read_stamp(&paths), None);
        write_stamp(&paths, "abc123").unwrap();
        assert_eq!(read_stamp(&paths).as_deref(), Some("abc123"));
    }

    #[test]
    fn hardware_variants_map_to_indexes() {
        assert_eq!(PackageIndex::from_hardware("cpu"), Some(PackageIndex::Cpu));
        assert_eq!(
            PackageIndex::from_hardware("cu121"),
            Some(PackageIndex::Cuda121)
        );
        assert_eq!(PackageIndex::from_hardware("tpu"), None);
        assert!(PackageIndex::Cpu.url().ends_with("/cpu"));
        assert!(PackageIndex::Cuda121.url().ends_with("/cu121"));
    }
}
