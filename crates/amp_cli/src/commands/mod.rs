//! CLI command implementations.

pub mod doctor;
pub mod image;
pub mod setup;
pub mod weights;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use amp_core::config::{ConfigManager, Settings};
use amp_core::logging::{RunLogger, RunLoggerBuilder};

/// Shared command state: the project directory and its settings.
///
/// Every command resolves paths through here so that `--project` and
/// relative settings entries behave the same everywhere.
pub struct AppContext {
    project_dir: PathBuf,
    config: ConfigManager,
}

impl AppContext {
    /// Loads settings for a project, creating the default settings
    /// file on first use.
    pub fn load(project: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        let project_dir = match project {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().context("cannot determine current directory")?,
        };
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => project_dir.join(".amp").join("settings.toml"),
        };

        let mut config = ConfigManager::new(config_path);
        config.load_or_create().with_context(|| {
            format!("failed to load settings from {}", config.path().display())
        })?;

        Ok(Self {
            project_dir,
            config,
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn settings(&self) -> &Settings {
        self.config.settings()
    }

    pub fn config_path(&self) -> &Path {
        self.config.path()
    }

    /// Roots a configured path at the project directory unless it is
    /// already absolute.
    pub fn resolve(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.settings().paths.manifest)
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.resolve(&self.settings().paths.venv_dir)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.resolve(&self.settings().paths.logs_folder)
    }

    /// Logger that mirrors every line to stdout as well as the run's
    /// log file.
    pub fn run_logger(&self, name: &str) -> Result<RunLogger> {
        let logger = RunLoggerBuilder::new(name, self.logs_dir())
            .config(self.settings().logging.log_config())
            .callback(Box::new(|line| println!("{line}")))
            .build()
            .context("failed to create log file")?;
        Ok(logger)
    }

    /// Logger that only writes the run's log file. Used by commands
    /// whose stdout is the product, like `image plan`.
    pub fn file_logger(&self, name: &str) -> Result<RunLogger> {
        let logger = RunLoggerBuilder::new(name, self.logs_dir())
            .config(self.settings().logging.log_config())
            .build()
            .context("failed to create log file")?;
        Ok(logger)
    }
}
