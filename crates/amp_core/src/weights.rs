//! Model weight pre-fetch.
//!
//! Source separation models download their checkpoints on first use,
//! which turns the first request after a cold start into a multi-minute
//! stall. This module pulls the checkpoints into the torch hub cache
//! ahead of time, using the interpreter from the managed environment so
//! the exact installed library versions decide what gets fetched.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::bootstrap::EnvPaths;
use crate::config::RuntimeVar;
use crate::logging::RunLogger;

/// Default separation model, matching what the serving app loads.
pub const DEFAULT_MODEL: &str = "htdemucs";

/// Runs inside the managed environment. Loading the model forces the
/// checkpoint download; the final print reports where it landed.
const FETCH_PROGRAM: &str = "\
import sys
from demucs.pretrained import get_model
import torch.hub
get_model(sys.argv[1])
print(torch.hub.get_dir())
";

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("environment at {0} is not ready; run setup first")]
    EnvNotReady(PathBuf),

    #[error("failed to fetch weights for model '{model}': {message}")]
    FetchFailed { model: String, message: String },

    #[error("no cache directory could be determined; set TORCH_HOME or pass one explicitly")]
    NoCacheDir,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type WeightsResult<T> = Result<T, WeightsError>;

/// Picks the cache directory for downloaded checkpoints: an explicit
/// path wins, then `TORCH_HOME`, then the platform cache directory.
pub fn resolve_cache_dir(explicit: Option<&Path>) -> WeightsResult<PathBuf> {
    resolve_with_env(explicit, std::env::var_os("TORCH_HOME"))
}

fn resolve_with_env(
    explicit: Option<&Path>,
    torch_home: Option<OsString>,
) -> WeightsResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(home) = torch_home {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join("torch"))
        .ok_or(WeightsError::NoCacheDir)
}

/// Downloads one model's checkpoints through the managed environment.
pub struct WeightFetcher {
    env: EnvPaths,
    model: String,
    cache_dir: Option<PathBuf>,
}

impl WeightFetcher {
    pub fn new(env: EnvPaths, model: impl Into<String>) -> Self {
        Self {
            env,
            model: model.into(),
            cache_dir: None,
        }
    }

    /// Overrides the torch hub cache location for the fetch.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs the fetch and returns the hub directory the checkpoints
    /// landed in.
    pub fn fetch(&self, logger: &RunLogger) -> WeightsResult<PathBuf> {
        if !self.env.is_ready() {
            return Err(WeightsError::EnvNotReady(self.env.venv_dir.clone()));
        }
        if let Some(dir) = &self.cache_dir {
            std::fs::create_dir_all(dir)?;
        }

        logger.phase("Fetch weights");
        logger.info(&format!("Model: {}", self.model));
        logger.command(&format!(
            "{} -c <fetch program> {}",
            self.env.python.display(),
            self.model
        ));
        tracing::debug!(model = %self.model, python = %self.env.python.display(), "fetching weights");

        let mut command = Command::new(&self.env.python);
        command.arg("-c").arg(FETCH_PROGRAM).arg(&self.model);
        if let Some(dir) = &self.cache_dir {
            command.env(RuntimeVar::TorchHome.name(), dir);
        }

        let output = command.output()?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            logger.output_line(line, false);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            logger.output_line(line, true);
        }

        if !output.status.success() {
            logger.show_tail("weights fetch");
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WeightsError::FetchFailed {
                model: self.model.clone(),
                message: stderr.trim().to_string(),
            });
        }

        let hub_dir = String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from);
        let hub_dir = match hub_dir {
            Some(dir) => dir,
            None => resolve_cache_dir(self.cache_dir.as_deref())?,
        };

        logger.success(&format!(
            "Model '{}' available in cache: {}",
            self.model,
            hub_dir.display()
        ));
        Ok(hub_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_cache_dir_wins() {
        let resolved = resolve_with_env(
            Some(Path::new("/opt/weights")),
            Some(OsString::from("/ignored")),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/opt/weights"));
    }

    #[test]
    fn torch_home_is_used_when_set() {
        let resolved = resolve_with_env(None, Some(OsString::from("/var/torch"))).unwrap();
        assert_eq!(resolved, PathBuf::from("/var/torch"));
    }

    #[test]
    fn empty_torch_home_falls_through_to_platform_cache() {
        match resolve_with_env(None, Some(OsString::new())) {
            Ok(resolved) => assert!(resolved.ends_with("torch")),
            Err(WeightsError::NoCacheDir) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fetch_requires_a_ready_environment() {
        let dir = tempfile::tempdir().unwrap();
        let venv = dir.path().join(".venv");
        let logger = crate::logging::RunLoggerBuilder::new("weights-test", dir.path().join("logs"))
            .build()
            .unwrap();

        let fetcher = WeightFetcher::new(EnvPaths::new(&venv), DEFAULT_MODEL);
        let err = fetcher.fetch(&logger).unwrap_err();
        match err {
            WeightsError::EnvNotReady(path) => assert_eq!(path, venv),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_model_matches_serving_app() {
        assert_eq!(DEFAULT_MODEL, "htdemucs");
    }
}
