//! Virtual environment layout and interpreter discovery.

use std::path::{Path, PathBuf};

/// Interpreter names searched on PATH, in order.
const INTERPRETER_CANDIDATES: &[&str] = &["python3", "python"];

/// Paths inside a target virtual environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPaths {
    /// The environment's root directory.
    pub venv_dir: PathBuf,
    /// Python interpreter inside the environment.
    pub python: PathBuf,
    /// pip inside the environment.
    pub pip: PathBuf,
}

impl EnvPaths {
    pub fn new(venv_dir: impl Into<PathBuf>) -> Self {
        let venv_dir = venv_dir.into();

        #[cfg(unix)]
        let (python, pip) = (
            venv_dir.join("bin").join("python"),
            venv_dir.join("bin").join("pip"),
        );

        #[cfg(windows)]
        let (python, pip) = (
            venv_dir.join("Scripts").join("python.exe"),
            venv_dir.join("Scripts").join("pip.exe"),
        );

        Self {
            venv_dir,
            python,
            pip,
        }
    }

    /// Whether the environment looks fully provisioned.
    pub fn is_ready(&self) -> bool {
        self.python.exists() && self.pip.exists()
    }

    /// Path of the stamp file recording the installed manifest digest.
    pub fn stamp_path(&self) -> PathBuf {
        self.venv_dir.join(".manifest-stamp")
    }
}

/// Find a usable Python interpreter.
///
/// An explicit path wins (and must exist); otherwise PATH is searched
/// for `python3`, then `python`.
pub fn discover_interpreter(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    INTERPRETER_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_paths_layout() {
        let paths = EnvPaths::new("/srv/app/.venv");
        assert_eq!(paths.venv_dir, PathBuf::from("/srv/app/.venv"));
        #[cfg(unix)]
        {
            assert_eq!(paths.python, PathBuf::from("/srv/app/.venv/bin/python"));
            assert_eq!(paths.pip, PathBuf::from("/srv/app/.venv/bin/pip"));
        }
        assert_eq!(
            paths.stamp_path(),
            PathBuf::from("/srv/app/.venv/.manifest-stamp")
        );
    }

    #[test]
    fn fresh_environment_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let paths = EnvPaths::new(dir.path().join(".venv"));
        assert!(!paths.is_ready());
    }

    #[test]
    fn explicit_interpreter_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-python");
        assert!(discover_interpreter(Some(&missing)).is_none());
    }

    #[test]
    fn explicit_interpreter_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("python-custom");
        std::fs::write(&fake, "").unwrap();
        assert_eq!(discover_interpreter(Some(&fake)), Some(fake));
    }
}
