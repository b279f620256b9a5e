//! Runtime environment contract for the service process.
//!
//! The service reads its configuration from explicit environment
//! variables. Values are carried in a [`RuntimeEnv`] and rendered as
//! ordered pairs for whoever starts the process (the image's ENV
//! layer, or a spawned command); nothing here mutates this process's
//! own environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Port the service listens on (Hugging Face Spaces convention).
pub const DEFAULT_PORT: u16 = 7860;

/// Environment variables the service recognizes at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeVar {
    /// `PYTHONUNBUFFERED` - flush output immediately so container logs stream.
    PythonUnbuffered,
    /// `PORT` - listening port.
    Port,
    /// `TORCH_HOME` - weight cache location override.
    TorchHome,
}

impl RuntimeVar {
    /// The environment variable name.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeVar::PythonUnbuffered => "PYTHONUNBUFFERED",
            RuntimeVar::Port => "PORT",
            RuntimeVar::TorchHome => "TORCH_HOME",
        }
    }
}

/// Explicit runtime configuration for the service process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEnv {
    /// Port the service binds to.
    pub port: u16,

    /// Disable interpreter output buffering.
    pub unbuffered: bool,

    /// Weight cache override; `None` means the torch default.
    pub torch_home: Option<PathBuf>,
}

impl Default for RuntimeEnv {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            unbuffered: true,
            torch_home: None,
        }
    }
}

impl RuntimeEnv {
    /// Render as ordered `NAME=value` pairs.
    ///
    /// The order is fixed so renderings are reproducible.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if self.unbuffered {
            pairs.push((
                RuntimeVar::PythonUnbuffered.name().to_string(),
                "1".to_string(),
            ));
        }
        pairs.push((RuntimeVar::Port.name().to_string(), self.port.to_string()));
        if let Some(home) = &self.torch_home {
            pairs.push((
                RuntimeVar::TorchHome.name().to_string(),
                home.display().to_string(),
            ));
        }
        pairs
    }
}
