//! Error types for image assembly.
//!
//! Two levels, mirroring how failures surface:
//! - [`StageError`]: what went wrong inside one stage
//! - [`BuildError`]: which stage failed, wrapping the cause

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Low-level error from a single assembly stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),

    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        StageError::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        StageError::InvalidOutput(message.into())
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        StageError::PreconditionFailed(message.into())
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        StageError::FileNotFound { path: path.into() }
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        StageError::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        StageError::Io {
            operation: operation.into(),
            source,
        }
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// Top-level image build error with stage context.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Image build failed at stage '{stage}': {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("Failed to write Dockerfile {path}: {source}")]
    WriteDockerfile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub fn stage_failure(stage: impl Into<String>, source: StageError) -> Self {
        BuildError::StageFailure {
            stage: stage.into(),
            source,
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
