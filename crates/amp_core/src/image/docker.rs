//! Thin wrapper around the `docker build` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::image::errors::{StageError, StageResult};
use crate::logging::RunLogger;

/// Locates the docker client on PATH.
pub fn docker_binary() -> Option<PathBuf> {
    which::which("docker").ok()
}

/// Builds `tag` from `dockerfile` with `context_dir` as the build
/// context. The context and dockerfile are checked before the docker
/// binary so a misconfigured call fails the same way on hosts without
/// docker installed.
pub fn build_image(
    context_dir: &Path,
    dockerfile: &Path,
    tag: &str,
    logger: &RunLogger,
) -> StageResult<()> {
    if !context_dir.is_dir() {
        return Err(StageError::file_not_found(
            context_dir.display().to_string(),
        ));
    }
    if !dockerfile.is_file() {
        return Err(StageError::file_not_found(dockerfile.display().to_string()));
    }
    let docker = docker_binary()
        .ok_or_else(|| StageError::precondition_failed("docker not found on PATH"))?;

    logger.command(&format!(
        "docker build -f {} -t {} {}",
        dockerfile.display(),
        tag,
        context_dir.display()
    ));
    tracing::debug!(docker = %docker.display(), tag, "invoking docker build");

    let output = Command::new(&docker)
        .arg("build")
        .arg("-f")
        .arg(dockerfile)
        .arg("-t")
        .arg(tag)
        .arg(context_dir)
        .output()
        .map_err(|e| StageError::io("spawn docker build", e))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        logger.output_line(line, false);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        logger.output_line(line, true);
    }

    if !output.status.success() {
        logger.show_tail("docker build");
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StageError::command_failed(
            "docker",
            output.status.code().unwrap_or(-1),
            stderr.trim(),
        ));
    }

    logger.success(&format!("Built image '{tag}'"));
    Ok(())
}
