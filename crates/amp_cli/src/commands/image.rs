//! Image plan and build commands.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use amp_core::image::{
    build_image, standard_assembler, write_dockerfile, BuildContext, BuildError,
};
use amp_core::logging::RunLogger;

use super::AppContext;

/// Dockerfile name used for builds inside the context directory.
pub const DOCKERFILE_NAME: &str = "Dockerfile.amp";

fn assembly_context(app: &AppContext, context_dir: PathBuf, logger: Arc<RunLogger>) -> BuildContext {
    let settings = app.settings();
    BuildContext::new(
        settings.image.clone(),
        settings.runtime.runtime_env(),
        settings.paths.manifest.clone(),
        context_dir,
        logger,
    )
}

/// Run `image plan`: assemble and render the Dockerfile without
/// touching docker. With no `--out` the plan goes to stdout.
pub fn plan(app: &AppContext, out: Option<PathBuf>) -> Result<ExitCode> {
    // Stage progress goes to the log file only; stdout carries the plan.
    let logger = Arc::new(app.file_logger("image-plan")?);
    let ctx = assembly_context(app, app.project_dir().to_path_buf(), logger);

    let plan = standard_assembler().assemble(&ctx)?;
    match out {
        Some(path) => {
            write_dockerfile(&plan, &path)?;
            println!(
                "{} wrote {} ({} instructions)",
                "SUCCESS".green().bold(),
                path.display(),
                plan.len()
            );
        }
        None => print!("{}", plan.render()),
    }
    Ok(ExitCode::SUCCESS)
}

/// Run `image build`: assemble, write the Dockerfile into the build
/// context, and hand it to docker. The Dockerfile is removed afterwards
/// unless `--keep-dockerfile` is given.
pub fn build(
    app: &AppContext,
    tag: Option<String>,
    context: Option<PathBuf>,
    keep_dockerfile: bool,
) -> Result<ExitCode> {
    let tag = tag.unwrap_or_else(|| app.settings().image.tag.clone());
    let context_dir = context.unwrap_or_else(|| app.project_dir().to_path_buf());

    println!("{} {}", "Tag:".cyan().bold(), tag);
    println!("{} {}", "Context:".cyan().bold(), context_dir.display());

    let logger = Arc::new(app.run_logger("image-build")?);
    let ctx = assembly_context(app, context_dir.clone(), Arc::clone(&logger));

    let plan = standard_assembler().assemble(&ctx)?;
    let dockerfile = context_dir.join(DOCKERFILE_NAME);
    write_dockerfile(&plan, &dockerfile)?;

    let result = build_image(&context_dir, &dockerfile, &tag, &logger)
        .map_err(|e| BuildError::stage_failure("docker build", e));
    if !keep_dockerfile {
        let _ = std::fs::remove_file(&dockerfile);
    }
    result?;

    println!("{} built image '{}'", "SUCCESS".green().bold(), tag);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_writes_a_complete_dockerfile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "demucs\n").unwrap();
        let app = AppContext::load(Some(dir.path()), None).unwrap();

        let out = dir.path().join("Dockerfile.preview");
        plan(&app, Some(out.clone())).unwrap();

        let rendered = std::fs::read_to_string(&out).unwrap();
        assert!(rendered.contains("FROM python:3.11-slim"));
        assert!(rendered.contains(r#"CMD ["python", "app_hf.py"]"#));
    }

    #[test]
    fn plan_fails_without_a_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let app = AppContext::load(Some(dir.path()), None).unwrap();

        assert!(plan(&app, None).is_err());
    }
}
