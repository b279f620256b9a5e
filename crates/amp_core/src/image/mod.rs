//! Deterministic container image assembly.
//!
//! A build is modeled as an ordered run of stages, each contributing
//! Dockerfile instructions to a single [`BuildPlan`]:
//!
//! 1. Base — pinned base image and working directory
//! 2. System packages — native libraries in one apt layer
//! 3. Dependencies — manifest copy and pip install
//! 4. Source — application tree
//! 5. Session dir — writable scratch directory
//! 6. Runtime — exposed port and environment
//! 7. Entrypoint — container start command
//!
//! Every stage validates its inputs before contributing and its
//! outputs after, so a broken configuration is reported by name
//! instead of producing a Dockerfile that fails halfway through
//! `docker build`. Assembly is pure planning; rendering the plan and
//! invoking docker are separate steps:
//!
//! ```ignore
//! let plan = standard_assembler().assemble(&ctx)?;
//! write_dockerfile(&plan, &context_dir.join("Dockerfile.amp"))?;
//! build_image(&context_dir, &context_dir.join("Dockerfile.amp"), "music-ai-backend", &logger)?;
//! ```

mod docker;
mod errors;
mod instruction;
mod pipeline;
mod stage;
pub mod stages;
mod types;

pub use docker::{build_image, docker_binary};
pub use errors::{BuildError, BuildResult, StageError, StageResult};
pub use instruction::Instruction;
pub use pipeline::{write_dockerfile, Assembler};
pub use stage::BuildStage;
pub use types::{BuildContext, BuildPlan, PlanEntry};

use stages::{
    BaseStage, DependenciesStage, EntrypointStage, RuntimeStage, SessionDirStage, SourceStage,
    SystemPackagesStage,
};

/// The canonical stage lineup for the serving image.
pub fn standard_assembler() -> Assembler {
    Assembler::new()
        .with_stage(BaseStage::new())
        .with_stage(SystemPackagesStage::new())
        .with_stage(DependenciesStage::new())
        .with_stage(SourceStage::new())
        .with_stage(SessionDirStage::new())
        .with_stage(RuntimeStage::new())
        .with_stage(EntrypointStage::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::test_support;
    use std::path::Path;

    fn seeded_context(dir: &Path) -> BuildContext {
        std::fs::write(dir.join("requirements.txt"), "fastapi==0.111.0\ndemucs\n").unwrap();
        test_support::context(dir)
    }

    #[test]
    fn standard_plan_has_the_canonical_instruction_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded_context(dir.path());

        let plan = standard_assembler().assemble(&ctx).unwrap();
        let rendered: Vec<String> = plan.instructions().map(|i| i.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "FROM python:3.11-slim",
                "WORKDIR /app",
                "RUN apt-get update && apt-get install -y --no-install-recommends \
                 ffmpeg libsndfile1 && rm -rf /var/lib/apt/lists/*",
                "COPY requirements.txt .",
                "RUN pip install --upgrade pip && pip install --no-cache-dir -r requirements.txt",
                "COPY . .",
                "RUN mkdir -p /tmp/music-ai/sessions",
                "EXPOSE 7860",
                "ENV PYTHONUNBUFFERED=1 PORT=7860",
                r#"CMD ["python", "app_hf.py"]"#,
            ]
        );
    }

    #[test]
    fn standard_plan_exposes_exactly_one_port() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded_context(dir.path());

        let plan = standard_assembler().assemble(&ctx).unwrap();
        assert_eq!(plan.exposed_ports(), vec![7860]);

        let env = plan.env_pairs();
        assert!(env.contains(&("PYTHONUNBUFFERED".to_string(), "1".to_string())));
        assert!(env.contains(&("PORT".to_string(), "7860".to_string())));
    }

    #[test]
    fn dependencies_are_installed_before_source_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded_context(dir.path());

        let plan = standard_assembler().assemble(&ctx).unwrap();
        let manifest_copy = plan
            .position(|i| matches!(i, Instruction::Copy { src, .. } if src == "requirements.txt"))
            .unwrap();
        let install = plan
            .position(|i| matches!(i, Instruction::Run { command } if command.contains("pip install")))
            .unwrap();
        let source_copy = plan
            .position(|i| matches!(i, Instruction::Copy { src, .. } if src == "."))
            .unwrap();

        assert!(manifest_copy < install);
        assert!(install < source_copy);
    }

    #[test]
    fn assembly_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = seeded_context(dir.path());

        let first = standard_assembler().assemble(&ctx).unwrap().render();
        let second = standard_assembler().assemble(&ctx).unwrap().render();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_manifest_fails_in_the_dependencies_stage() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());

        let err = standard_assembler().assemble(&ctx).unwrap_err();
        match err {
            BuildError::StageFailure { stage, source } => {
                assert_eq!(stage, "Dependencies");
                assert!(matches!(source, StageError::FileNotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
