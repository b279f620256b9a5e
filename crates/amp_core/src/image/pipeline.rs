//! Stage runner: validates and collects instructions in order.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::image::errors::{BuildError, BuildResult};
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

/// Runs an ordered list of [`BuildStage`]s against one context and
/// produces a [`BuildPlan`]. The first failing stage aborts the run;
/// nothing is emitted from later stages.
pub struct Assembler {
    stages: Vec<Box<dyn BuildStage>>,
}

impl Assembler {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_stage<S: BuildStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn assemble(&self, ctx: &BuildContext) -> BuildResult<BuildPlan> {
        let mut plan = BuildPlan::new();
        let total = self.stages.len();

        for (index, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            ctx.logger.phase(stage.description());
            ctx.logger
                .progress(((index * 100) / total.max(1)) as u32, name);

            ctx.logger
                .validation(&format!("Checking inputs for {name}"));
            stage.validate_input(ctx, &plan).map_err(|e| {
                ctx.logger.error(&format!("{name}: {e}"));
                BuildError::stage_failure(name, e)
            })?;

            let instructions = stage.instructions(ctx).map_err(|e| {
                ctx.logger.error(&format!("{name}: {e}"));
                BuildError::stage_failure(name, e)
            })?;
            for instruction in instructions {
                ctx.logger.info(&instruction.to_string());
                plan.push(name, instruction);
            }

            ctx.logger
                .validation(&format!("Checking outputs for {name}"));
            stage.validate_output(ctx, &plan).map_err(|e| {
                ctx.logger.error(&format!("{name}: {e}"));
                BuildError::stage_failure(name, e)
            })?;
        }

        ctx.logger.progress(100, "plan complete");
        ctx.logger
            .success(&format!("Planned {} instructions", plan.len()));
        Ok(plan)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a rendered plan to disk atomically: the content lands in a
/// sibling temp file which is fsynced and renamed over the target.
pub fn write_dockerfile(plan: &BuildPlan, path: &Path) -> BuildResult<()> {
    let io_err = |e: std::io::Error| BuildError::WriteDockerfile {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path).map_err(io_err)?;
        file.write_all(plan.render().as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::errors::{StageError, StageResult};
    use crate::image::instruction::Instruction;
    use crate::image::types::test_support;

    struct EmitStage {
        name: &'static str,
        command: &'static str,
    }

    impl BuildStage for EmitStage {
        fn name(&self) -> &str {
            self.name
        }

        fn instructions(&self, _ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
            Ok(vec![Instruction::Run {
                command: self.command.to_string(),
            }])
        }
    }

    struct FailingStage;

    impl BuildStage for FailingStage {
        fn name(&self) -> &str {
            "Failing"
        }

        fn validate_input(&self, _ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
            Err(StageError::precondition_failed("boom"))
        }

        fn instructions(&self, _ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn runs_stages_in_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());

        let assembler = Assembler::new()
            .with_stage(EmitStage {
                name: "First",
                command: "echo first",
            })
            .with_stage(EmitStage {
                name: "Second",
                command: "echo second",
            });
        assert_eq!(assembler.stage_names(), vec!["First", "Second"]);

        let plan = assembler.assemble(&ctx).unwrap();
        let rendered: Vec<String> = plan.instructions().map(|i| i.to_string()).collect();
        assert_eq!(rendered, vec!["RUN echo first", "RUN echo second"]);
    }

    #[test]
    fn failing_stage_aborts_and_names_itself() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());

        let assembler = Assembler::new()
            .with_stage(FailingStage)
            .with_stage(EmitStage {
                name: "Never",
                command: "echo never",
            });

        let err = assembler.assemble(&ctx).unwrap_err();
        match err {
            BuildError::StageFailure { stage, .. } => assert_eq!(stage, "Failing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_assembler_produces_empty_plan() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());

        let plan = Assembler::new().assemble(&ctx).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn write_dockerfile_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());

        let plan = Assembler::new()
            .with_stage(EmitStage {
                name: "Only",
                command: "true",
            })
            .assemble(&ctx)
            .unwrap();

        let target = dir.path().join("Dockerfile");
        write_dockerfile(&plan, &target).unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        assert_eq!(written, plan.render());
        assert!(!dir.path().join("Dockerfile.tmp").exists());
    }
}
