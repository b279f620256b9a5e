//! Source stage: application tree copied after dependencies.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

pub struct SourceStage;

impl SourceStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SourceStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for SourceStage {
    fn name(&self) -> &str {
        "Source"
    }

    fn validate_input(&self, ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        if !ctx.context_dir.is_dir() {
            return Err(StageError::file_not_found(
                ctx.context_dir.display().to_string(),
            ));
        }
        let installed = plan.instructions().any(
            |inst| matches!(inst, Instruction::Run { command } if command.contains("pip install")),
        );
        if !installed {
            return Err(StageError::invalid_input(
                "source must be copied after the dependency install",
            ));
        }
        Ok(())
    }

    fn instructions(&self, _ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        Ok(vec![Instruction::Copy {
            src: ".".to_string(),
            dest: ".".to_string(),
        }])
    }

    fn validate_output(&self, _ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        let source_at = plan
            .position(|inst| matches!(inst, Instruction::Copy { src, .. } if src == "."));
        let install_at = plan.position(|inst| {
            matches!(inst, Instruction::Run { command } if command.contains("pip install"))
        });
        match (source_at, install_at) {
            (Some(source), Some(install)) if install < source => Ok(()),
            _ => Err(StageError::invalid_output(
                "source copy must follow the dependency install",
            )),
        }
    }

    fn description(&self) -> &str {
        "Application source tree"
    }
}
