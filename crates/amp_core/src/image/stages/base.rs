//! Base stage: pinned base image and working directory.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

/// Lays down `FROM` and `WORKDIR`. Must run first.
pub struct BaseStage;

impl BaseStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BaseStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for BaseStage {
    fn name(&self) -> &str {
        "Base"
    }

    fn validate_input(&self, ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        if !plan.is_empty() {
            return Err(StageError::invalid_input("base stage must run first"));
        }
        if ctx.image.base_image.trim().is_empty() {
            return Err(StageError::invalid_input("base image is not set"));
        }
        // A floating tag defeats reproducible builds.
        if !ctx.image.base_image.contains(':') || ctx.image.base_image.ends_with(":latest") {
            return Err(StageError::invalid_input(format!(
                "base image '{}' must carry a pinned tag",
                ctx.image.base_image
            )));
        }
        Ok(())
    }

    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        Ok(vec![
            Instruction::From {
                image: ctx.image.base_image.clone(),
            },
            Instruction::Workdir {
                path: ctx.image.workdir.clone(),
            },
        ])
    }

    fn validate_output(&self, _ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        match plan.instructions().next() {
            Some(Instruction::From { .. }) => Ok(()),
            _ => Err(StageError::invalid_output("plan does not start with FROM")),
        }
    }

    fn description(&self) -> &str {
        "Pinned base image and working directory"
    }
}
