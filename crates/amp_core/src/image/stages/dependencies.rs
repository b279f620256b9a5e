//! Dependency stage: requirements copy and pip install.
//!
//! The manifest is copied on its own layer before the source tree so
//! that source edits do not invalidate the installed dependencies.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

pub struct DependenciesStage;

impl DependenciesStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DependenciesStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for DependenciesStage {
    fn name(&self) -> &str {
        "Dependencies"
    }

    fn validate_input(&self, ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
        let manifest = ctx.manifest_path();
        if !manifest.is_file() {
            return Err(StageError::file_not_found(manifest.display().to_string()));
        }
        Ok(())
    }

    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        Ok(vec![
            Instruction::Copy {
                src: ctx.manifest_file.clone(),
                dest: ".".to_string(),
            },
            Instruction::Run {
                command: format!(
                    "pip install --upgrade pip && pip install --no-cache-dir -r {}",
                    ctx.manifest_file
                ),
            },
        ])
    }

    fn validate_output(&self, ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        let copy_at = plan.position(|inst| {
            matches!(inst, Instruction::Copy { src, .. } if *src == ctx.manifest_file)
        });
        let install_at = plan.position(|inst| {
            matches!(inst, Instruction::Run { command } if command.contains("pip install"))
        });
        match (copy_at, install_at) {
            (Some(copy), Some(install)) if copy < install => Ok(()),
            _ => Err(StageError::invalid_output(
                "manifest copy must precede pip install",
            )),
        }
    }

    fn description(&self) -> &str {
        "Python dependencies from the pinned manifest"
    }
}
