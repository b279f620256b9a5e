//! Session directory stage.
//!
//! The serving app writes per-session audio into a scratch directory;
//! it has to exist before the first request rather than be created
//! lazily at runtime.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

pub struct SessionDirStage;

impl SessionDirStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SessionDirStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for SessionDirStage {
    fn name(&self) -> &str {
        "Session dir"
    }

    fn validate_input(&self, ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
        if !ctx.image.session_dir.starts_with('/') {
            return Err(StageError::invalid_input(format!(
                "session directory '{}' must be an absolute path",
                ctx.image.session_dir
            )));
        }
        Ok(())
    }

    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        Ok(vec![Instruction::Run {
            command: format!("mkdir -p {}", ctx.image.session_dir),
        }])
    }

    fn description(&self) -> &str {
        "Writable scratch directory for session audio"
    }
}
