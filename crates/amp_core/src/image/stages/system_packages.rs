//! System package stage: native libraries installed in a single layer.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

const APT_CLEANUP: &str = "rm -rf /var/lib/apt/lists/*";

/// Installs the configured system packages with apt, cleaning the
/// package lists in the same layer so they never reach the image.
pub struct SystemPackagesStage;

impl SystemPackagesStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemPackagesStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for SystemPackagesStage {
    fn name(&self) -> &str {
        "System packages"
    }

    fn validate_input(&self, _ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        if plan.is_empty() {
            return Err(StageError::invalid_input(
                "system packages require a base image first",
            ));
        }
        Ok(())
    }

    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        if ctx.image.system_packages.is_empty() {
            return Ok(Vec::new());
        }
        for pkg in &ctx.image.system_packages {
            if pkg.trim().is_empty() || pkg.contains(char::is_whitespace) {
                return Err(StageError::invalid_input(format!(
                    "invalid system package name: '{pkg}'"
                )));
            }
        }
        let command = format!(
            "apt-get update && apt-get install -y --no-install-recommends {} && {}",
            ctx.image.system_packages.join(" "),
            APT_CLEANUP
        );
        Ok(vec![Instruction::Run { command }])
    }

    fn validate_output(&self, ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        if ctx.image.system_packages.is_empty() {
            return Ok(());
        }
        let cleaned = plan.instructions().any(|inst| match inst {
            Instruction::Run { command } => {
                command.contains("apt-get install") && command.contains(APT_CLEANUP)
            }
            _ => false,
        });
        if !cleaned {
            return Err(StageError::invalid_output(
                "apt install layer is missing the package list cleanup",
            ));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Native libraries (ffmpeg, libsndfile) in one layer"
    }
}
