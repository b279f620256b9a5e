//! Runtime stage: exposed port and environment variables.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

pub struct RuntimeStage;

impl RuntimeStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuntimeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for RuntimeStage {
    fn name(&self) -> &str {
        "Runtime"
    }

    fn validate_input(&self, ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
        if ctx.runtime.port == 0 {
            return Err(StageError::invalid_input("serving port must be non-zero"));
        }
        Ok(())
    }

    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        Ok(vec![
            Instruction::Expose {
                port: ctx.runtime.port,
            },
            Instruction::Env {
                vars: ctx.runtime.to_pairs(),
            },
        ])
    }

    fn validate_output(&self, ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        // Exactly one port, and it must match the configured one.
        let exposed = plan.exposed_ports();
        if exposed != vec![ctx.runtime.port] {
            return Err(StageError::invalid_output(format!(
                "expected a single EXPOSE {} entry, found {exposed:?}",
                ctx.runtime.port
            )));
        }
        let has_port_var = plan
            .env_pairs()
            .iter()
            .any(|(name, value)| name == "PORT" && *value == ctx.runtime.port.to_string());
        if !has_port_var {
            return Err(StageError::invalid_output(
                "PORT variable does not match the exposed port",
            ));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Serving port and process environment"
    }
}
