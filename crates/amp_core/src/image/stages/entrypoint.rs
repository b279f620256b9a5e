//! Entrypoint stage: the container command, exec form.

use crate::image::errors::{StageError, StageResult};
use crate::image::instruction::Instruction;
use crate::image::stage::BuildStage;
use crate::image::types::{BuildContext, BuildPlan};

pub struct EntrypointStage;

impl EntrypointStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EntrypointStage {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStage for EntrypointStage {
    fn name(&self) -> &str {
        "Entrypoint"
    }

    fn validate_input(&self, ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
        if ctx.image.entrypoint.is_empty() {
            return Err(StageError::invalid_input("entrypoint command is empty"));
        }
        Ok(())
    }

    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
        Ok(vec![Instruction::Cmd {
            argv: ctx.image.entrypoint.clone(),
        }])
    }

    fn validate_output(&self, _ctx: &BuildContext, plan: &BuildPlan) -> StageResult<()> {
        match plan.instructions().last() {
            Some(Instruction::Cmd { .. }) => Ok(()),
            _ => Err(StageError::invalid_output("plan does not end with CMD")),
        }
    }

    fn description(&self) -> &str {
        "Container start command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageSettings;
    use crate::image::types::test_support;

    #[test]
    fn emits_exec_form_cmd_last() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let stage = EntrypointStage::new();

        let instructions = stage.instructions(&ctx).unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(
            instructions[0].to_string(),
            r#"CMD ["python", "app_hf.py"]"#
        );

        let mut plan = BuildPlan::new();
        for inst in instructions {
            plan.push(stage.name(), inst);
        }
        stage.validate_output(&ctx, &plan).unwrap();
    }

    #[test]
    fn rejects_empty_entrypoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.image = ImageSettings {
            entrypoint: Vec::new(),
            ..ImageSettings::default()
        };

        let stage = EntrypointStage::new();
        assert!(stage.validate_input(&ctx, &BuildPlan::new()).is_err());
    }

    #[test]
    fn cmd_not_last_fails_output_validation() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let stage = EntrypointStage::new();

        let mut plan = BuildPlan::new();
        plan.push(
            "Entrypoint",
            Instruction::Cmd {
                argv: vec!["python".to_string(), "app_hf.py".to_string()],
            },
        );
        plan.push(
            "Other",
            Instruction::Run {
                command: "true".to_string(),
            },
        );

        assert!(stage.validate_output(&ctx, &plan).is_err());
    }
}
