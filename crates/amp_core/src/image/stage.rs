//! The build-stage abstraction.
//!
//! The image is assembled by an ordered chain of stages. Each stage
//! validates what the chain has produced so far, contributes its
//! instructions, then validates the result. Stages never execute
//! anything themselves; execution happens once, when the rendered plan
//! is handed to the container engine.
//!
//! # Example
//!
//! ```ignore
//! struct Banner;
//!
//! impl BuildStage for Banner {
//!     fn name(&self) -> &str {
//!         "Banner"
//!     }
//!
//!     fn instructions(&self, _ctx: &BuildContext) -> StageResult<Vec<Instruction>> {
//!         Ok(vec![Instruction::Run {
//!             command: "echo hello".to_string(),
//!         }])
//!     }
//! }
//! ```

use super::errors::StageResult;
use super::instruction::Instruction;
use super::types::{BuildContext, BuildPlan};

/// One stage of image assembly.
pub trait BuildStage: Send + Sync {
    /// Stage name used in logs and error context.
    fn name(&self) -> &str;

    /// Check the context and the plan built so far.
    fn validate_input(&self, _ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
        Ok(())
    }

    /// Produce this stage's instructions.
    fn instructions(&self, ctx: &BuildContext) -> StageResult<Vec<Instruction>>;

    /// Check the plan after this stage's instructions were appended.
    fn validate_output(&self, _ctx: &BuildContext, _plan: &BuildPlan) -> StageResult<()> {
        Ok(())
    }

    /// Human-readable description for logs.
    fn description(&self) -> &str {
        self.name()
    }
}
