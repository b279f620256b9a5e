//! Context and plan types for image assembly.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ImageSettings, RuntimeEnv};
use crate::logging::RunLogger;

use super::instruction::Instruction;

/// Read-only inputs shared by all stages.
pub struct BuildContext {
    /// Image configuration (base, packages, entrypoint, ...).
    pub image: ImageSettings,

    /// Runtime environment baked into the image.
    pub runtime: RuntimeEnv,

    /// Manifest file name, relative to the build context.
    pub manifest_file: String,

    /// Build context directory on the host.
    pub context_dir: PathBuf,

    /// Logger for this run.
    pub logger: Arc<RunLogger>,
}

impl BuildContext {
    pub fn new(
        image: ImageSettings,
        runtime: RuntimeEnv,
        manifest_file: impl Into<String>,
        context_dir: impl Into<PathBuf>,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            image,
            runtime,
            manifest_file: manifest_file.into(),
            context_dir: context_dir.into(),
            logger,
        }
    }

    /// Absolute path of the manifest inside the build context.
    pub fn manifest_path(&self) -> PathBuf {
        self.context_dir.join(&self.manifest_file)
    }
}

/// One planned instruction, tagged with the stage that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub stage: String,
    pub instruction: Instruction,
}

/// The ordered instruction plan the stages build up.
///
/// Rendering is pure: the same plan always renders to the same text,
/// so two runs over unchanged inputs produce byte-identical output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    entries: Vec<PlanEntry>,
}

impl BuildPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: &str, instruction: Instruction) {
        self.entries.push(PlanEntry {
            stage: stage.to_string(),
            instruction,
        });
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.entries.iter().map(|entry| &entry.instruction)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first instruction matching the predicate.
    pub fn position(&self, pred: impl FnMut(&Instruction) -> bool) -> Option<usize> {
        self.instructions().position(pred)
    }

    /// Ports exposed by the plan, in order.
    pub fn exposed_ports(&self) -> Vec<u16> {
        self.instructions()
            .filter_map(|instruction| match instruction {
                Instruction::Expose { port } => Some(*port),
                _ => None,
            })
            .collect()
    }

    /// All environment pairs set by the plan, in order.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.instructions()
            .filter_map(|instruction| match instruction {
                Instruction::Env { vars } => Some(vars.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Render the complete Dockerfile text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# Generated by amp. Edit the settings, not this file.\n");
        let mut current_stage = "";
        for entry in &self.entries {
            if entry.stage != current_stage {
                current_stage = entry.stage.as_str();
                out.push('\n');
                out.push_str("# ");
                out.push_str(current_stage);
                out.push('\n');
            }
            out.push_str(&entry.instruction.to_string());
            out.push('\n');
        }
        out
    }
}
