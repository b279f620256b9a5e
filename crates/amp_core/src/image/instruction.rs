//! Typed image-build instructions.
//!
//! Each instruction renders to one Dockerfile line. Keeping them typed
//! means ordering and content can be checked before anything is
//! rendered or handed to the container engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single build instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `FROM <image>` - pinned base image.
    From { image: String },
    /// `WORKDIR <path>`.
    Workdir { path: String },
    /// `RUN <command>`.
    Run { command: String },
    /// `COPY <src> <dest>`.
    Copy { src: String, dest: String },
    /// `ENV <name>=<value> ...` - all pairs in one instruction, one layer.
    Env { vars: Vec<(String, String)> },
    /// `EXPOSE <port>`.
    Expose { port: u16 },
    /// `CMD ["...", ...]` - exec form entrypoint.
    Cmd { argv: Vec<String> },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From { image } => write!(f, "FROM {}", image),
            Instruction::Workdir { path } => write!(f, "WORKDIR {}", path),
            Instruction::Run { command } => write!(f, "RUN {}", command),
            Instruction::Copy { src, dest } => write!(f, "COPY {} {}", src, dest),
            Instruction::Env { vars } => {
                write!(f, "ENV")?;
                for (name, value) in vars {
                    if value.chars().any(char::is_whitespace) {
                        write!(f, " {}=\"{}\"", name, value)?;
                    } else {
                        write!(f, " {}={}", name, value)?;
                    }
                }
                Ok(())
            }
            Instruction::Expose { port } => write!(f, "EXPOSE {}", port),
            Instruction::Cmd { argv } => {
                let quoted: Vec<String> =
                    argv.iter().map(|arg| format!("\"{}\"", arg)).collect();
                write!(f, "CMD [{}]", quoted.join(", "))
            }
        }
    }
}
