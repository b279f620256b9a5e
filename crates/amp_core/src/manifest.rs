//! Dependency manifest parsing.
//!
//! The manifest is a pip requirements file: one requirement per line,
//! `#` comments and blank lines ignored, `-`-prefixed installer options
//! passed through verbatim. Line order is preserved because the
//! installer resolves in file order.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from loading or parsing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid requirement on line {line}: '{text}'")]
    InvalidRequirement { line: usize, text: String },
}

pub type ManifestResult<T> = Result<T, ManifestError>;

/// One meaningful line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestEntry {
    /// A package requirement.
    Requirement(Requirement),
    /// An installer option passed through verbatim (e.g. `--extra-index-url ...`).
    Option(String),
}

/// A single package requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name as written, including extras (e.g. `uvicorn[standard]`).
    pub name: String,

    /// Version constraint as written (e.g. `==2.1.0`), if any.
    pub constraint: Option<String>,

    /// Environment marker after `;`, if any.
    pub marker: Option<String>,
}

impl Requirement {
    /// Whether the requirement pins an exact version.
    pub fn is_pinned(&self) -> bool {
        self.constraint
            .as_deref()
            .is_some_and(|c| c.starts_with("=="))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(constraint) = &self.constraint {
            write!(f, "{}", constraint)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, " ; {}", marker)?;
        }
        Ok(())
    }
}

/// An ordered dependency manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: impl Into<PathBuf>) -> ManifestResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(ManifestError::NotFound(path));
        }
        let content = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse manifest text.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> ManifestResult<Self> {
        let mut entries = Vec::new();
        for (index, raw_line) in content.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                entries.push(ManifestEntry::Option(line.to_string()));
                continue;
            }
            let requirement =
                parse_requirement(line).ok_or_else(|| ManifestError::InvalidRequirement {
                    line: index + 1,
                    text: raw_line.trim().to_string(),
                })?;
            entries.push(ManifestEntry::Requirement(requirement));
        }
        Ok(Self {
            path: path.into(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component, as referenced from a build context.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("requirements.txt")
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Requirements in file order, skipping option lines.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            ManifestEntry::Requirement(req) => Some(req),
            ManifestEntry::Option(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every requirement pins an exact version.
    pub fn is_fully_pinned(&self) -> bool {
        self.requirements().all(Requirement::is_pinned)
    }

    /// Digest over the meaningful entries.
    ///
    /// Comments and blank lines do not contribute, so cosmetic edits do
    /// not invalidate an installed environment.
    pub fn digest(&self) -> String {
        let encoded = serde_json::to_string(&self.entries).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Strip a trailing comment; a full-line comment becomes empty.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split a requirement line into name, constraint, and marker.
fn parse_requirement(line: &str) -> Option<Requirement> {
    let (spec, marker) = match line.split_once(';') {
        Some((spec, marker)) => (spec.trim(), Some(marker.trim().to_string())),
        None => (line, None),
    };

    let split_at = spec.find(|c| matches!(c, '=' | '<' | '>' | '~' | '!'));
    let (name, constraint) = match split_at {
        Some(idx) => {
            let (name, constraint) = spec.split_at(idx);
            (name.trim(), Some(constraint.trim().to_string()))
        }
        None => (spec.trim(), None),
    };

    if !is_valid_name(name) {
        return None;
    }
    Some(Requirement {
        name: name.to_string(),
        constraint,
        marker,
    })
}

/// Package names: letters, digits, `.` `_` `-`, plus a bracketed extras suffix.
fn is_valid_name(name: &str) -> bool {
    let base = match name.split_once('[') {
        Some((base, extras)) => {
            if !extras.ends_with(']') {
                return false;
            }
            base
        }
        None => name,
    };
    !base.is_empty()
        && base
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
