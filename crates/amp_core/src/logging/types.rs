//! Logging types and configuration.

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Configuration for per-run logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level written to the log.
    pub level: LogLevel,

    /// Compact mode: suppress raw tool output unless a command fails.
    pub compact: bool,

    /// Progress messages are only logged every N percent.
    pub progress_step: u32,

    /// Number of raw output lines kept for failure reporting.
    pub error_tail: usize,

    /// Prepend timestamps to log lines.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// Verbose preset: full tool output at debug level.
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            compact: false,
            ..Self::default()
        }
    }
}

/// Callback receiving each formatted log line as it is written.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Message prefixes for the different kinds of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// An external command about to run.
    Command,
    /// A major phase of a run.
    Phase,
    /// A sub-section within a phase.
    Section,
    /// A validation check.
    Validation,
    /// Successful completion.
    Success,
    Warning,
    Error,
    Debug,
    /// No prefix.
    Raw,
}

impl MessagePrefix {
    /// Format a message with this prefix.
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Command => format!("$ {}", message),
            MessagePrefix::Phase => format!("=== {} ===", message),
            MessagePrefix::Section => format!("--- {} ---", message),
            MessagePrefix::Validation => format!("[Validation] {}", message),
            MessagePrefix::Success => format!("[SUCCESS] {}", message),
            MessagePrefix::Warning => format!("[WARNING] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
            MessagePrefix::Debug => format!("[DEBUG] {}", message),
            MessagePrefix::Raw => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_format_as_expected() {
        assert_eq!(MessagePrefix::Command.format("pip install"), "$ pip install");
        assert_eq!(MessagePrefix::Phase.format("Install"), "=== Install ===");
        assert_eq!(MessagePrefix::Success.format("done"), "[SUCCESS] done");
        assert_eq!(MessagePrefix::Raw.format("plain"), "plain");
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn verbose_preset_disables_compact() {
        let config = LogConfig::verbose();
        assert!(!config.compact);
        assert_eq!(config.level, LogLevel::Debug);
    }
}
