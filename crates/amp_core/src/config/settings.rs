//! Settings structures with serde defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

use super::runtime::{RuntimeEnv, DEFAULT_PORT};

/// Root settings, one field per TOML section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub image: ImageSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            runtime: RuntimeSettings::default(),
            image: ImageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Filesystem locations. Relative entries resolve against the project dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Dependency manifest file.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Virtual environment directory.
    #[serde(default = "default_venv_dir")]
    pub venv_dir: String,

    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_manifest() -> String {
    "requirements.txt".to_string()
}

fn default_venv_dir() -> String {
    ".venv".to_string()
}

fn default_logs_folder() -> String {
    ".amp/logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            venv_dir: default_venv_dir(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Runtime configuration injected into the service process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Port the service binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Disable interpreter output buffering.
    #[serde(default = "default_true")]
    pub unbuffered: bool,

    /// Weight cache override; absent means the torch default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torch_home: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            unbuffered: true,
            torch_home: None,
        }
    }
}

impl RuntimeSettings {
    /// Convert to the runtime environment that gets injected.
    pub fn runtime_env(&self) -> RuntimeEnv {
        RuntimeEnv {
            port: self.port,
            unbuffered: self.unbuffered,
            torch_home: self.torch_home.as_ref().map(PathBuf::from),
        }
    }
}

/// Container image assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Pinned base image.
    #[serde(default = "default_base_image")]
    pub base_image: String,

    /// System packages installed in a single layer.
    #[serde(default = "default_system_packages")]
    pub system_packages: Vec<String>,

    /// Working directory inside the image.
    #[serde(default = "default_workdir")]
    pub workdir: String,

    /// Session directory created inside the image.
    #[serde(default = "default_session_dir")]
    pub session_dir: String,

    /// Entrypoint argv (exec form).
    #[serde(default = "default_entrypoint")]
    pub entrypoint: Vec<String>,

    /// Default image tag.
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_base_image() -> String {
    "python:3.11-slim".to_string()
}

fn default_system_packages() -> Vec<String> {
    vec!["ffmpeg".to_string(), "libsndfile1".to_string()]
}

fn default_workdir() -> String {
    "/app".to_string()
}

fn default_session_dir() -> String {
    "/tmp/music-ai/sessions".to_string()
}

fn default_entrypoint() -> Vec<String> {
    vec!["python".to_string(), "app_hf.py".to_string()]
}

fn default_tag() -> String {
    "music-ai-backend".to_string()
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            system_packages: default_system_packages(),
            workdir: default_workdir(),
            session_dir: default_session_dir(),
            entrypoint: default_entrypoint(),
            tag: default_tag(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Compact mode: suppress raw tool output unless a command fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Output lines kept for failure reporting.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress messages logged every N percent.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prepend timestamps to log lines.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
        }
    }
}

impl LoggingSettings {
    /// Convert to a logger configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            compact: self.compact,
            error_tail: self.error_tail as usize,
            progress_step: self.progress_step,
            show_timestamps: self.show_timestamps,
            ..LogConfig::default()
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Runtime,
    Image,
    Logging,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Runtime => "runtime",
            ConfigSection::Image => "image",
            ConfigSection::Logging => "logging",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[runtime]"));
        assert!(toml.contains("[image]"));
        assert!(toml.contains("base_image"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.manifest, settings.paths.manifest);
        assert_eq!(parsed.runtime.port, settings.runtime.port);
        assert_eq!(parsed.image.base_image, settings.image.base_image);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[runtime]\nport = 8000";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.runtime.port, 8000);
        // Defaults applied for missing
        assert_eq!(parsed.paths.manifest, "requirements.txt");
        assert_eq!(parsed.image.base_image, "python:3.11-slim");
        assert!(parsed.logging.compact);
    }

    #[test]
    fn runtime_settings_convert_to_env() {
        let settings = RuntimeSettings {
            port: 9000,
            unbuffered: true,
            torch_home: Some("/weights".to_string()),
        };
        let env = settings.runtime_env();
        assert_eq!(env.port, 9000);
        assert_eq!(env.torch_home, Some(PathBuf::from("/weights")));
    }

    #[test]
    fn logging_settings_convert_to_log_config() {
        let settings = LoggingSettings {
            compact: false,
            error_tail: 50,
            ..LoggingSettings::default()
        };
        let config = settings.log_config();
        assert!(!config.compact);
        assert_eq!(config.error_tail, 50);
    }
}
