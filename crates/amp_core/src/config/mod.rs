//! Configuration for amp.
//!
//! This module provides:
//! - TOML settings with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only the changed section is modified)
//! - The runtime environment contract for the service process
//!
//! # Example
//!
//! ```no_run
//! use amp_core::config::{ConfigManager, ConfigSection};
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new(".amp/settings.toml");
//! config.load_or_create().unwrap();
//!
//! // Read settings
//! println!("Manifest: {}", config.settings().paths.manifest);
//!
//! // Modify a setting
//! config.settings_mut().runtime.port = 8080;
//!
//! // Save just the runtime section atomically
//! config.update_section(ConfigSection::Runtime).unwrap();
//! ```

mod manager;
mod runtime;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use runtime::{RuntimeEnv, RuntimeVar, DEFAULT_PORT};
pub use settings::{
    ConfigSection, ImageSettings, LoggingSettings, PathSettings, RuntimeSettings, Settings,
};
