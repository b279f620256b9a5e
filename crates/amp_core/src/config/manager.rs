//! Settings file management with atomic writes.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};
use tracing::warn;

use super::settings::{ConfigSection, Settings};

/// Errors from loading or saving the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to edit config document: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages the settings file: load, validate, save, targeted updates.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for the given settings file path. Nothing is
    /// read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create) is called.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load the settings file; error if it does not exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        let content = std::fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load the settings file, creating it with defaults when missing.
    ///
    /// Unknown top-level sections are dropped and the cleaned file is
    /// written back.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.parse_validate_and_clean()
        } else {
            if let Some(parent) = self.config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.settings = Settings::default();
            self.save()
        }
    }

    fn parse_validate_and_clean(&mut self) -> ConfigResult<()> {
        let content = std::fs::read_to_string(&self.config_path)?;
        let mut doc: DocumentMut = content.parse()?;

        let valid_sections = ["paths", "runtime", "image", "logging"];
        let unknown: Vec<String> = doc
            .as_table()
            .iter()
            .map(|(key, _)| key.to_string())
            .filter(|key| !valid_sections.contains(&key.as_str()))
            .collect();

        let was_modified = !unknown.is_empty();
        for key in &unknown {
            warn!("Removing unknown settings section [{}]", key);
            doc.remove(key);
        }

        self.settings = toml::from_str(&doc.to_string())?;
        if was_modified {
            self.save()?;
        }
        Ok(())
    }

    /// Save the full settings file with section comments.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(content.as_bytes())
    }

    /// Rewrite a single section, leaving the rest of the file untouched.
    pub fn update_section(&self, section: ConfigSection) -> ConfigResult<()> {
        let content = if self.config_path.exists() {
            std::fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };
        let mut doc: DocumentMut = content.parse()?;

        let section_toml = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Runtime => toml::to_string_pretty(&self.settings.runtime)?,
            ConfigSection::Image => toml::to_string_pretty(&self.settings.image)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
        };
        let section_doc: DocumentMut = section_toml.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(doc.to_string().as_bytes())
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut out = String::new();
        out.push_str("# amp settings\n");
        out.push_str("# Relative paths resolve against the project directory.\n\n");

        out.push_str("[paths]\n");
        out.push_str(&toml::to_string_pretty(&self.settings.paths)?);
        out.push('\n');

        out.push_str("# Runtime environment injected into the service process.\n");
        out.push_str("[runtime]\n");
        out.push_str(&toml::to_string_pretty(&self.settings.runtime)?);
        out.push('\n');

        out.push_str("# Container image assembly.\n");
        out.push_str("[image]\n");
        out.push_str(&toml::to_string_pretty(&self.settings.image)?);
        out.push('\n');

        out.push_str("# Per-run log files.\n");
        out.push_str("[logging]\n");
        out.push_str(&toml::to_string_pretty(&self.settings.logging)?);

        Ok(out)
    }

    /// Write to a temp file in the same directory, then rename over the
    /// target, so a crash never leaves a half-written settings file.
    fn atomic_write(&self, bytes: &[u8]) -> ConfigResult<()> {
        let tmp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.config_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[image]"));
        assert!(content.contains("base_image"));
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();
        manager.settings_mut().runtime.port = 9000;
        manager.save().unwrap();

        let mut reloaded = ConfigManager::new(&path);
        reloaded.load_or_create().unwrap();
        assert_eq!(reloaded.settings().runtime.port, 9000);
    }

    #[test]
    fn load_errors_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("nope.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn unknown_sections_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[bogus]\nkey = 1\n\n[runtime]\nport = 8000\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();
        assert_eq!(manager.settings().runtime.port, 8000);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("bogus"));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();
        manager.settings_mut().runtime.port = 9000;
        manager.save().unwrap();

        manager.settings_mut().image.tag = "custom-tag".to_string();
        manager.update_section(ConfigSection::Image).unwrap();

        let mut reloaded = ConfigManager::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().image.tag, "custom-tag");
        assert_eq!(reloaded.settings().runtime.port, 9000);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        assert!(!path.with_extension("toml.tmp").exists());
    }
}
