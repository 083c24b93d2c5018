//! Editor configuration
//!
//! Stored in `~/.config/opbundle/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Editor configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Session file, relative to the working directory
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Directory the bundle is exported to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Channel pointed at the exported CSV when the package names none
    #[serde(default = "default_channel")]
    pub default_channel: String,

    /// Treat a failed validation as fatal on export
    #[serde(default)]
    pub strict: bool,
}

fn default_api_version() -> String {
    "opbundle.io/v1".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".opbundle").join("session.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bundle")
}

fn default_channel() -> String {
    "alpha".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            session_file: default_session_file(),
            output_dir: default_output_dir(),
            default_channel: default_channel(),
            strict: false,
        }
    }
}

impl EditorConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        if config.default_channel.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "defaultChannel must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CoreError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("opbundle").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_for_missing_fields() {
        let config: EditorConfig = serde_yaml::from_str("strict: true\n").unwrap();

        assert!(config.strict);
        assert_eq!(config.default_channel, "alpha");
        assert_eq!(config.session_file, PathBuf::from(".opbundle/session.json"));
        assert_eq!(config.output_dir, PathBuf::from("bundle"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = EditorConfig {
            default_channel: "stable".to_string(),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        let loaded = EditorConfig::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_empty_default_channel_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "defaultChannel: ''\n").unwrap();

        assert!(matches!(
            EditorConfig::load_from(&path),
            Err(CoreError::InvalidConfig { .. })
        ));
    }
}
