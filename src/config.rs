//! Configuration management for the cube schema store
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (cubes.toml)
//! - Environment variables (CUBES__*)
//!
//! ## Example config file (cubes.toml):
//! ```toml
//! [document]
//! path = "./Monza.xml"
//! verify_unchanged = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the cube schema store
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Schema document settings
    #[serde(default)]
    pub document: DocumentConfig,
}

/// Schema document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Path to the schema XML file
    #[serde(default = "default_document_path")]
    pub path: PathBuf,

    /// Refuse to write over a file that changed after it was loaded
    #[serde(default = "default_true")]
    pub verify_unchanged: bool,
}

fn default_document_path() -> PathBuf {
    PathBuf::from("./Monza.xml")
}

fn default_true() -> bool {
    true
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: default_document_path(),
            verify_unchanged: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["cubes.toml", ".cubes.toml", "config/cubes.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "cubes") {
            let xdg_config = config_dir.config_dir().join("cubes.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CUBES__DOCUMENT__PATH and friends
        builder = builder.add_source(
            Environment::with_prefix("CUBES")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the schema document path (resolves relative paths)
    pub fn document_path(&self) -> PathBuf {
        if self.document.path.is_absolute() {
            self.document.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.document.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.document.verify_unchanged);
        assert_eq!(config.document.path, PathBuf::from("./Monza.xml"));
        assert!(config.document_path().is_absolute());
    }

    #[test]
    fn test_serialize_config() {
        let config = StoreConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[document]"));
        assert!(toml_str.contains("verify_unchanged = true"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[document]\npath = \"/srv/olap/FoodMart.xml\"\nverify_unchanged = false\n",
        )
        .unwrap();

        let config = StoreConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.document_path(), PathBuf::from("/srv/olap/FoodMart.xml"));
        assert!(!config.document.verify_unchanged);
    }
}
