use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::brand::{Canonicalizer, Registry, RegistryError};

pub const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "logoset";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid brand alias override: {0}")]
    Registry(#[from] RegistryError),
}

/// User settings, read from a JSON file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Lowercase image extensions picked up when scanning.
    pub image_extensions: Vec<String>,
    pub label_extension: String,
    /// Extra or re-pointed aliases, e.g. `{"instagram": "instagram"}`.
    pub brand_aliases: BTreeMap<String, String>,
    /// Minimum images per brand kept by `organize` when no flag is given.
    pub min_images_per_brand: usize,
    pub split_seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            label_extension: "txt".to_string(),
            brand_aliases: BTreeMap::new(),
            min_images_per_brand: 0,
            split_seed: 42,
        }
    }
}

impl Settings {
    /// Loads `explicit` if given, otherwise the per-user config file when it
    /// exists, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        settings.image_extensions = settings
            .image_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        settings.label_extension = settings.label_extension.trim_start_matches('.').to_string();

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Canonicalizer over the built-in registry plus any configured aliases.
    pub fn canonicalizer(&self) -> Result<Canonicalizer, ConfigError> {
        if self.brand_aliases.is_empty() {
            return Ok(Canonicalizer::default());
        }
        let registry = Registry::builtin().with_overrides(&self.brand_aliases)?;
        Ok(Canonicalizer::new(registry))
    }
}

/// `<config dir>/logoset/config.json`, e.g. `~/.config/logoset/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "image_extensions": [".PNG", "webp"], "split_seed": 7 }"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.image_extensions, vec!["png", "webp"]);
        assert_eq!(settings.split_seed, 7);
        assert_eq!(settings.label_extension, "txt");
        assert_eq!(settings.min_images_per_brand, 0);
    }

    #[test]
    fn test_aliases_feed_canonicalizer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{ "brand_aliases": { "WhatsApp": "whatsapp", "vw group": "volkswagen" } }"#,
        )
        .unwrap();

        let canonicalizer = Settings::load(Some(&path)).unwrap().canonicalizer().unwrap();

        assert_eq!(canonicalizer.canonicalize("whatsapp_icon").as_deref(), Some("whatsapp"));
        assert_eq!(canonicalizer.canonicalize("VW Group Logo").as_deref(), Some("volkswagen"));
        assert_eq!(canonicalizer.canonicalize("instagram").as_deref(), Some("meta"));
    }

    #[test]
    fn test_empty_alias_override_rejected() {
        let mut settings = Settings::default();
        settings.brand_aliases.insert("   ".to_string(), "nothing".to_string());

        assert!(matches!(
            settings.canonicalizer(),
            Err(ConfigError::Registry(RegistryError::InvalidAlias { .. }))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Settings::load(Some(&temp_dir.path().join("absent.json")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }
}
