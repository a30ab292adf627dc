//! Layered configuration: defaults, TOML file, environment, command line.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DEFAULT_CONTENT_SELECTOR;

/// Directory name used under the platform config/data dirs.
pub const APP_DIR: &str = "chromatic-harmony";
/// Environment variable prefix, e.g. `CHROMATIC_STORE__PATH`.
pub const ENV_PREFIX: &str = "CHROMATIC_";

/// Error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading/writing file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Layer merge or extraction failed
    #[error("configuration error: {0}")]
    Extract(#[from] Box<figment::Error>),
    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Extract(Box::new(e))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub document: DocumentConfig,
    pub logging: LoggingConfig,
}

/// Where preferences are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Preference file (JSON). Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Document settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Selector of the element that receives correction filters
    pub content_selector: String,
    /// Title used for rendered previews
    pub title: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            content_selector: DEFAULT_CONTENT_SELECTOR.to_string(),
            title: "Chromatic Harmony".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path (default: chromatic-harmony.log)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Default config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Build a figment from defaults, an optional TOML file, the environment,
    /// and explicit `(dotted.key, value)` overrides, in increasing priority.
    pub fn figment(file: Option<&Path>, overrides: &[(&str, String)]) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        for (key, value) in overrides {
            figment = figment.merge(Serialized::default(key, value));
        }
        figment
    }

    /// Load layered configuration.
    pub fn load_layered(
        file: Option<&Path>,
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        Ok(Self::figment(file, overrides).extract()?)
    }

    /// Load configuration from a TOML file only.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(&content))
            .extract()?)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved preference file location.
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join(APP_DIR).join("state.json"))
                .unwrap_or_else(|| PathBuf::from("chromatic-harmony-state.json"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.document.content_selector, ".content-wrapper");
        assert_eq!(config.logging.level, "info");
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_overrides_beat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\npath = \"from-file.json\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config =
            AppConfig::load_layered(Some(&path), &[("store.path", "from-cli.json".to_string())])
                .unwrap();
        assert_eq!(config.store.path, Some(PathBuf::from("from-cli.json")));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.document.content_selector, ".content-wrapper");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.document.content_selector = "#app".into();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
