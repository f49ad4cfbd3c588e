//! Typed settings with layered precedence (defaults → file → environment).

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const LOCAL_CONFIG_BASENAME: &str = "mortar";
const ENV_PREFIX: &str = "MORTAR";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// Load settings from an optional TOML file (falling back to
    /// `mortar.toml` in the working directory) plus `MORTAR__*` environment
    /// overrides, e.g. `MORTAR__CACHE__ENABLE_PAGES=false`.
    pub fn load(config_file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        builder = match config_file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false)),
        };
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Per-namespace cache enable flags. A disabled namespace degrades to
/// pass-through loads; population stays single-flight either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enable_pages: bool,
    pub enable_files: bool,
    pub enable_parameters: bool,
    pub enable_projects: bool,
    pub enable_uris: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enable_pages: true,
            enable_files: true,
            enable_parameters: true,
            enable_projects: true,
            enable_uris: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn defaults_enable_every_cache() {
        let settings = Settings::default();
        assert!(settings.cache.enable_pages);
        assert!(settings.cache.enable_files);
        assert!(settings.cache.enable_parameters);
        assert!(settings.cache.enable_projects);
        assert!(settings.cache.enable_uris);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn toml_overrides_deserialize() {
        let raw = r#"
            [logging]
            level = "debug"
            format = "json"

            [cache]
            enable_files = false
        "#;
        let settings: Settings = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .expect("config should build")
            .try_deserialize()
            .expect("settings should deserialize");

        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(!settings.cache.enable_files);
        assert!(settings.cache.enable_pages);
    }
}
