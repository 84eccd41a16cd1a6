use crate::estimation::EngineSettings;
use crate::estimation::adjustment::ConditionSettings;
use crate::optimizer::OptimizerSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub engine: Option<EngineSettings>,
    #[serde(default)]
    pub conditions: Option<ConditionSettings>,
    #[serde(default)]
    pub optimizer: Option<OptimizerSettings>,
    #[serde(default)]
    pub data: Option<DataSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSection {
    /// JSON array of observations used to seed the in-memory provider
    pub observations_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    pub fn observations_path(&self) -> Option<&Path> {
        let path = self.data.as_ref()?.observations_path.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Returns the configured log level, falling back to "info" when blank.
    pub fn log_level(&self) -> &str {
        let level = self.logging.level.trim();
        if level.is_empty() { DEFAULT_LOG_LEVEL } else { level }
    }

    /// Engine settings with the condition chain folded in (defaults for missing sections).
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = self.engine.clone().unwrap_or_default();
        if let Some(conditions) = &self.conditions {
            settings.conditions = conditions.clone();
        }
        settings
    }

    pub fn optimizer_settings(&self) -> OptimizerSettings {
        self.optimizer.clone().unwrap_or_default()
    }
}
