//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::transformer::TransformerConfig;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file inside a project directory.
pub const CONFIG_FILE: &str = "foundry.toml";

/// Loads and validates `foundry.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `foundry.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.cache.enabled && config.cache.directory.trim().is_empty() {
        return Err(ConfigError::MissingField("cache.directory".to_string()));
    }
    TransformerConfig::try_from(config).map(|_| ())
}
