//! Configuration file loading, environment overrides, and validation.

use crate::error::ConfigError;
use crate::types::{CacheSize, GlintConfig};
use std::path::Path;

/// Name of the configuration file inside a configuration directory.
pub const CONFIG_FILE: &str = "glint.toml";

/// Environment variable overriding `cache.size`.
pub const SIZE_ENV: &str = "GLINT_SHADER_CACHE_SIZE";

/// Loads and validates `<dir>/glint.toml`.
pub fn load_config(dir: &Path) -> Result<GlintConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but a missing file yields the default configuration.
///
/// Environment overrides from the process environment are applied either way.
pub fn load_config_or_default(dir: &Path) -> Result<GlintConfig, ConfigError> {
    let config = match load_config(dir) {
        Ok(config) => config,
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            GlintConfig::default()
        }
        Err(e) => return Err(e),
    };
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Parses and validates a `glint.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<GlintConfig, ConfigError> {
    let config: GlintConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Applies environment overrides read through `lookup`.
///
/// [`SIZE_ENV`] replaces `cache.size`; an empty value is ignored.
pub fn apply_env_overrides(
    mut config: GlintConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<GlintConfig, ConfigError> {
    if let Some(raw) = lookup(SIZE_ENV).filter(|v| !v.trim().is_empty()) {
        config.cache.size = raw
            .parse::<CacheSize>()
            .map_err(|e| ConfigError::ValidationError(format!("{SIZE_ENV}: {e}")))?;
    }
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &GlintConfig) -> Result<(), ConfigError> {
    if config.cache.vendor.is_empty() {
        return Err(ConfigError::MissingField("cache.vendor".to_string()));
    }
    if config.cache.renderer.is_empty() {
        return Err(ConfigError::MissingField("cache.renderer".to_string()));
    }
    if let Some(root) = &config.cache.root {
        if !root.is_absolute() {
            return Err(ConfigError::ValidationError(format!(
                "cache.root must be absolute, got '{}'",
                root.display()
            )));
        }
    }
    Ok(())
}
