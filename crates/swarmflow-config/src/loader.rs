//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::{StoreKind, SwarmflowConfig};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load full Swarmflow configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<SwarmflowConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SwarmflowConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &SwarmflowConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.engine.step_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "engine.step_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.adaptive.max_turns == 0 {
        return Err(ConfigError::Invalid(
            "adaptive.max_turns must be > 0".to_string(),
        ));
    }

    if config.adaptive.stall_threshold == 0 {
        return Err(ConfigError::Invalid(
            "adaptive.stall_threshold must be > 0".to_string(),
        ));
    }

    if config.adaptive.worker_role.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "adaptive.worker_role must not be empty".to_string(),
        ));
    }

    if config.sequential.max_steps == 0 {
        return Err(ConfigError::Invalid(
            "sequential.max_steps must be > 0".to_string(),
        ));
    }

    if config.stores.kind == StoreKind::File
        && config.stores.path.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        return Err(ConfigError::Invalid(
            "stores.path is required when stores.kind is file".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let file = write_config("app:\n  name: travel-planner\n");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.version, 1);
        assert_eq!(config.app.name, "travel-planner");
        assert_eq!(config.engine.step_timeout_secs, 60);
        assert_eq!(config.engine.step_retries, 1);
        assert_eq!(config.adaptive.max_turns, 15);
        assert_eq!(config.adaptive.stall_threshold, 3);
        assert_eq!(config.adaptive.max_replans, 2);
        assert_eq!(config.adaptive.worker_role, "worker");
        assert_eq!(config.sequential.max_steps, 50);
        assert_eq!(config.stores.kind, StoreKind::Memory);
    }

    #[test]
    fn test_rejects_zero_thresholds() {
        let file = write_config("adaptive:\n  max_turns: 0\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_file_store_requires_path() {
        let file = write_config("stores:\n  kind: file\n");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let file = write_config("stores:\n  kind: file\n  path: /var/lib/swarmflow\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.stores.kind, StoreKind::File);
        assert_eq!(config.stores.path.as_deref(), Some("/var/lib/swarmflow"));
    }
}
