use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Settings read from the environment (and `.env`) before any command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub telemetry: TelemetryConfig,
    /// Directory used for exports when `--out` is not given.
    pub export_dir: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl CliConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("APPLY_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        if log_level.trim().is_empty() {
            return Err(ConfigError::EmptyLogLevel);
        }

        let export_dir = match lookup("APPLY_EXPORT_DIR") {
            Some(dir) if dir.trim().is_empty() => return Err(ConfigError::EmptyExportDir),
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from("."),
        };

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
            export_dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("APPLY_LOG_LEVEL cannot be empty")]
    EmptyLogLevel,
    #[error("APPLY_EXPORT_DIR cannot be empty")]
    EmptyExportDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).expect("defaults");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.export_dir, PathBuf::from("."));
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("APPLY_LOG_LEVEL", "apply_spec=debug"),
            ("APPLY_EXPORT_DIR", "/tmp/exports"),
        ])
        .expect("overrides");
        assert_eq!(config.telemetry.log_level, "apply_spec=debug");
        assert_eq!(config.export_dir, PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn rejects_blank_values() {
        assert_eq!(
            config(&[("APPLY_LOG_LEVEL", " ")]),
            Err(ConfigError::EmptyLogLevel)
        );
        assert_eq!(
            config(&[("APPLY_EXPORT_DIR", "")]),
            Err(ConfigError::EmptyExportDir)
        );
    }
}
