//! Configuration for the command executor.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;

pub const CHECK_DELAY_ENV: &str = "ACTION_DRIVER_CHECK_DELAY_MS";
pub const DEFAULT_BUDGET_ENV: &str = "ACTION_DRIVER_DEFAULT_BUDGET_MS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Interval between element existence/visibility probes
    pub check_element_delay_ms: u64,
    /// Message shown by the waiting indicator during resolution
    pub indicator_message: String,
    /// Element availability budget used when the caller does not supply one
    pub default_budget_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            check_element_delay_ms: 200,
            indicator_message: "Waiting for the target element of the next action to appear"
                .to_string(),
            default_budget_ms: 10_000,
        }
    }
}

impl ExecutorConfig {
    pub fn check_element_delay(&self) -> Duration {
        Duration::from_millis(self.check_element_delay_ms)
    }

    pub fn default_budget(&self) -> Duration {
        Duration::from_millis(self.default_budget_ms)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded executor config");
        Self::from_yaml_str(&source)
    }

    /// Apply `ACTION_DRIVER_*` overrides from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CHECK_DELAY_ENV) {
            self.check_element_delay_ms = parse_millis(CHECK_DELAY_ENV, &value)?;
        }
        if let Some(value) = lookup(DEFAULT_BUDGET_ENV) {
            self.default_budget_ms = parse_millis(DEFAULT_BUDGET_ENV, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.check_element_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "check_element_delay_ms".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_driver_constants() {
        let config = ExecutorConfig::default();
        assert_eq!(config.check_element_delay(), Duration::from_millis(200));
        assert_eq!(config.default_budget(), Duration::from_secs(10));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ExecutorConfig::from_yaml_str("check_element_delay_ms: 50\n").unwrap();
        assert_eq!(config.check_element_delay_ms, 50);
        assert_eq!(config.default_budget_ms, 10_000);
    }

    #[test]
    fn zero_delay_is_rejected() {
        let err = ExecutorConfig::from_yaml_str("check_element_delay_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = ExecutorConfig::default()
            .apply_overrides(|key| match key {
                DEFAULT_BUDGET_ENV => Some("2500".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.default_budget_ms, 2500);

        let err = ExecutorConfig::default()
            .apply_overrides(|key| (key == CHECK_DELAY_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(CHECK_DELAY_ENV));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("executor.yaml");
        std::fs::write(&path, "indicator_message: hold on\n").unwrap();

        let config = ExecutorConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.indicator_message, "hold on");
    }
}
