use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;

/// Environment variable overriding the construction timeout, in milliseconds.
pub const TIMEOUT_ENV_VAR: &str = "DEPI_TIMEOUT_MS";

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Settings shared by every resolution in a container.
///
/// Circular dependency detection is not configurable; it is always on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Upper bound for a single factory call.
    pub timeout: Duration,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Config as it appears in a TOML file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialContainerConfig {
    pub timeout_ms: Option<u64>,
}

impl ContainerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parses a TOML document, then applies defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let partial: PartialContainerConfig = toml::from_str(source)
            .map_err(|e| ConfigError::TomlParse("<inline>".to_string(), e))?;
        Self::from_partial_and_env(partial, HashMap::new())
    }

    /// Merges file values with environment overrides. Environment wins.
    pub fn from_partial_and_env(
        partial: PartialContainerConfig,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_ms = match env_map.get(TIMEOUT_ENV_VAR) {
            Some(raw) => parse_env(TIMEOUT_ENV_VAR, raw)?,
            None => partial
                .timeout_ms
                .unwrap_or(defaults.timeout.as_millis() as u64),
        };

        let config = Self {
            timeout: Duration::from_millis(timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        reason: format!("cannot parse '{raw}'"),
    })
}
