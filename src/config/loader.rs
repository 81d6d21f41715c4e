use std::{collections::HashMap, env, fs, path::PathBuf};

use crate::errors::ConfigError;

use super::container_config::{ContainerConfig, PartialContainerConfig, TIMEOUT_ENV_VAR};

/// Loads [`ContainerConfig`] from an optional TOML file plus the environment.
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader that only reads the environment.
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Loader reading `path` before applying environment overrides.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn load(&self) -> Result<ContainerConfig, ConfigError> {
        let partial = self.load_partial()?;
        let config = ContainerConfig::from_partial_and_env(partial, self.collect_env_vars())?;
        tracing::debug!(
            timeout_ms = config.timeout.as_millis(),
            "container config loaded"
        );
        Ok(config)
    }

    fn load_partial(&self) -> Result<PartialContainerConfig, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(PartialContainerConfig::default());
        };

        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead(display.clone(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlParse(display, e))
    }

    fn collect_env_vars(&self) -> HashMap<String, String> {
        [TIMEOUT_ENV_VAR]
            .into_iter()
            .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
