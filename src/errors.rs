use std::time::Duration;

use thiserror::Error;

use crate::container::DependencyKey;

/// Boxed error reported by a factory through its `Result` output.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the container.
pub type Result<T, E = ContainerError> = std::result::Result<T, E>;

/// Every failure the container can report.
///
/// None of these are retried by the container; the caller wiring the
/// application decides whether to abort.
#[derive(Debug, Error)]
pub enum ContainerError {
    // Configuration errors
    #[error("malformed key source: {0}")]
    MalformedKeySource(String),
    #[error("\"{0}\" already provided")]
    DuplicateKey(DependencyKey),
    #[error("cannot provide \"{0}\": container is already running")]
    RegistrationClosed(DependencyKey),
    #[error("container is already running")]
    AlreadyRunning,
    #[error("wrong return type in factory for \"{declared}\" dependency, got \"{actual}\"")]
    KeyMismatch {
        declared: DependencyKey,
        actual: DependencyKey,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Resolution errors
    #[error("\"{0}\" dependency not provided")]
    NotProvided(DependencyKey),
    #[error("\"{key}\" returned error: \"{source}\"")]
    FactoryFailed {
        key: DependencyKey,
        #[source]
        source: BoxError,
    },
    #[error("{key} call timed out after {timeout:?}")]
    Timeout { key: DependencyKey, timeout: Duration },
    #[error("circular dependency detected: {}", format_chain(.chain))]
    CircularDependency { chain: Vec<DependencyKey> },
    #[error("\"{key}\" resolved to a value that is not `{expected}`")]
    TypeMismatch {
        key: DependencyKey,
        expected: &'static str,
    },

    // Ownership errors
    #[error("failed to set instance of \"{0}\": no container in the import chain owns it")]
    NoOwner(DependencyKey),
}

impl ContainerError {
    /// Key named by the error, when there is one.
    pub fn key(&self) -> Option<&DependencyKey> {
        match self {
            ContainerError::DuplicateKey(key)
            | ContainerError::RegistrationClosed(key)
            | ContainerError::NotProvided(key)
            | ContainerError::NoOwner(key) => Some(key),
            ContainerError::KeyMismatch { declared, .. } => Some(declared),
            ContainerError::FactoryFailed { key, .. }
            | ContainerError::Timeout { key, .. }
            | ContainerError::TypeMismatch { key, .. } => Some(key),
            ContainerError::CircularDependency { chain } => chain.last(),
            ContainerError::MalformedKeySource(_)
            | ContainerError::AlreadyRunning
            | ContainerError::Config(_) => None,
        }
    }

    /// True for errors raised while configuring rather than resolving.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ContainerError::MalformedKeySource(_)
                | ContainerError::DuplicateKey(_)
                | ContainerError::RegistrationClosed(_)
                | ContainerError::AlreadyRunning
                | ContainerError::KeyMismatch { .. }
                | ContainerError::Config(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

fn format_chain(chain: &[DependencyKey]) -> String {
    chain
        .iter()
        .map(DependencyKey::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
