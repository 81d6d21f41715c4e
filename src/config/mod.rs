pub mod container_config;
pub mod loader;

pub use container_config::{ContainerConfig, PartialContainerConfig, DEFAULT_TIMEOUT_MS};
pub use loader::ConfigLoader;
