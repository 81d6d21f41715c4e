//! 延迟构造、仅单例的依赖注入容器
//!
//! 服务按名称或类型取键，首次使用时由异步工厂构造，工厂参数同样从容器解析，
//! 结果缓存在拥有该工厂的容器中。容器通过导入父容器进行组合。

pub mod config;
pub mod container;
pub mod errors;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::{ConfigLoader, ContainerConfig};
pub use container::{
    Abstraction, Autowired, Container, ContainerBuilder, ContainerStats, DependencyKey, DependencyName, Factory,
    FactoryOutput, Field, FieldTag, Inject, InjectSlot, Instance, InstanceLookup, KeySource, Named, Parameter,
    Provider, Wired,
};
pub use errors::{BoxError, ConfigError, ContainerError, Result};
