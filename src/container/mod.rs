//! 依赖注入容器模块

pub mod builder;
pub mod factory;
mod guard;
pub mod key;
mod registry;
pub mod service_container;
pub mod wiring;

pub use builder::{ContainerBuilder, Provider};
pub use factory::{
    downcast_instance, Autowired, Constructed, DependencyName, Factory, FactoryOutput, Instance, Named,
    Parameter,
};
pub use key::{Abstraction, DependencyKey, KeySource};
pub use service_container::{Container, ContainerStats, InstanceLookup};
pub use wiring::{Field, FieldTag, Inject, InjectSlot, Wired};

/// 声明一个把依赖名称绑定到目标类型的标记类型
///
/// ```ignore
/// depi::named_dependency!(pub ClockName: dyn Clock = "clock");
///
/// container.provide_by_name(ClockName::NAME, || async {
///     Named::<ClockName>::new(Arc::new(SystemClock))
/// })?;
/// ```
#[macro_export]
macro_rules! named_dependency {
    ($(#[$meta:meta])* $vis:vis $marker:ident : $target:ty = $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $marker;

        impl $crate::DependencyName for $marker {
            const NAME: &'static str = $name;
            type Target = $target;
        }
    };
}

/// 在异步代码中解析服务的简写
#[macro_export]
macro_rules! resolve {
    ($container:expr, $type:ty, $name:expr) => {
        $container.get_named::<$type>($name).await
    };
    ($container:expr, $type:ty) => {
        $container.get::<$type>().await
    };
}
