use std::sync::Arc;
use std::time::Duration;

use super::factory::{erase, ErasedFactory, Factory};
use super::key::{Abstraction, DependencyKey, KeySource};
use super::service_container::Container;
use crate::config::ContainerConfig;
use crate::errors::Result;

/// 等待 [`ContainerBuilder::build`] 注册的工厂
pub struct Provider {
    key: Result<DependencyKey>,
    factory: Arc<dyn ErasedFactory>,
}

impl Provider {
    pub fn by_name<F, Args>(name: &str, factory: F) -> Self
    where
        F: Factory<Args>,
        Args: 'static,
    {
        Self {
            key: name.dependency_key(),
            factory: erase(factory),
        }
    }

    pub fn by_abstraction<T, F, Args>(marker: Abstraction<T>, factory: F) -> Self
    where
        T: ?Sized + 'static,
        F: Factory<Args>,
        Args: 'static,
    {
        Self {
            key: marker.dependency_key(),
            factory: erase(factory),
        }
    }

    pub fn by_factory<F, Args>(factory: F) -> Self
    where
        F: Factory<Args>,
        Args: 'static,
    {
        Self {
            key: Ok(factory.output_key()),
            factory: erase(factory),
        }
    }

    fn register_into(self, container: &Container) -> Result<()> {
        container.register(self.key?, self.factory)
    }
}

/// 由导入的父容器和提供者组装容器
///
/// 先注册按名称的提供者，再注册按抽象的，最后是裸工厂；遇到第一个错误即中止。
#[derive(Default)]
pub struct ContainerBuilder {
    imports: Vec<Arc<Container>>,
    by_name: Vec<Provider>,
    by_abstraction: Vec<Provider>,
    by_factory: Vec<Provider>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加父容器，按调用顺序在本容器之后查找
    pub fn import(mut self, parent: Arc<Container>) -> Self {
        self.imports.push(parent);
        self
    }

    pub fn imports(mut self, parents: impl IntoIterator<Item = Arc<Container>>) -> Self {
        self.imports.extend(parents);
        self
    }

    pub fn provide_by_name<F, Args>(mut self, name: &str, factory: F) -> Self
    where
        F: Factory<Args>,
        Args: 'static,
    {
        self.by_name.push(Provider::by_name(name, factory));
        self
    }

    pub fn provide_by_abstraction<T, F, Args>(mut self, marker: Abstraction<T>, factory: F) -> Self
    where
        T: ?Sized + 'static,
        F: Factory<Args>,
        Args: 'static,
    {
        self.by_abstraction.push(Provider::by_abstraction(marker, factory));
        self
    }

    pub fn provide_by_factory<F, Args>(mut self, factory: F) -> Self
    where
        F: Factory<Args>,
        Args: 'static,
    {
        self.by_factory.push(Provider::by_factory(factory));
        self
    }

    /// 添加预先构造的提供者，与裸工厂一起按调用顺序注册
    pub fn provider(mut self, provider: Provider) -> Self {
        self.by_factory.push(provider);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Container> {
        self.config.validate()?;

        let container = Container::from_parts(self.imports, self.config);
        for provider in self
            .by_name
            .into_iter()
            .chain(self.by_abstraction)
            .chain(self.by_factory)
        {
            provider.register_into(&container)?;
        }

        tracing::debug!(
            factories = container.registered_keys().len(),
            imports = container.imports().len(),
            "container built"
        );
        Ok(container)
    }
}
