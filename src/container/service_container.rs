//! 容器：注册、基于导入的组合与解析

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::builder::ContainerBuilder;
use super::factory::{downcast_instance, erase, ErasedFactory, Factory, Instance};
use super::guard::guarded;
use super::key::{Abstraction, DependencyKey, KeySource};
use super::registry::{FactoryRegistry, InstanceStore};
use super::wiring::{Field, Wired};
use crate::config::ContainerConfig;
use crate::errors::{ContainerError, Result};

/// 在容器及其导入中查找缓存实例的结果
#[derive(Clone)]
pub enum InstanceLookup {
    /// 已有缓存实例
    Found(Instance),
    /// 本容器拥有工厂，但实例尚未构造
    Pending,
    /// 本容器及其导入都没有实例
    Unknown,
}

impl InstanceLookup {
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            InstanceLookup::Found(instance) => Some(instance),
            InstanceLookup::Pending | InstanceLookup::Unknown => None,
        }
    }
}

/// 单例依赖注入容器
///
/// 父容器通过 `Arc` 共享，被导入的容器总是比导入它的子容器活得更久。
pub struct Container {
    imports: Vec<Arc<Container>>,
    factories: RwLock<FactoryRegistry>,
    instances: RwLock<InstanceStore>,
    config: ContainerConfig,
    running: AtomicBool,
    stats: InnerStats,
}

#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    constructions: AtomicUsize,
}

/// 单个容器的解析统计快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub constructions: usize,
    pub registered_factories: usize,
    pub cached_instances: usize,
}

impl ContainerStats {
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_resolutions as f64
        }
    }
}

impl Container {
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), ContainerConfig::default())
    }

    /// 空容器，使用给定配置；配置无效时返回 `ContainerError::Config`
    pub fn with_config(config: ContainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(Vec::new(), config))
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(imports: Vec<Arc<Container>>, config: ContainerConfig) -> Self {
        Self {
            imports,
            factories: RwLock::new(FactoryRegistry::default()),
            instances: RwLock::new(InstanceStore::default()),
            config,
            running: AtomicBool::new(false),
            stats: InnerStats::default(),
        }
    }

    /// 关闭注册；解析在此前后都可用
    pub fn run(&self) -> Result<()> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ContainerError::AlreadyRunning)?;
        debug!(factories = self.factories.read().len(), "container running");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn imports(&self) -> &[Arc<Container>] {
        &self.imports
    }

    // ---- 注册 ----

    /// 把 `factory` 注册到由 `source` 推导出的键下
    pub fn provide<S, F, Args>(&self, source: S, factory: F) -> Result<()>
    where
        S: KeySource,
        F: Factory<Args>,
        Args: 'static,
    {
        let key = source.dependency_key()?;
        self.register(key, erase(factory))
    }

    pub fn provide_by_name<F, Args>(&self, name: &str, factory: F) -> Result<()>
    where
        F: Factory<Args>,
        Args: 'static,
    {
        self.provide(name, factory)
    }

    pub fn provide_by_abstraction<T, F, Args>(&self, marker: Abstraction<T>, factory: F) -> Result<()>
    where
        T: ?Sized + 'static,
        F: Factory<Args>,
        Args: 'static,
    {
        self.provide(marker, factory)
    }

    /// 把 `factory` 注册到其输出类型的键下
    pub fn provide_by_factory<F, Args>(&self, factory: F) -> Result<()>
    where
        F: Factory<Args>,
        Args: 'static,
    {
        let key = factory.output_key();
        self.register(key, erase(factory))
    }

    pub(crate) fn register(&self, key: DependencyKey, factory: Arc<dyn ErasedFactory>) -> Result<()> {
        if self.is_running() {
            return Err(ContainerError::RegistrationClosed(key));
        }

        self.factories.write().insert(key.clone(), factory)?;
        debug!(key = %key, "dependency provided");
        Ok(())
    }

    /// 本容器自身是否注册了 `key` 的工厂
    pub fn is_registered(&self, key: &DependencyKey) -> bool {
        self.factories.read().contains(key)
    }

    /// 导入链中是否有工厂能构造 `key`
    pub fn provides(&self, key: &DependencyKey) -> bool {
        self.lookup_factory(key).is_some()
    }

    /// 本地注册的键，已排序
    pub fn registered_keys(&self) -> Vec<DependencyKey> {
        self.factories.read().keys()
    }

    // ---- 组合 ----

    /// 查找 `key` 的缓存实例；只有本容器不拥有该键时才查找导入
    pub fn lookup_instance(&self, key: &DependencyKey) -> InstanceLookup {
        if let Some(instance) = self.instances.read().get(key) {
            return InstanceLookup::Found(instance);
        }
        if self.is_registered(key) {
            return InstanceLookup::Pending;
        }

        for import in &self.imports {
            if let InstanceLookup::Found(instance) = import.lookup_instance(key) {
                return InstanceLookup::Found(instance);
            }
        }

        InstanceLookup::Unknown
    }

    pub(crate) fn lookup_factory(&self, key: &DependencyKey) -> Option<Arc<dyn ErasedFactory>> {
        if let Some(factory) = self.factories.read().get(key) {
            return Some(factory);
        }

        self.imports.iter().find_map(|import| import.lookup_factory(key))
    }

    /// 把 `instance` 缓存到拥有 `key` 的容器中
    ///
    /// 返回拥有者最终持有的实例；并发构造先写入时返回先前的实例。
    pub fn store_instance(&self, key: &DependencyKey, instance: Instance) -> Result<Instance> {
        if self.is_registered(key) {
            return Ok(self.instances.write().insert_if_absent(key.clone(), instance));
        }

        for import in &self.imports {
            match import.store_instance(key, Arc::clone(&instance)) {
                Ok(stored) => return Ok(stored),
                Err(ContainerError::NoOwner(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ContainerError::NoOwner(key.clone()))
    }

    // ---- 解析 ----

    /// 解析以类型 `T` 为键的依赖
    pub async fn get<T>(&self) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_by_key(&DependencyKey::of::<T>()).await
    }

    /// 解析注册在 `name` 下的依赖
    pub async fn get_named<T>(&self, name: &str) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = name.dependency_key()?;
        self.get_by_key(&key).await
    }

    pub async fn get_by_key<T>(&self, key: &DependencyKey) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.resolve_key(key).await?;
        downcast_instance::<T>(key, &instance)
    }

    /// 解析 `key`，不指定类型
    pub async fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        self.resolve(key.clone(), Vec::new()).await
    }

    fn resolve(&self, key: DependencyKey, mut chain: Vec<DependencyKey>) -> BoxFuture<'_, Result<Instance>> {
        Box::pin(async move {
            self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

            if let InstanceLookup::Found(instance) = self.lookup_instance(&key) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "dependency cache hit");
                return Ok(instance);
            }

            let factory = self
                .lookup_factory(&key)
                .ok_or_else(|| ContainerError::NotProvided(key.clone()))?;

            if chain.contains(&key) {
                chain.push(key);
                return Err(ContainerError::CircularDependency { chain });
            }
            chain.push(key.clone());

            let parameter_keys = factory.parameter_keys();
            let mut args = Vec::with_capacity(parameter_keys.len());
            for parameter in parameter_keys {
                let instance = self.resolve(parameter.clone(), chain.clone()).await?;
                args.push((parameter, instance));
            }

            debug!(key = %key, "constructing dependency");
            let call = factory.invoke(args)?;
            let constructed = guarded(&key, self.config.timeout, call)
                .await?
                .map_err(|source| ContainerError::FactoryFailed {
                    key: key.clone(),
                    source,
                })?;
            self.stats.constructions.fetch_add(1, Ordering::Relaxed);

            let fresh = Arc::clone(&constructed.instance);
            let instance = self.store_instance(&key, constructed.instance)?;

            // 并发构造先写入时，由它的调用方负责字段注入
            if let (Some(wiring), true) = (constructed.wiring, Arc::ptr_eq(&instance, &fresh)) {
                self.inject_fields(wiring.as_ref(), &chain).await?;
            }

            Ok(instance)
        })
    }

    /// 填充一个值的标记字段
    pub async fn inject(&self, target: &dyn Wired) -> Result<()> {
        self.inject_fields(target, &[]).await
    }

    fn inject_fields<'a>(&'a self, target: &'a dyn Wired, chain: &'a [DependencyKey]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for field in target.fields() {
                match field {
                    Field::Inject(slot) => {
                        if slot.is_filled() {
                            continue;
                        }
                        let key = slot.key()?;
                        let instance = self.resolve(key.clone(), chain.to_vec()).await?;
                        slot.fill(&key, &instance)?;
                        trace!(key = %key, "field injected");
                    }
                    Field::Nested(inner) => self.inject_fields(inner, chain).await?,
                }
            }
            Ok(())
        })
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.stats.total_resolutions.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            constructions: self.stats.constructions.load(Ordering::Relaxed),
            registered_factories: self.factories.read().len(),
            cached_instances: self.instances.read().len(),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("factories", &self.registered_keys())
            .field("imports", &self.imports.len())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish()
    }
}
