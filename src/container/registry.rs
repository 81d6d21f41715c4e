use std::collections::HashMap;
use std::sync::Arc;

use super::factory::{ErasedFactory, Instance};
use super::key::DependencyKey;
use crate::errors::{ContainerError, Result};

/// 单个容器拥有的工厂
#[derive(Default)]
pub(crate) struct FactoryRegistry {
    factories: HashMap<DependencyKey, Arc<dyn ErasedFactory>>,
}

impl FactoryRegistry {
    /// 添加工厂；键与输出类型不符或重复时拒绝
    pub(crate) fn insert(&mut self, key: DependencyKey, factory: Arc<dyn ErasedFactory>) -> Result<()> {
        let actual = factory.output_key();
        if actual != key {
            return Err(ContainerError::KeyMismatch {
                declared: key,
                actual,
            });
        }

        if self.factories.contains_key(&key) {
            return Err(ContainerError::DuplicateKey(key));
        }

        self.factories.insert(key, factory);
        Ok(())
    }

    pub(crate) fn get(&self, key: &DependencyKey) -> Option<Arc<dyn ErasedFactory>> {
        self.factories.get(key).cloned()
    }

    pub(crate) fn contains(&self, key: &DependencyKey) -> bool {
        self.factories.contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<DependencyKey> {
        let mut keys: Vec<DependencyKey> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.factories.len()
    }
}

/// 容器所拥有键的缓存实例
#[derive(Default)]
pub(crate) struct InstanceStore {
    instances: HashMap<DependencyKey, Instance>,
}

impl InstanceStore {
    pub(crate) fn get(&self, key: &DependencyKey) -> Option<Instance> {
        self.instances.get(key).cloned()
    }

    /// 仅在尚无实例时写入，返回存储中最终保留的实例
    pub(crate) fn insert_if_absent(&mut self, key: DependencyKey, instance: Instance) -> Instance {
        Arc::clone(self.instances.entry(key).or_insert(instance))
    }

    pub(crate) fn len(&self) -> usize {
        self.instances.len()
    }
}
