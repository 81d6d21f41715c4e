//! 依赖键及其来源
//!
//! 键要么是显式名称，要么是类型的规范路径。名称原样使用；类型路径取自
//! [`std::any::type_name`]，只去掉开头的 `dyn `，因此 `dyn Clock` 与
//! `Abstraction<dyn Clock>` 得到同一个键。
//!
//! 附加约束保留在键里：`dyn Clock + Send + Sync` 与 `dyn Clock` 是两个不同
//! 的类型，存储的 `Arc` 只能按注册时的确切类型取回，所以它们也是两个键。

use std::any::type_name;
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::{ContainerError, Result};

/// 依赖的规范标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey(Arc<str>);

impl DependencyKey {
    /// 显式命名的依赖
    pub fn named(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// 类型 `T` 的键
    ///
    /// 这里不剥离指针层；持有 `Arc<T>` 的一方按 `T` 取键
    /// （见 [`crate::container::Parameter`]）。
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Arc::from(canonical_type_path(type_name::<T>())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DependencyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DependencyKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for DependencyKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// 去掉开头的 `dyn `，其余（包括 `+ Send` 等约束）原样保留。
fn canonical_type_path(raw: &str) -> String {
    raw.strip_prefix("dyn ").unwrap_or(raw).to_string()
}

/// 可以推导出依赖键的来源
pub trait KeySource {
    fn dependency_key(&self) -> Result<DependencyKey>;
}

impl KeySource for str {
    fn dependency_key(&self) -> Result<DependencyKey> {
        if self.trim().is_empty() {
            return Err(ContainerError::MalformedKeySource(
                "dependency name is empty".to_string(),
            ));
        }
        Ok(DependencyKey::named(self))
    }
}

impl KeySource for &str {
    fn dependency_key(&self) -> Result<DependencyKey> {
        (**self).dependency_key()
    }
}

impl KeySource for String {
    fn dependency_key(&self) -> Result<DependencyKey> {
        self.as_str().dependency_key()
    }
}

impl KeySource for DependencyKey {
    fn dependency_key(&self) -> Result<DependencyKey> {
        self.as_str().dependency_key()
    }
}

/// 按抽象（通常是 trait 对象）注册服务时使用的标记：
/// `Abstraction::<dyn Clock>::new()`
pub struct Abstraction<T: ?Sized>(PhantomData<fn() -> Arc<T>>);

impl<T: ?Sized + 'static> Abstraction<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized + 'static> Default for Abstraction<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Abstraction<T> {
    fn clone(&self) -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized> Copy for Abstraction<T> {}

impl<T: ?Sized + 'static> fmt::Debug for Abstraction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Abstraction<{}>", DependencyKey::of::<T>())
    }
}

impl<T: ?Sized + 'static> KeySource for Abstraction<T> {
    fn dependency_key(&self) -> Result<DependencyKey> {
        Ok(DependencyKey::of::<T>())
    }
}
