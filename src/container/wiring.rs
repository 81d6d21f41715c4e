//! 构造后的字段注入
//!
//! 类型通过实现 [`Wired`]（通常借助 [`wired!`](crate::wired) 宏）并由工厂以
//! [`Autowired`](super::Autowired) 返回来启用字段注入。

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::factory::{downcast_instance, Instance};
use super::key::{DependencyKey, KeySource};
use crate::errors::Result;

/// 字段可以携带的两种标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    /// 解析字段的依赖并赋值
    Inject,
    /// 递归进入字段当前的值
    Nested,
}

/// [`Wired`] 值中的一个标记字段
pub enum Field<'a> {
    Inject(&'a dyn InjectSlot),
    Nested(&'a dyn Wired),
}

impl Field<'_> {
    pub fn tag(&self) -> FieldTag {
        match self {
            Field::Inject(_) => FieldTag::Inject,
            Field::Nested(_) => FieldTag::Nested,
        }
    }
}

/// 构造后由容器填充字段的值
pub trait Wired: Send + Sync {
    /// 按声明顺序列出标记字段，未标记字段不出现
    fn fields(&self) -> Vec<Field<'_>>;
}

/// 注入依赖的一次写入槽
pub trait InjectSlot: Send + Sync {
    fn key(&self) -> Result<DependencyKey>;

    fn is_filled(&self) -> bool;

    fn fill(&self, key: &DependencyKey, instance: &Instance) -> Result<()>;
}

/// 注入依赖的字段类型，未命名时按 `T` 取键
pub struct Inject<T: ?Sized> {
    name: Option<&'static str>,
    cell: OnceLock<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Inject<T> {
    pub const fn new() -> Self {
        Self {
            name: None,
            cell: OnceLock::new(),
        }
    }

    /// 按依赖名称而不是类型解析的槽
    pub const fn named(name: &'static str) -> Self {
        Self {
            name: Some(name),
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    pub fn cloned(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    pub fn is_injected(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> InjectSlot for Inject<T> {
    fn key(&self) -> Result<DependencyKey> {
        match self.name {
            Some(name) => name.dependency_key(),
            None => Ok(DependencyKey::of::<T>()),
        }
    }

    fn is_filled(&self) -> bool {
        self.is_injected()
    }

    fn fill(&self, key: &DependencyKey, instance: &Instance) -> Result<()> {
        let value = downcast_instance::<T>(key, instance)?;
        // 已填充的槽保留第一个值
        let _ = self.cell.set(value);
        Ok(())
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("key", &self.key().ok())
            .field("injected", &self.is_injected())
            .finish()
    }
}

/// 根据 `标记 字段` 列表为结构体实现 [`Wired`]
///
/// ```ignore
/// struct Service {
///     clock: Inject<dyn Clock>,
///     storage: Storage,
///     retries: u32,
/// }
///
/// depi::wired!(Service { inject clock, nested storage });
/// ```
///
/// 除 `inject` 和 `nested` 以外的标记在编译期报错。
#[macro_export]
macro_rules! wired {
    ($ty:ty { $($tag:ident $field:ident),* $(,)? }) => {
        impl $crate::Wired for $ty {
            fn fields(&self) -> ::std::vec::Vec<$crate::Field<'_>> {
                ::std::vec![$($crate::wired!(@field $tag self.$field)),*]
            }
        }
    };
    (@field inject $value:expr) => {
        $crate::Field::Inject(&$value)
    };
    (@field nested $value:expr) => {
        $crate::Field::Nested(&$value)
    };
}
