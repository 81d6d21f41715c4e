//! 工厂及其输入输出类型
//!
//! 工厂是任意 `Fn(P1, .., Pn) -> impl Future<Output = R>`，其中每个 `Pi`
//! 实现 [`Parameter`]，`R` 实现 [`FactoryOutput`]。参数和输出类型自带依赖键，
//! 容器无需额外声明即可为工厂注入参数。

use std::any::{type_name, Any};
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::key::DependencyKey;
use super::wiring::Wired;
use crate::errors::{BoxError, ContainerError, Result};

/// 实例存储中缓存的服务
///
/// 擦除后的值总是工厂产出的 `Arc<T>`。
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 从擦除的实例中取回带类型的句柄
pub fn downcast_instance<T>(key: &DependencyKey, instance: &Instance) -> Result<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ContainerError::TypeMismatch {
            key: key.clone(),
            expected: type_name::<T>(),
        })
}

/// 工厂参数，容器在调用前解析
pub trait Parameter: Sized + Send + 'static {
    fn key() -> DependencyKey;

    fn from_instance(key: &DependencyKey, instance: &Instance) -> Result<Self>;
}

impl<T> Parameter for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn key() -> DependencyKey {
        DependencyKey::of::<T>()
    }

    fn from_instance(key: &DependencyKey, instance: &Instance) -> Result<Self> {
        downcast_instance::<T>(key, instance)
    }
}

/// 把依赖名称绑定到该名称下注册的类型
///
/// 通常用 [`named_dependency!`](crate::named_dependency) 声明。
pub trait DependencyName: 'static {
    const NAME: &'static str;
    type Target: ?Sized + Send + Sync + 'static;
}

/// 按名称而不是按类型解析的工厂参数
pub struct Named<N: DependencyName> {
    value: Arc<N::Target>,
    _name: PhantomData<fn() -> N>,
}

impl<N: DependencyName> Named<N> {
    pub fn new(value: Arc<N::Target>) -> Self {
        Self {
            value,
            _name: PhantomData,
        }
    }

    pub fn into_inner(self) -> Arc<N::Target> {
        self.value
    }
}

impl<N: DependencyName> Clone for Named<N> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            _name: PhantomData,
        }
    }
}

impl<N: DependencyName> Deref for Named<N> {
    type Target = N::Target;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<N: DependencyName> Parameter for Named<N> {
    fn key() -> DependencyKey {
        DependencyKey::named(N::NAME)
    }

    fn from_instance(key: &DependencyKey, instance: &Instance) -> Result<Self> {
        Ok(Self {
            value: downcast_instance::<N::Target>(key, instance)?,
            _name: PhantomData,
        })
    }
}

/// 工厂调用的产物，等待写入实例存储
pub struct Constructed {
    pub(crate) instance: Instance,
    pub(crate) wiring: Option<Arc<dyn Wired>>,
}

/// 工厂的返回类型，声明的类型决定工厂可以注册到哪个键
pub trait FactoryOutput: Send + 'static {
    fn output_key() -> DependencyKey;

    fn into_constructed(self) -> std::result::Result<Constructed, BoxError>;
}

impl<T> FactoryOutput for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn output_key() -> DependencyKey {
        DependencyKey::of::<T>()
    }

    fn into_constructed(self) -> std::result::Result<Constructed, BoxError> {
        Ok(Constructed {
            instance: Arc::new(self),
            wiring: None,
        })
    }
}

/// 命名输出按 `Arc<N::Target>` 存储，使用方像普通 `Arc<T>` 一样向下转型
impl<N: DependencyName> FactoryOutput for Named<N> {
    fn output_key() -> DependencyKey {
        DependencyKey::named(N::NAME)
    }

    fn into_constructed(self) -> std::result::Result<Constructed, BoxError> {
        self.value.into_constructed()
    }
}

/// 构造完成后再注入标记字段的工厂输出
pub struct Autowired<T>(Arc<T>);

impl<T: Wired + 'static> Autowired<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T: Wired + 'static> From<Arc<T>> for Autowired<T> {
    fn from(value: Arc<T>) -> Self {
        Self(value)
    }
}

impl<T: Wired + 'static> FactoryOutput for Autowired<T> {
    fn output_key() -> DependencyKey {
        DependencyKey::of::<T>()
    }

    fn into_constructed(self) -> std::result::Result<Constructed, BoxError> {
        let wiring: Arc<dyn Wired> = self.0.clone();
        Ok(Constructed {
            instance: Arc::new(self.0),
            wiring: Some(wiring),
        })
    }
}

impl<O, E> FactoryOutput for std::result::Result<O, E>
where
    O: FactoryOutput,
    E: Into<BoxError> + Send + 'static,
{
    fn output_key() -> DependencyKey {
        O::output_key()
    }

    fn into_constructed(self) -> std::result::Result<Constructed, BoxError> {
        self.map_err(Into::into)?.into_constructed()
    }
}

/// 可以注册到容器的可调用对象
///
/// 为最多八个 [`Parameter`] 参数的异步闭包和函数实现。
pub trait Factory<Args>: Send + Sync + 'static {
    type Output: FactoryOutput;

    fn parameter_keys(&self) -> Vec<DependencyKey>;

    /// 转换已解析的参数并发起调用
    fn invoke(&self, args: Vec<(DependencyKey, Instance)>) -> Result<BoxFuture<'static, Self::Output>>;

    fn output_key(&self) -> DependencyKey {
        <Self::Output as FactoryOutput>::output_key()
    }
}

macro_rules! impl_factory {
    ($($param:ident),*) => {
        impl<F, Fut, R, $($param,)*> Factory<($($param,)*)> for F
        where
            F: Fn($($param),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: FactoryOutput,
            $($param: Parameter,)*
        {
            type Output = R;

            fn parameter_keys(&self) -> Vec<DependencyKey> {
                vec![$(<$param as Parameter>::key()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(
                &self,
                args: Vec<(DependencyKey, Instance)>,
            ) -> Result<BoxFuture<'static, R>> {
                let mut args = args.into_iter();
                $(
                    let $param = match args.next() {
                        Some((key, instance)) => <$param as Parameter>::from_instance(&key, &instance)?,
                        None => return Err(ContainerError::NotProvided(<$param as Parameter>::key())),
                    };
                )*
                Ok((self)($($param),*).boxed())
            }
        }
    };
}

impl_factory!();
impl_factory!(P1);
impl_factory!(P1, P2);
impl_factory!(P1, P2, P3);
impl_factory!(P1, P2, P3, P4);
impl_factory!(P1, P2, P3, P4, P5);
impl_factory!(P1, P2, P3, P4, P5, P6);
impl_factory!(P1, P2, P3, P4, P5, P6, P7);
impl_factory!(P1, P2, P3, P4, P5, P6, P7, P8);

/// 已注册工厂的对象安全视图
pub(crate) trait ErasedFactory: Send + Sync {
    fn output_key(&self) -> DependencyKey;

    fn parameter_keys(&self) -> Vec<DependencyKey>;

    fn invoke(
        &self,
        args: Vec<(DependencyKey, Instance)>,
    ) -> Result<BoxFuture<'static, std::result::Result<Constructed, BoxError>>>;
}

struct FactoryHandle<F, Args> {
    factory: F,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> ErasedFactory for FactoryHandle<F, Args>
where
    F: Factory<Args>,
    Args: 'static,
{
    fn output_key(&self) -> DependencyKey {
        self.factory.output_key()
    }

    fn parameter_keys(&self) -> Vec<DependencyKey> {
        self.factory.parameter_keys()
    }

    fn invoke(
        &self,
        args: Vec<(DependencyKey, Instance)>,
    ) -> Result<BoxFuture<'static, std::result::Result<Constructed, BoxError>>> {
        let call = self.factory.invoke(args)?;
        Ok(call
            .map(<<F as Factory<Args>>::Output as FactoryOutput>::into_constructed)
            .boxed())
    }
}

pub(crate) fn erase<F, Args>(factory: F) -> Arc<dyn ErasedFactory>
where
    F: Factory<Args>,
    Args: 'static,
{
    Arc::new(FactoryHandle {
        factory,
        _args: PhantomData,
    })
}
