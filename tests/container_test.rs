//! 单个容器内注册与解析的集成测试

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use depi::{Abstraction, Container, ContainerError, DependencyKey, DependencyName, Named};

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct FixedClock(u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Database {
    url: String,
}

struct Repository {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

depi::named_dependency!(DatabaseUrl: String = "database-url");

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    container
        .provide_by_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Arc::new(Database {
                    url: "postgres://localhost".to_string(),
                })
            }
        })
        .unwrap();

    let first = container.get::<Database>().await.unwrap();
    let second = container.get::<Database>().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.url, "postgres://localhost");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_factory_arguments_are_resolved_depth_first() {
    let container = Container::new();
    container
        .provide_by_factory(|url: Named<DatabaseUrl>| async move {
            Arc::new(Database {
                url: url.into_inner().to_string(),
            })
        })
        .unwrap();
    container
        .provide_by_name(DatabaseUrl::NAME, || async {
            Named::<DatabaseUrl>::new(Arc::new("sqlite::memory:".to_string()))
        })
        .unwrap();
    container
        .provide_by_abstraction(Abstraction::<dyn Clock>::new(), || async {
            Arc::new(FixedClock(1_700_000_000)) as Arc<dyn Clock>
        })
        .unwrap();
    container
        .provide_by_factory(|db: Arc<Database>, clock: Arc<dyn Clock>| async move {
            Arc::new(Repository { db, clock })
        })
        .unwrap();

    let repo = container.get::<Repository>().await.unwrap();
    assert_eq!(repo.db.url, "sqlite::memory:");
    assert_eq!(repo.clock.now(), 1_700_000_000);

    // 依赖在解析过程中已被缓存
    let db = container.get::<Database>().await.unwrap();
    assert!(Arc::ptr_eq(&db, &repo.db));
    assert_eq!(container.stats().constructions, 4);
}

#[tokio::test]
async fn test_name_marker_and_factory_share_one_key() {
    let type_key = DependencyKey::of::<dyn Clock>();

    let by_marker = Container::new();
    by_marker
        .provide_by_abstraction(Abstraction::<dyn Clock>::new(), || async {
            Arc::new(FixedClock(5)) as Arc<dyn Clock>
        })
        .unwrap();
    assert_eq!(by_marker.registered_keys(), vec![type_key.clone()]);

    let by_factory = Container::new();
    by_factory
        .provide_by_factory(|| async { Arc::new(FixedClock(5)) as Arc<dyn Clock> })
        .unwrap();
    assert_eq!(by_factory.registered_keys(), vec![type_key.clone()]);

    let by_name = Container::new();
    by_name
        .provide_by_name(type_key.as_str(), || async {
            Arc::new(FixedClock(5)) as Arc<dyn Clock>
        })
        .unwrap();
    assert_eq!(by_name.registered_keys(), vec![type_key.clone()]);

    // 所有访问方式得到同一个单例
    let via_type = by_marker.get::<dyn Clock>().await.unwrap();
    let via_name = by_marker.get_named::<dyn Clock>(type_key.as_str()).await.unwrap();
    let via_key = by_marker.get_by_key::<dyn Clock>(&type_key).await.unwrap();
    assert!(Arc::ptr_eq(&via_type, &via_name));
    assert!(Arc::ptr_eq(&via_type, &via_key));
}

#[tokio::test]
async fn test_bounded_output_under_plain_abstraction_is_rejected() {
    let container = Container::new();
    let err = container
        .provide_by_abstraction(Abstraction::<dyn Clock>::new(), || async {
            Arc::new(FixedClock(7)) as Arc<dyn Clock + Send + Sync>
        })
        .unwrap_err();

    match err {
        ContainerError::KeyMismatch { declared, actual } => {
            assert_eq!(declared, DependencyKey::of::<dyn Clock>());
            assert_eq!(actual, DependencyKey::of::<dyn Clock + Send + Sync>());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(container.registered_keys().is_empty());
}

#[tokio::test]
async fn test_bounded_abstraction_resolves_by_its_own_type() {
    let container = Container::new();
    container
        .provide_by_abstraction(Abstraction::<dyn Clock + Send + Sync>::new(), || async {
            Arc::new(FixedClock(8)) as Arc<dyn Clock + Send + Sync>
        })
        .unwrap();
    container
        .provide_by_factory(|clock: Arc<dyn Clock + Send + Sync>| async move { Arc::new(clock.now()) })
        .unwrap();

    let clock = container.get::<dyn Clock + Send + Sync>().await.unwrap();
    assert_eq!(clock.now(), 8);
    assert_eq!(*container.get::<u64>().await.unwrap(), 8);

    // 不带约束的写法是另一个依赖
    let err = container.get::<dyn Clock>().await.err().unwrap();
    assert!(matches!(err, ContainerError::NotProvided(ref key) if *key == DependencyKey::of::<dyn Clock>()));
}

#[tokio::test]
async fn test_duplicate_key_is_rejected_before_resolution() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    container
        .provide_by_abstraction(Abstraction::<dyn Clock>::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Arc::new(FixedClock(1)) as Arc<dyn Clock> }
        })
        .unwrap();

    let err = container
        .provide_by_factory(|| async { Arc::new(FixedClock(2)) as Arc<dyn Clock> })
        .unwrap_err();

    assert!(matches!(err, ContainerError::DuplicateKey(ref key) if *key == DependencyKey::of::<dyn Clock>()));
    assert!(err.is_configuration_error());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // 仍然使用第一次注册
    assert_eq!(container.get::<dyn Clock>().await.unwrap().now(), 1);
}

#[tokio::test]
async fn test_registration_is_closed_after_run() {
    let container = Container::new();
    container
        .provide_by_factory(|| async { Arc::new(FixedClock(9)) })
        .unwrap();
    container.run().unwrap();
    assert!(container.is_running());

    let err = container
        .provide_by_name(DatabaseUrl::NAME, || async {
            Named::<DatabaseUrl>::new(Arc::new(String::new()))
        })
        .unwrap_err();

    assert!(matches!(err, ContainerError::RegistrationClosed(_)));
    assert_eq!(container.registered_keys(), vec![DependencyKey::of::<FixedClock>()]);

    // 仍然可以解析
    assert_eq!(container.get::<FixedClock>().await.unwrap().now(), 9);
}

#[tokio::test]
async fn test_name_mismatching_return_type_is_rejected() {
    let container = Container::new();
    let err = container
        .provide_by_name("database", || async {
            Arc::new(Database { url: String::new() })
        })
        .unwrap_err();

    match err {
        ContainerError::KeyMismatch { declared, actual } => {
            assert_eq!(declared.as_str(), "database");
            assert_eq!(actual, DependencyKey::of::<Database>());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(container.registered_keys().is_empty());
}

#[tokio::test]
async fn test_missing_dependency_is_reported() {
    let container = Container::new();
    container
        .provide_by_factory(|db: Arc<Database>| async move { Arc::new(db.url.len()) })
        .unwrap();

    let err = container.get::<usize>().await.unwrap_err();
    assert!(matches!(err, ContainerError::NotProvided(ref key) if *key == DependencyKey::of::<Database>()));
    assert_eq!(
        err.to_string(),
        format!("\"{}\" dependency not provided", DependencyKey::of::<Database>())
    );
}

#[tokio::test]
async fn test_factory_error_is_wrapped_and_not_memoized() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    container
        .provide_by_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<Arc<Database>, _>(anyhow::anyhow!("connection refused")) }
        })
        .unwrap();

    let err = container.get::<Database>().await.unwrap_err();
    assert!(matches!(err, ContainerError::FactoryFailed { .. }));
    assert!(err.to_string().contains("connection refused"));
    assert!(std::error::Error::source(&err).is_some());

    assert!(container.get::<Database>().await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_wrong_requested_type_is_reported() {
    let container = Container::new();
    container
        .provide_by_factory(|| async { Arc::new(FixedClock(3)) })
        .unwrap();

    let err = container
        .get_by_key::<Database>(&DependencyKey::of::<FixedClock>())
        .await
        .unwrap_err();
    assert!(matches!(err, ContainerError::TypeMismatch { .. }));
}

#[derive(Debug)]
struct Left(#[allow(dead_code)] Arc<Right>);
#[derive(Debug)]
struct Right(#[allow(dead_code)] Arc<Left>);

#[tokio::test]
async fn test_circular_dependency_fails_fast() {
    let container = Container::new();
    container
        .provide_by_factory(|right: Arc<Right>| async move { Arc::new(Left(right)) })
        .unwrap();
    container
        .provide_by_factory(|left: Arc<Left>| async move { Arc::new(Right(left)) })
        .unwrap();

    let err = container.get::<Left>().await.unwrap_err();
    match err {
        ContainerError::CircularDependency { chain } => {
            assert_eq!(
                chain,
                vec![
                    DependencyKey::of::<Left>(),
                    DependencyKey::of::<Right>(),
                    DependencyKey::of::<Left>(),
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(container.stats().constructions, 0);
}

#[tokio::test]
async fn test_resolve_macro() {
    let container = Container::new();
    container
        .provide_by_name(DatabaseUrl::NAME, || async {
            Named::<DatabaseUrl>::new(Arc::new("mysql://db".to_string()))
        })
        .unwrap();

    let url = depi::resolve!(container, String, DatabaseUrl::NAME).unwrap();
    assert_eq!(url.as_str(), "mysql://db");
}

#[test]
fn test_resolution_from_sync_code() {
    let container = Container::new();
    container
        .provide_by_factory(|| async { Arc::new(FixedClock(11)) })
        .unwrap();

    let clock = tokio_test::block_on(container.get::<FixedClock>()).unwrap();
    assert_eq!(clock.now(), 11);
}

#[tokio::test]
async fn test_concurrent_first_resolution_yields_one_instance() {
    let container = Arc::new(Container::new());
    container
        .provide_by_factory(|| async {
            tokio::task::yield_now().await;
            Arc::new(Database {
                url: "shared".to_string(),
            })
        })
        .unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move { container.get::<Database>().await.unwrap() })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let first = results[0].as_ref().unwrap().clone();
    for result in results {
        assert!(Arc::ptr_eq(&first, &result.unwrap()));
    }
}
