//! 依赖注入容器的性能基准测试

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use depi::{Abstraction, Container};
use futures_util::future;
use tokio::runtime::Runtime;

struct SimpleService {
    value: i32,
}

trait Greeter: Send + Sync {
    fn greet(&self) -> usize;
}

struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn greet(&self) -> usize {
        "hello".len()
    }
}

struct ComplexService {
    id: u64,
    simple: Arc<SimpleService>,
    greeter: Arc<dyn Greeter>,
}

fn populated_container() -> Container {
    Container::builder()
        .provide_by_factory(|| async { Arc::new(SimpleService { value: 7 }) })
        .provide_by_abstraction(Abstraction::<dyn Greeter>::new(), || async {
            Arc::new(EnglishGreeter) as Arc<dyn Greeter>
        })
        .provide_by_factory(|simple: Arc<SimpleService>, greeter: Arc<dyn Greeter>| async move {
            Arc::new(ComplexService {
                id: 12345,
                simple,
                greeter,
            })
        })
        .build()
        .unwrap()
}

/// 基准测试：首次构造之后的缓存解析
fn bench_cached_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = populated_container();
    runtime.block_on(container.get::<ComplexService>()).unwrap();

    c.bench_function("cached_resolution", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let service = container.get::<ComplexService>().await.unwrap();
                black_box(service.id + service.simple.value as u64 + service.greeter.greet() as u64)
            })
        });
    });
}

/// 基准测试：包含整个依赖图工厂调用的首次解析
fn bench_cold_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    c.bench_function("cold_resolution", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let container = populated_container();
                black_box(container.get::<ComplexService>().await.unwrap().id)
            })
        });
    });
}

/// 基准测试：沿导入链查找拥有者
fn bench_import_chain_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("import_chain_resolution");

    for depth in [1usize, 4, 16].iter() {
        let mut leaf = Arc::new(populated_container());
        for _ in 0..*depth {
            leaf = Arc::new(Container::builder().import(leaf).build().unwrap());
        }
        runtime.block_on(leaf.get::<ComplexService>()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &leaf, |b, leaf| {
            b.iter(|| runtime.block_on(async { black_box(leaf.get::<SimpleService>().await.unwrap().value) }));
        });
    }

    group.finish();
}

/// 基准测试：多任务并发解析
fn bench_concurrent_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = Arc::new(populated_container());
    let mut group = c.benchmark_group("concurrent_resolution");

    for tasks in [10usize, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(tasks), tasks, |b, &tasks| {
            b.iter(|| {
                runtime.block_on(async {
                    let lookups = (0..tasks).map(|_| {
                        let container = container.clone();
                        async move { container.get::<ComplexService>().await.unwrap().id }
                    });
                    black_box(future::join_all(lookups).await)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cached_resolution,
    bench_cold_resolution,
    bench_import_chain_resolution,
    bench_concurrent_resolution
);
criterion_main!(benches);
