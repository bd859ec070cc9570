//! 作用域解析性能基准测试
//!
//! 覆盖作用域创建/关闭、缓存命中解析和链接作用域回退三条路径。

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use di_core::{BeanDefinition, Container, Scope};

struct Engine;

struct Dashboard {
    _engine: Arc<Engine>,
}

fn container() -> Container {
    Container::builder()
        .definition(BeanDefinition::singleton(|_, _| Ok(Engine)))
        .definition(BeanDefinition::scoped("Car", |scope, _| {
            Ok(Dashboard {
                _engine: scope.get::<Engine>()?,
            })
        }))
        .build()
        .expect("Failed to build container")
}

fn bench_scope_lifecycle(c: &mut Criterion) {
    let container = container();
    let mut next = 0u64;

    c.bench_function("scope_create_resolve_close", |b| {
        b.iter(|| {
            next += 1;
            let scope = container.create_scope(format!("car-{next}"), "Car").unwrap();
            black_box(scope.get::<Dashboard>().unwrap());
            scope.close().unwrap();
        });
    });
}

fn bench_cached_resolution(c: &mut Criterion) {
    let container = container();
    let scope = container.create_scope("car", "Car").unwrap();
    scope.get::<Dashboard>().unwrap();

    c.bench_function("scoped_cache_hit", |b| {
        b.iter(|| black_box(scope.get::<Dashboard>().unwrap()));
    });
    c.bench_function("root_singleton_via_link", |b| {
        b.iter(|| black_box(scope.get::<Engine>().unwrap()));
    });
}

fn bench_linked_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("linked_scope_depth");
    for depth in [1usize, 4, 16] {
        let container = container();
        let chain: Vec<Arc<Scope>> = (0..depth)
            .map(|i| container.create_scope(format!("s{i}"), format!("Level{i}")).unwrap())
            .collect();
        for pair in chain.windows(2) {
            pair[1].link_to(&pair[0]).unwrap();
        }
        let car = container.create_scope("car", "Car").unwrap();
        car.get::<Dashboard>().unwrap();
        chain[0].link_to(&car).unwrap();
        let leaf = Arc::clone(&chain[depth - 1]);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &leaf, |b, leaf| {
            b.iter(|| black_box(leaf.get::<Dashboard>().unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scope_lifecycle, bench_cached_resolution, bench_linked_depth);
criterion_main!(benches);
