//! Performance benchmarks for the injector

use std::rc::Rc;

use arbor_di::{deps, Declaration, Identifier, Injector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Linear chain `link0 <- link1 <- ... <- link{len-1}`
fn chain(len: usize) -> (Injector, Identifier<u32>) {
    let ids: Vec<Identifier<u32>> = (0..len).map(|i| Identifier::new(format!("link{i}"))).collect();
    let injector = Injector::new();
    injector
        .add(Declaration::value(&ids[0], Rc::new(0)))
        .expect("register chain root");
    for pair in ids.windows(2) {
        injector
            .add(
                Declaration::factory(&pair[1], |args| Ok(Rc::new(*args.get::<u32>(0)? + 1)))
                    .with_deps(deps![pair[0]]),
            )
            .expect("register chain link");
    }
    let top = ids[len - 1].clone();
    (injector, top)
}

fn benchmark_registration(c: &mut Criterion) {
    c.bench_function("register_value", |b| {
        let id: Identifier<u64> = Identifier::new("port");
        b.iter(|| {
            let injector = Injector::new();
            let result = injector.add(Declaration::value(&id, Rc::new(black_box(5432))));
            black_box(result)
        })
    });

    c.bench_function("register_factory", |b| {
        let id: Identifier<String> = Identifier::new("url");
        b.iter(|| {
            let injector = Injector::new();
            let result = injector.add(Declaration::factory(&id, |_| {
                Ok(Rc::new(black_box("db://local").to_string()))
            }));
            black_box(result)
        })
    });
}

fn benchmark_resolution(c: &mut Criterion) {
    c.bench_function("resolve_cached", |b| {
        let id: Identifier<String> = Identifier::new("url");
        let injector = Injector::with_bindings([Declaration::factory(&id, |_| {
            Ok(Rc::new("db://local".to_string()))
        })])
        .expect("build injector");
        injector.get(&id).expect("warm cache");

        b.iter(|| black_box(injector.get(black_box(&id)).expect("resolve")))
    });

    let mut group = c.benchmark_group("resolve_chain_cold");
    for len in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let (injector, top) = chain(len);
                black_box(injector.get(&top).expect("resolve chain"))
            })
        });
    }
    group.finish();
}

fn benchmark_hierarchy(c: &mut Criterion) {
    c.bench_function("resolve_through_ancestors", |b| {
        let id: Identifier<u64> = Identifier::new("port");
        let root = Injector::with_bindings([Declaration::value(&id, Rc::new(5432))])
            .expect("build root");
        let mut leaf = root.clone();
        for _ in 0..8 {
            leaf = leaf.create_child([]).expect("create child");
        }

        b.iter(|| black_box(leaf.get(&id).expect("resolve from leaf")))
    });

    c.bench_function("create_child", |b| {
        let root = Injector::new();
        b.iter(|| black_box(root.create_child([]).expect("create child")))
    });
}

criterion_group!(
    benches,
    benchmark_registration,
    benchmark_resolution,
    benchmark_hierarchy
);
criterion_main!(benches);
