//! Benchmarks for ring builds and key selection.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use corelib::{Instance, RingBuilder, RingCache, Selector, Snapshot};

fn snapshot(instances: usize) -> Snapshot {
    let list = (0..instances)
        .map(|i| Instance::new(format!("inst-{i}"), "10.0.0.1", 8000 + i as u16, 100 * (i as u32 % 5 + 1)))
        .collect();
    Snapshot::new("bench", 1, list).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let builder = RingBuilder::new();
    let mut group = c.benchmark_group("ring_build");
    for &n in &[3usize, 16, 64] {
        let snap = snapshot(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &snap, |b, snap| {
            b.iter(|| builder.build(snap));
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let keys: Vec<String> = (0..1024).map(|i| format!("user-{i}")).collect();
    let mut group = c.benchmark_group("select");
    group.throughput(Throughput::Elements(keys.len() as u64));
    for &n in &[3usize, 16, 64] {
        let cache = Arc::new(RingCache::default());
        cache.publish(snapshot(n));
        let selector = Selector::new(cache);
        group.bench_with_input(BenchmarkId::from_parameter(n), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(selector.select("bench", key.as_bytes()).unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_select);
criterion_main!(benches);
