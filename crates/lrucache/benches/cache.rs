use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lrucache::{LruCache, SharedLruCache};

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_hit_1000", |b| {
        let mut cache = LruCache::new(1000).unwrap();
        for i in 0..1000u64 {
            cache.put(i, vec![b'x'; 64]);
        }

        let mut counter = 0u64;
        b.iter(|| {
            black_box(cache.get(&(counter % 1000)));
            counter += 1;
        });
    });

    group.finish();
}

fn bench_mixed_50_50(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("50_get_50_put", |b| {
        let mut cache = LruCache::new(1000).unwrap();
        for i in 0..1000u64 {
            cache.put(i, i);
        }

        let mut counter = 0u64;
        b.iter(|| {
            if counter.is_multiple_of(2) {
                black_box(cache.get(&(counter % 1500)));
            } else {
                cache.put(counter % 1500, counter);
            }
            counter += 1;
        });
    });

    group.finish();
}

fn bench_evicting_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("evicting_put");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_always_evicts", |b| {
        let mut cache = LruCache::new(10).unwrap(); // Small cache

        let mut counter = 0u64;
        b.iter(|| {
            // Every key is new, so every put past warm-up evicts
            black_box(cache.push(counter, counter));
            counter += 1;
        });
    });

    group.finish();
}

fn bench_shared_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("locked_get_hit", |b| {
        let cache = SharedLruCache::new(1000).unwrap();
        for i in 0..1000u64 {
            cache.put(i, i);
        }

        let mut counter = 0u64;
        b.iter(|| {
            black_box(cache.get(&(counter % 1000)));
            counter += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_get_hit,
    bench_mixed_50_50,
    bench_evicting_put,
    bench_shared_get
);
criterion_main!(benches);
