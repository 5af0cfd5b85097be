//! Benchmarks for tile URL generation, store writes and full downloads.
//!
//! Run with: `cargo bench --package offmap-bench`

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use offmap_bench::{BenchmarkConfig, run_download};
use offmap_lib::{
    Endpoints, GeoBounds, ImageQuality, MapId, StoreDirectory, StoreIdentity, TileUrlGenerator,
    ZoomRange,
};
use tempfile::TempDir;

fn url_generation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_generation");
    let map_id = MapId::from("bench.map");
    let city = GeoBounds::from_center_span(48.85, 2.35, 0.5, 0.5).unwrap();

    for max_zoom in [10u8, 13, 15] {
        let zoom = ZoomRange::new(0, max_zoom).unwrap();
        let generator = TileUrlGenerator::new(Endpoints::default(), &city, zoom);
        group.throughput(Throughput::Elements(generator.count()));

        group.bench_with_input(BenchmarkId::new("url_at", max_zoom), &generator, |b, generator| {
            b.iter(|| {
                (0..generator.count())
                    .filter_map(|i| generator.url_at(&map_id, ImageQuality::Full, i))
                    .map(|url| url.len())
                    .sum::<usize>()
            });
        });
    }

    group.bench_function("count_world_z18", |b| {
        let zoom = ZoomRange::new(0, 18).unwrap();
        b.iter(|| TileUrlGenerator::new(Endpoints::default(), black_box(&GeoBounds::world()), zoom).count());
    });

    group.finish();
}

fn store_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let temp_dir = TempDir::new().unwrap();
    let directory = StoreDirectory::new(temp_dir.path()).unwrap();
    let identity = StoreIdentity::new(MapId::from("bench.map"), ImageQuality::Full, false, false);
    let store = directory.create_store(&identity).unwrap();

    for size in [1024usize, 16 * 1024, 64 * 1024] {
        let payload = vec![0x5a; size];
        let next = AtomicU64::new(0);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("put", size), &payload, |b, payload| {
            b.iter(|| {
                let n = next.fetch_add(1, Ordering::Relaxed);
                store
                    .put(&format!("http://bench.invalid/{size}/{n}"), payload, 200)
                    .unwrap();
            });
        });
    }

    group.throughput(Throughput::Elements(1));
    group.bench_function("contains", |b| {
        b.iter(|| store.contains(black_box("http://bench.invalid/1024/0")).unwrap());
    });

    group.finish();
}

fn download_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("download");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    for concurrency in [1usize, 8, 32] {
        let config = BenchmarkConfig {
            concurrency,
            ..BenchmarkConfig::default()
        };
        let tiles = TileUrlGenerator::new(Endpoints::default(), &config.bounds, config.zoom).count();
        group.throughput(Throughput::Elements(tiles));

        group.bench_with_input(BenchmarkId::new("workers", concurrency), &config, |b, config| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let temp_dir = TempDir::new().unwrap();
                    let result = runtime.block_on(run_download(config, temp_dir.path()));
                    assert!(result.success, "{:?}", result.error);
                    total += result.duration;
                }
                total
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    url_generation_benchmark,
    store_benchmark,
    download_benchmark
);
criterion_main!(benches);
