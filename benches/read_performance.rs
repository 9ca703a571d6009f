//! Read-path benchmarks for the versioned cache.
//!
//! - Latest-version reads (lock-free) against locked per-version lookups
//! - History listing as the cache grows
//! - Concurrent readers while merges land

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use hotswap_store::core::VersionedCache;
use hotswap_store::error::{Result, StoreError};
use hotswap_store::storage::ConfigRow;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct BenchConfig {
    version: i64,
    name: String,
    limits: Vec<u64>,
}

fn encoded(version: i64) -> ConfigRow {
    let config = BenchConfig {
        version,
        name: format!("bucket_{}", version),
        limits: vec![10, 100, 1000],
    };
    ConfigRow::new(version, serde_json::to_vec(&config).unwrap())
}

fn decode(bytes: &[u8]) -> Result<BenchConfig> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::DeserializationError(e.to_string()))
}

fn filled_cache(versions: i64) -> VersionedCache<BenchConfig> {
    let cache = VersionedCache::new();
    cache.merge((0..versions).map(encoded).collect(), decode);
    cache
}

/// Latest config vs. a specific version
fn benchmark_read_latency(c: &mut Criterion) {
    let cache = filled_cache(100);

    let mut group = c.benchmark_group("read_latency");
    group.bench_function("latest", |b| {
        b.iter(|| {
            let cfg = cache.latest().unwrap();
            black_box(&cfg.version);
        });
    });
    group.bench_function("by_version", |b| {
        b.iter(|| {
            let cfg = cache.get(black_box(42)).unwrap();
            black_box(&cfg.version);
        });
    });
    group.finish();
}

/// History listing cost by cache size
fn benchmark_list_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_all");

    for size in [10, 100, 1000] {
        let cache = filled_cache(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &cache, |b, cache| {
            b.iter(|| black_box(cache.list_all()));
        });
    }

    group.finish();
}

/// Concurrent latest reads with varying thread counts
fn benchmark_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_reads");

    for num_threads in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let cache = Arc::new(filled_cache(100));
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|_| {
                            let cache = Arc::clone(&cache);
                            let barrier = Arc::clone(&barrier);
                            thread::spawn(move || {
                                barrier.wait();
                                let start = std::time::Instant::now();
                                for _ in 0..iters {
                                    let cfg = cache.latest().unwrap();
                                    black_box(&cfg.version);
                                }
                                start.elapsed()
                            })
                        })
                        .collect();

                    barrier.wait();

                    let total: Duration = handles.into_iter().map(|h| h.join().unwrap()).sum();
                    total / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

/// Merges landing while 8 readers spin
fn benchmark_merge_under_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_under_load");
    group.sample_size(10);

    group.bench_function("merge_with_8_readers", |b| {
        b.iter_custom(|iters| {
            let cache = Arc::new(filled_cache(1));
            let running = Arc::new(AtomicBool::new(true));
            let reads = Arc::new(AtomicUsize::new(0));

            let readers: Vec<_> = (0..8)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let running = Arc::clone(&running);
                    let reads = Arc::clone(&reads);
                    thread::spawn(move || {
                        while running.load(Ordering::Relaxed) {
                            black_box(cache.latest_version());
                            black_box(cache.latest().ok());
                            reads.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            let start = std::time::Instant::now();
            for i in 0..iters {
                cache.merge(vec![encoded(i as i64 + 1)], decode);
            }
            let duration = start.elapsed();

            running.store(false, Ordering::Relaxed);
            for reader in readers {
                reader.join().unwrap();
            }

            duration
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_read_latency,
    benchmark_list_all,
    benchmark_concurrent_reads,
    benchmark_merge_under_load,
);

criterion_main!(benches);
