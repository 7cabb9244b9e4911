//! Performance benchmarks for config-watcher.
//!
//! - Read latency of `get()`
//! - Reads scale with concurrent readers
//! - Reads keep flowing while `save()` rewrites the file
//! - Cost of a save (encode, write, reconcile)

use config_watcher::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct BenchConfig {
    value: i32,
    name: String,
    flag: bool,
    items: Vec<String>,
}

impl BenchConfig {
    fn default() -> Self {
        Self {
            value: 42,
            name: "benchmark".to_string(),
            flag: true,
            items: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }
}

/// A watcher without a file monitor, so only the reconciliation path is measured.
fn bench_watcher(dir: &TempDir) -> ConfigWatcher<BenchConfig> {
    ConfigWatcher::new(BenchConfig::default(), dir.path().join("bench.json"))
}

/// Benchmark single-threaded read latency
fn benchmark_read_latency(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let watcher = bench_watcher(&dir);

    let mut group = c.benchmark_group("read_latency");
    group.bench_function("single_read", |b| {
        b.iter(|| {
            let cfg = watcher.get();
            black_box(&cfg.value);
        });
    });
    group.finish();
}

/// Benchmark concurrent reads with varying thread counts
fn benchmark_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_reads");

    for num_threads in [1, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let dir = TempDir::new().unwrap();
                let watcher = Arc::new(bench_watcher(&dir));
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let mut handles = vec![];

                    for _ in 0..num_threads {
                        let watcher = Arc::clone(&watcher);
                        let barrier = Arc::clone(&barrier);

                        handles.push(thread::spawn(move || {
                            barrier.wait();

                            let start = std::time::Instant::now();
                            for _ in 0..iters {
                                let data = watcher.get();
                                black_box(&data.value);
                            }
                            start.elapsed()
                        }));
                    }

                    barrier.wait();

                    let total_duration: Duration =
                        handles.into_iter().map(|h| h.join().unwrap()).sum();
                    total_duration / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

/// Benchmark saves while readers hammer `get()`
fn benchmark_save_under_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_under_load");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("save_with_8_readers", |b| {
        b.iter_custom(|iters| {
            let dir = TempDir::new().unwrap();
            let watcher = Arc::new(bench_watcher(&dir));
            let keep_running = Arc::new(AtomicBool::new(true));
            let reads_completed = Arc::new(AtomicUsize::new(0));

            let readers: Vec<_> = (0..8)
                .map(|_| {
                    let watcher = Arc::clone(&watcher);
                    let running = Arc::clone(&keep_running);
                    let counter = Arc::clone(&reads_completed);
                    thread::spawn(move || {
                        while running.load(Ordering::Relaxed) {
                            let data = watcher.get();
                            black_box(&data.value);
                            counter.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            let start = std::time::Instant::now();
            for i in 0..iters {
                watcher
                    .save(BenchConfig {
                        value: i as i32,
                        name: format!("save_{}", i),
                        flag: i % 2 == 0,
                        items: vec!["x".to_string()],
                    })
                    .unwrap();
            }
            let duration = start.elapsed();

            keep_running.store(false, Ordering::Relaxed);
            for reader in readers {
                reader.join().unwrap();
            }

            println!(
                "  Completed {} reads during {} saves",
                reads_completed.load(Ordering::Relaxed),
                iters
            );
            duration
        });
    });

    group.finish();
}

/// Benchmark a single save round trip
fn benchmark_save(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let watcher = bench_watcher(&dir);

    let mut group = c.benchmark_group("save");
    group.bench_function("save_config", |b| {
        let mut counter = 0;
        b.iter(|| {
            counter += 1;
            watcher
                .save(BenchConfig {
                    value: counter,
                    name: format!("save_{}", counter),
                    flag: counter % 2 == 0,
                    items: vec![format!("item_{}", counter)],
                })
                .unwrap();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_read_latency,
    benchmark_concurrent_reads,
    benchmark_save_under_load,
    benchmark_save,
);

criterion_main!(benches);
