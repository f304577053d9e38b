use core::{hint::black_box, time::Duration};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keyflake::{
    AllocationStrategy, BitLayout, GeneratorConfig, SnowflakeGenerator, TimeSource, Unique,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

#[derive(Clone)]
struct FixedMockTime {
    tick: u64,
}

impl TimeSource for FixedMockTime {
    fn current_tick(&self) -> u64 {
        self.tick
    }
}

// Number of IDs generated per benchmark iteration (split across threads for
// the contended groups). One full sequence, so a fixed clock never stalls.
const TOTAL_IDS: usize = 4096;

fn config(strategy: AllocationStrategy, use_clock: bool) -> GeneratorConfig {
    GeneratorConfig::default()
        .with_epoch(Duration::ZERO)
        .with_explicit_identity(1, 1)
        .with_strategy(strategy)
        .with_use_clock(use_clock)
}

fn thread_counts() -> Vec<usize> {
    let mut counts = vec![1, 2, 4, 8, num_cpus::get()];
    counts.sort_unstable();
    counts.dedup();
    counts
}

/// Single-threaded throughput against a fixed clock.
fn bench_mock_sequential(c: &mut Criterion, group_name: &str, strategy: AllocationStrategy) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let generator =
                    SnowflakeGenerator::with_clock(&config(strategy, false), FixedMockTime {
                        tick: 1,
                    })
                    .unwrap();
                let start = Instant::now();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().unwrap());
                }
                elapsed += start.elapsed();
            }
            elapsed
        });
    });

    group.finish();
}

/// One generator shared by several threads, reading the real clock. Threads
/// wait for the next tick whenever a sequence runs out.
fn bench_clock_contended(
    c: &mut Criterion,
    group_name: &str,
    strategy: AllocationStrategy,
    use_clock: bool,
) {
    let mut group = c.benchmark_group(group_name);

    for thread_count in thread_counts() {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{thread_count}"), |b| {
            let generator = Arc::new(SnowflakeGenerator::new(&config(strategy, use_clock)).unwrap());
            b.iter_custom(|iters| {
                let start = Instant::now();

                for _ in 0..iters {
                    let barrier = Arc::new(Barrier::new(thread_count + 1));
                    scope(|s| {
                        for _ in 0..thread_count {
                            let generator = Arc::clone(&generator);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..ids_per_thread {
                                    black_box(generator.next_id().unwrap());
                                }
                            });
                        }
                        barrier.wait();
                    });
                }

                start.elapsed()
            });
        });
    }

    group.finish();
}

fn benchmark_mock_sequential_synchronized(c: &mut Criterion) {
    bench_mock_sequential(c, "mock/sequential/synchronized", AllocationStrategy::Synchronized);
}

fn benchmark_mock_sequential_lock_free(c: &mut Criterion) {
    bench_mock_sequential(c, "mock/sequential/lock_free", AllocationStrategy::LockFree);
}

fn benchmark_mock_sequential_buffered(c: &mut Criterion) {
    bench_mock_sequential(c, "mock/sequential/buffered", AllocationStrategy::buffered());
}

fn benchmark_direct_contended_synchronized(c: &mut Criterion) {
    bench_clock_contended(
        c,
        "direct/contended/synchronized",
        AllocationStrategy::Synchronized,
        false,
    );
}

fn benchmark_direct_contended_lock_free(c: &mut Criterion) {
    bench_clock_contended(c, "direct/contended/lock_free", AllocationStrategy::LockFree, false);
}

fn benchmark_direct_contended_buffered(c: &mut Criterion) {
    bench_clock_contended(c, "direct/contended/buffered", AllocationStrategy::buffered(), false);
}

fn benchmark_cached_contended_synchronized(c: &mut Criterion) {
    bench_clock_contended(
        c,
        "cached/contended/synchronized",
        AllocationStrategy::Synchronized,
        true,
    );
}

fn benchmark_cached_contended_lock_free(c: &mut Criterion) {
    bench_clock_contended(c, "cached/contended/lock_free", AllocationStrategy::LockFree, true);
}

fn benchmark_parse(c: &mut Criterion) {
    let layout = BitLayout::millis();
    let id = layout.encode(1_000_000, 2, 3, 5);
    c.bench_function("parse/to_string", |b| {
        b.iter(|| black_box(Unique::decode(&layout, black_box(id)).to_string()));
    });
}

criterion_group!(
    benches,
    // Fixed clock
    benchmark_mock_sequential_synchronized,
    benchmark_mock_sequential_lock_free,
    benchmark_mock_sequential_buffered,
    // System clock, direct reads
    benchmark_direct_contended_synchronized,
    benchmark_direct_contended_lock_free,
    benchmark_direct_contended_buffered,
    // System clock, cached reads
    benchmark_cached_contended_synchronized,
    benchmark_cached_contended_lock_free,
    // Decoding
    benchmark_parse,
);
criterion_main!(benches);
