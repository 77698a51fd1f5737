//! Trampoline and combinator benchmark suite.
//!
//! Benchmarks:
//! - Synchronous drive loop throughput at various program depths
//! - Asynchronous drive loop throughput, with and without cooperative yields
//! - Fan-out cost of `all` over resolved tasks
//!
//! Run:
//!   cargo bench --bench trampoline

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use deferred::{AsyncProgram, DriveConfig, Program, Task, run_async_with};
use futures_lite::future::block_on;
use std::hint::black_box;

// =============================================================================
// HELPERS
// =============================================================================

fn countdown(n: u64) -> Program<u64> {
    if n == 0 {
        Program::done(0)
    } else {
        Program::suspend(move || countdown(n - 1))
    }
}

fn async_countdown(n: u64) -> AsyncProgram<u64> {
    if n == 0 {
        AsyncProgram::done(0)
    } else {
        AsyncProgram::suspend(move || async_countdown(n - 1))
    }
}

// =============================================================================
// DRIVE LOOP BENCHMARKS
// =============================================================================

fn bench_sync_drive(c: &mut Criterion) {
    let mut group = c.benchmark_group("trampoline/sync_drive");
    for &depth in &[1_000u64, 10_000, 100_000] {
        group.throughput(Throughput::Elements(depth));
        group.bench_with_input(BenchmarkId::new("countdown", depth), &depth, |b, &depth| {
            b.iter(|| black_box(countdown(black_box(depth)).run_sync()));
        });
    }
    group.finish();
}

fn bench_async_drive(c: &mut Criterion) {
    let mut group = c.benchmark_group("trampoline/async_drive");
    let depth = 10_000u64;
    group.throughput(Throughput::Elements(depth));
    for (label, config) in [
        ("yield_default", DriveConfig::default()),
        ("yield_every_64", DriveConfig::default().yield_every(64)),
        ("no_yield", DriveConfig::default().no_yield()),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(block_on(run_async_with(async_countdown(depth), config))));
        });
    }
    group.finish();
}

// =============================================================================
// COMBINATOR BENCHMARKS
// =============================================================================

fn bench_all_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("combinator/all");
    for &width in &[4usize, 64, 1_024] {
        let task = Task::all((0..width).map(Task::resolved));
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("resolved", width), &task, |b, task| {
            b.iter(|| black_box(block_on(task.execute())));
        });
    }
    group.finish();
}

// =============================================================================
// MAIN
// =============================================================================

criterion_group!(benches, bench_sync_drive, bench_async_drive, bench_all_fan_out);

criterion_main!(benches);
