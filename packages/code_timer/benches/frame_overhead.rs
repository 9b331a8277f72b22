//! Benchmarks to measure the compute overhead of `code_timer` logic itself.
//!
//! These benchmarks time empty intervals - intervals that do not do any actual work but
//! still incur the cost of reading the clock and notifying collectors.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use code_timer::{PeakMemory, Registry, Timestamp, code_point};
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("code_timer_overhead");

    group.bench_function("timestamp_now", |b| {
        b.iter(|| black_box(Timestamp::now()));
    });

    let registry = Registry::new();

    let empty = registry.frame(code_point!("empty"));
    group.bench_function("start_stop_empty", |b| {
        b.iter(|| {
            empty.start();
            black_box(empty.stop(false));
        });
    });

    let guarded = code_point!("guarded");
    group.bench_function("enter_guard_empty", |b| {
        b.iter(|| {
            let _interval = registry.enter(guarded);
            black_box(());
        });
    });

    // Only the outermost entry reads the clock.
    let nested = registry.frame(code_point!("nested"));
    nested.start();
    group.bench_function("start_stop_nested", |b| {
        b.iter(|| {
            nested.start();
            black_box(nested.stop(false));
        });
    });
    nested.stop(false);

    let paused = registry.frame(code_point!("paused"));
    paused.start();
    group.bench_function("pause_resume", |b| {
        b.iter(|| {
            paused.pause();
            paused.resume();
        });
    });
    paused.stop(false);

    let memory_registry = Registry::builder()
        .collector(|_| Box::new(PeakMemory::new()))
        .build();
    let with_memory = memory_registry.frame(code_point!("with_memory"));
    group.bench_function("start_stop_with_peak_memory", |b| {
        b.iter(|| {
            with_memory.start();
            black_box(with_memory.stop(false));
        });
    });

    group.finish();
}
