//! # Assembly Benchmarks
//!
//! Cost of attaching through chains of increasing depth.
//!
//! Run with: `cargo bench -p subchain-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use subchain_core::{Flux, Immediate, Recorder, Subscriber, StreamError};

/// Build a range source under `depth` identity hops.
fn hide_chain(depth: usize) -> Flux<i64> {
    let mut flux = Flux::range(0, 1);
    for _ in 0..depth {
        flux = flux.hide();
    }
    flux
}

/// Discards everything.
struct Sink;

impl Subscriber<i64> for Sink {
    fn on_next(&mut self, item: i64) {
        black_box(item);
    }

    fn on_error(&mut self, error: StreamError) {
        black_box(error);
    }

    fn on_complete(&mut self) {}
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach_hide_chain");

    for depth in [10usize, 100, 1000, 10000].iter() {
        let flux = hide_chain(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| black_box(flux.subscribe(Sink)));
        });
    }

    group.finish();
}

fn bench_build_and_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_drop");

    for depth in [10usize, 100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            b.iter(|| black_box(hide_chain(depth)));
        });
    }

    group.finish();
}

fn bench_mixed_chain(c: &mut Criterion) {
    let flux = Flux::range(0, 1_000)
        .map(|v| v + 1)
        .filter(|v| v % 3 == 0)
        .subscribe_on(std::sync::Arc::new(Immediate))
        .map(|v| v * 2)
        .take(100);

    c.bench_function("mixed_chain_1000_items", |b| {
        b.iter(|| {
            let (recorder, handle) = Recorder::<i64>::new();
            let _ = flux.subscribe(recorder);
            black_box(handle.len())
        });
    });
}

criterion_group!(benches, bench_attach, bench_build_and_drop, bench_mixed_chain);
criterion_main!(benches);
