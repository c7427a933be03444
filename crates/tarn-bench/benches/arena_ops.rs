//! Criterion micro-benchmarks for arena push, rewind, and growth.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tarn_arena::{Arena, ArenaConfig, GrowthMode};
use tarn_bench::{bench_config, replay, request_stream};
use tarn_test_utils::Expr;

const STREAM_LEN: usize = 10_000;

fn bench_push_stream(c: &mut Criterion) {
    let requests = request_stream(42, STREAM_LEN);
    let mut group = c.benchmark_group("push_stream_10k");
    for mode in GrowthMode::ALL {
        let mut arena = Arena::new(bench_config(mode)).unwrap();
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| {
                let used = replay(&mut arena, &requests);
                arena.clear();
                black_box(used);
            });
        });
    }
    group.finish();
}

fn bench_push_small(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_expr");
    for mode in GrowthMode::ALL {
        let mut arena = Arena::new(bench_config(mode)).unwrap();
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| {
                let saved = arena.pos();
                for i in 0..1000 {
                    black_box(arena.push_value(Expr::Int(i)));
                }
                arena.pop_to(saved);
            });
        });
    }
    group.finish();
}

fn bench_rewind_decommit(c: &mut Criterion) {
    let mut arena = Arena::new(ArenaConfig::reserve_commit(64 * 1024 * 1024)).unwrap();
    c.bench_function("reserve_commit_4mb_push_clear", |b| {
        b.iter(|| {
            black_box(arena.push(4 * 1024 * 1024, 64, false));
            arena.clear();
        });
    });
}

fn bench_chunk_growth(c: &mut Criterion) {
    c.bench_function("chain_link_64_chunks", |b| {
        b.iter_batched(
            || Arena::new(ArenaConfig::chain(64 * 1024)).unwrap(),
            |mut arena| {
                for _ in 0..64 {
                    black_box(arena.push(60 * 1024, 16, false));
                }
                arena
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_push_stream,
    bench_push_small,
    bench_rewind_decommit,
    bench_chunk_growth
);
criterion_main!(benches);
