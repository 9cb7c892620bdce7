//! Write-propagation benchmarks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use filament_core::reactive::Runtime;

fn fan_out(c: &mut Criterion) {
    let rt = Runtime::new();
    let (source, set_source) = rt.create_signal(0u64);

    for _ in 0..100 {
        let source = source.clone();
        rt.create_effect(move || {
            black_box(source.get());
        });
    }

    let mut next = 0u64;
    c.bench_function("set_with_100_effects", |b| {
        b.iter(|| {
            next += 1;
            set_source.set(black_box(next));
        })
    });
}

fn memo_chain(c: &mut Criterion) {
    let rt = Runtime::new();
    let (source, set_source) = rt.create_signal(0u64);

    let mut tail = rt.create_memo(move || source.get() + 1);
    for _ in 0..50 {
        let prev = tail.clone();
        tail = rt.create_memo(move || prev.get() + 1);
    }

    let mut next = 0u64;
    c.bench_function("set_through_50_memos", |b| {
        b.iter(|| {
            next += 1;
            set_source.set(next);
            black_box(tail.get())
        })
    });
}

fn dynamic_branch(c: &mut Criterion) {
    let rt = Runtime::new();
    let (cond, set_cond) = rt.create_signal(true);
    let (a, _set_a) = rt.create_signal(1u64);
    let (b, _set_b) = rt.create_signal(2u64);

    let value = rt.create_memo(move || if cond.get() { a.get() } else { b.get() });

    let mut flag = true;
    c.bench_function("toggle_branch", |bench| {
        bench.iter(|| {
            flag = !flag;
            set_cond.set(flag);
            black_box(value.get())
        })
    });
}

criterion_group!(benches, fan_out, memo_chain, dynamic_branch);
criterion_main!(benches);
