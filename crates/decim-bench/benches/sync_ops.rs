//! Criterion micro-benchmarks for lists, barriers and the striped counter.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use decim_atomic::SpinLock;
use decim_sync::{AtomicList, BarrierTree, DualList, StripedCounter};
use decim_test_utils::run_threads;

/// Benchmark: uncontended add + remove on the singly linked list.
fn bench_list_add_remove(c: &mut Criterion) {
    let list = AtomicList::new(0..1024u32).unwrap();
    for i in 1..1024 {
        list.add(i).unwrap();
    }
    c.bench_function("list_add_remove", |b| {
        b.iter(|| {
            list.add(0).unwrap();
            list.remove(0).unwrap();
        });
    });
}

/// Benchmark: append + remove at the tail of the dual list.
fn bench_dual_add_last(c: &mut Criterion) {
    let list = DualList::new(0..1024u32).unwrap();
    for i in 1..1024 {
        list.add_first(i).unwrap();
    }
    c.bench_function("dual_add_last_remove", |b| {
        b.iter(|| {
            list.add_last(0).unwrap();
            list.remove(0).unwrap();
        });
    });
}

/// Benchmark: walk a 1024-node list.
fn bench_list_walk(c: &mut Criterion) {
    let list = AtomicList::new(0..1024u32).unwrap();
    for i in 0..1024 {
        list.add(i).unwrap();
    }
    c.bench_function("list_walk_1024", |b| {
        b.iter(|| black_box(list.iter().count()));
    });
}

/// Benchmark: 4 threads each crossing a barrier 1000 times.
fn bench_barrier(c: &mut Criterion) {
    let barrier = BarrierTree::build(4, 2).unwrap();
    c.bench_function("barrier_4x1000", |b| {
        b.iter(|| {
            run_threads(4, |p| {
                let mut w = barrier.participant(p).unwrap();
                for _ in 0..1000 {
                    black_box(w.wait(Some(1 << 12)));
                }
            });
        });
    });
}

/// Benchmark: 4 threads hitting a striped counter 10K times each.
fn bench_counter(c: &mut Criterion) {
    let counter = StripedCounter::new(4, 64).unwrap();
    c.bench_function("striped_counter_4x10k", |b| {
        b.iter(|| {
            run_threads(4, |t| {
                for _ in 0..10_000 {
                    black_box(counter.hit(t));
                }
            });
        });
    });
}

/// Benchmark: uncontended spinlock lock/unlock.
fn bench_spinlock(c: &mut Criterion) {
    let lock = SpinLock::new(0u64);
    c.bench_function("spinlock_uncontended", |b| {
        b.iter(|| {
            *lock.lock() += 1;
        });
    });
    black_box(lock.into_inner());
}

criterion_group!(
    benches,
    bench_list_add_remove,
    bench_dual_add_last,
    bench_list_walk,
    bench_barrier,
    bench_counter,
    bench_spinlock
);
criterion_main!(benches);
