//! Criterion micro-benchmarks for the penalty kernels.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use decim_bench::{penalty_inputs, ring_fan, PenaltyInput};
use decim_geom::{Fan, KernelPath, PenaltyConfig, PenaltyEvaluator, Real};

const INPUTS: usize = 4096;

fn evaluators<T: Real>() -> Vec<(&'static str, PenaltyEvaluator<T>)> {
    let mut out = vec![(
        "scalar",
        PenaltyEvaluator::new(&PenaltyConfig::new(0.5).with_path(KernelPath::Scalar)).unwrap(),
    )];
    if decim_geom::simd_available() {
        out.push((
            "vector",
            PenaltyEvaluator::new(&PenaltyConfig::new(0.5).with_path(KernelPath::Vector))
                .unwrap(),
        ));
    }
    out
}

fn run<T: Real>(e: &PenaltyEvaluator<T>, inputs: &[PenaltyInput<T>]) -> usize {
    let mut denies = 0;
    for (n, o, l, r) in inputs {
        let p = e.evaluate(n, o, l, r);
        denies += usize::from(p.deny);
        black_box(p.penalty);
    }
    denies
}

/// Benchmark: 4096 triangle scores per iteration, each kernel and precision.
fn bench_triangle(c: &mut Criterion) {
    let mut group = c.benchmark_group("penalty_triangle");
    group.throughput(Throughput::Elements(INPUTS as u64));

    let inputs32 = penalty_inputs::<f32>(42, INPUTS);
    for (name, e) in evaluators::<f32>() {
        group.bench_with_input(BenchmarkId::new("f32", name), &inputs32, |b, inputs| {
            b.iter(|| black_box(run(&e, inputs)));
        });
    }

    let inputs64 = penalty_inputs::<f64>(42, INPUTS);
    for (name, e) in evaluators::<f64>() {
        group.bench_with_input(BenchmarkId::new("f64", name), &inputs64, |b, inputs| {
            b.iter(|| black_box(run(&e, inputs)));
        });
    }
    group.finish();
}

/// Benchmark: fan penalty for a valence-6 and a valence-12 vertex.
fn bench_fan(c: &mut Criterion) {
    let mut group = c.benchmark_group("penalty_fan");
    for valence in [6usize, 12] {
        let (points, tris) = ring_fan(valence);
        let fan = Fan::gather(&points, &tris, valence, usize::MAX).unwrap();
        for (name, e) in evaluators::<f64>() {
            group.bench_with_input(BenchmarkId::new(name, valence), &fan, |b, fan| {
                b.iter(|| black_box(e.fan_penalty(black_box(&[0.3, 0.1, 0.0]), fan)));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_triangle, bench_fan);
criterion_main!(benches);
