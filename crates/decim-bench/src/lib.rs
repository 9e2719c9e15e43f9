//! Benchmark workloads for the Decim substrate.
//!
//! Shared between the Criterion benches so every bench measures the same
//! inputs:
//!
//! - [`candidate_pool`]: pool shaped like the decimator's collapse records
//! - [`churn_schedule`]: deterministic allocate/release mix
//! - [`penalty_inputs`]: seeded penalty quads in either precision
//! - [`ring_fan`]: one vertex with `valence` triangles around it

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use decim_arena::{ArenaError, ChunkPool, PoolConfig};
use decim_geom::{point_from_f64, Point, Real};
use decim_test_utils::fixtures::{random_quads, seeded_rng, unit_f64};

/// Bytes in one collapse-candidate record: two vertex ids, collapse
/// point, value, penalty, flags, list links.
pub const CANDIDATE_RECORD_BYTES: usize = 64;

/// Chunks per block for [`candidate_pool`].
pub const CANDIDATE_CHUNKS_PER_BLOCK: usize = 1024;

/// Pool of 64-byte, cache-line aligned records.
pub fn candidate_pool() -> Result<ChunkPool, ArenaError> {
    ChunkPool::new(
        &PoolConfig::new(CANDIDATE_RECORD_BYTES, CANDIDATE_CHUNKS_PER_BLOCK).with_alignment(64),
    )
}

/// `ops` allocate (`true`) / release (`false`) steps, biased 60/40 toward
/// allocation so the live set grows while it churns.
pub fn churn_schedule(ops: usize, seed: u64) -> Vec<bool> {
    let mut rng = seeded_rng(seed);
    (0..ops).map(|_| unit_f64(&mut rng) < 0.6).collect()
}

/// One penalty input: `(new_point, old_point, left, right)`.
pub type PenaltyInput<T> = (Point<T>, Point<T>, Point<T>, Point<T>);

/// `count` seeded penalty inputs in the unit cube.
pub fn penalty_inputs<T: Real>(seed: u64, count: usize) -> Vec<PenaltyInput<T>> {
    random_quads(seed, count, 1.0)
        .into_iter()
        .map(|q| {
            (
                point_from_f64(q.new_point),
                point_from_f64(q.old_point),
                point_from_f64(q.left),
                point_from_f64(q.right),
            )
        })
        .collect()
}

/// Vertex `valence` (at the origin) surrounded by `valence` unit-radius
/// rim vertices, one counter-clockwise triangle per rim edge.
pub fn ring_fan(valence: usize) -> (Vec<Point<f64>>, Vec<[usize; 3]>) {
    let mut points: Vec<Point<f64>> = (0..valence)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / valence as f64;
            [a.cos(), a.sin(), 0.0]
        })
        .collect();
    points.push([0.0; 3]);
    let triangles = (0..valence)
        .map(|i| [i, (i + 1) % valence, valence])
        .collect();
    (points, triangles)
}
