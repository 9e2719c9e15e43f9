//! Seeded random inputs.
//!
//! Everything is driven by `ChaCha8Rng` so failures reproduce from the
//! seed alone.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed used by tests that do not care which seed they get.
pub const DEFAULT_SEED: u64 = 0x00de_c1a7_e5ee_d000;

/// Deterministic RNG for `seed`.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform `f64` in `[0, 1)` from the top 53 bits of one draw.
pub fn unit_f64(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Uniform `f64` in `[lo, hi)`.
pub fn uniform(rng: &mut ChaCha8Rng, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * unit_f64(rng)
}

/// Point with each coordinate uniform in `[-scale, scale)`.
pub fn random_point(rng: &mut ChaCha8Rng, scale: f64) -> [f64; 3] {
    [
        uniform(rng, -scale, scale),
        uniform(rng, -scale, scale),
        uniform(rng, -scale, scale),
    ]
}

/// One edge-collapse candidate: the moved vertex's new and old positions
/// plus the two fixed vertices of the triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub new_point: [f64; 3],
    pub old_point: [f64; 3],
    pub left: [f64; 3],
    pub right: [f64; 3],
}

/// `count` random quads in the cube `[-scale, scale)^3`.
pub fn random_quads(seed: u64, count: usize, scale: f64) -> Vec<Quad> {
    let mut rng = seeded_rng(seed);
    (0..count)
        .map(|_| Quad {
            new_point: random_point(&mut rng, scale),
            old_point: random_point(&mut rng, scale),
            left: random_point(&mut rng, scale),
            right: random_point(&mut rng, scale),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_quads() {
        assert_eq!(random_quads(7, 16, 1.0), random_quads(7, 16, 1.0));
        assert_ne!(random_quads(7, 16, 1.0), random_quads(8, 16, 1.0));
    }

    #[test]
    fn unit_stays_in_range() {
        let mut rng = seeded_rng(DEFAULT_SEED);
        for _ in 0..10_000 {
            let x = unit_f64(&mut rng);
            assert!((0.0..1.0).contains(&x));
        }
    }
}
