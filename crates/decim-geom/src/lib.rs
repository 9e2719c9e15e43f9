//! Edge-collapse penalty evaluation for mesh decimation.
//!
//! Decides, for a candidate collapse, whether any reshaped triangle would
//! flip (a deny) and how much the collapse degrades triangle shape:
//!
//! ```text
//!   PenaltyConfig ──validate──▶ PenaltyEvaluator<T>   (kernel resolved once)
//!                                  │
//!        Fan::gather(points, tris) │ evaluate / fan_penalty / collapse_penalty
//!                                  ▼
//!                         Penalty { penalty, deny }
//! ```
//!
//! [`edge_collapse_penalty`] is the portable kernel. On x86_64 the SSE2
//! and SSE4.1 kernels in [`simd`] run the same arithmetic in vector
//! registers; [`simd_available`] reports whether one can be used.
//! Everything here is pure: no shared state, safe to call from any
//! number of threads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod evaluator;
pub mod fan;
pub mod real;
pub mod scalar;
pub mod simd;

pub use config::{KernelPath, PenaltyConfig};
pub use error::GeomError;
pub use evaluator::PenaltyEvaluator;
pub use fan::{collapse_weight, Fan, FanEdge};
pub use real::{point_from_f64, Point, Real};
pub use scalar::{compactness, edge_collapse_penalty, Penalty};
pub use simd::{simd_available, Kernel, SimdLevel};

/// Score a collapse with the best vector kernel for `T`, or the portable
/// kernel when none is available.
///
/// Resolves the kernel on every call; hold a [`PenaltyEvaluator`] in hot
/// loops instead.
pub fn edge_collapse_penalty_vector<T: Real>(
    new_point: &Point<T>,
    old_point: &Point<T>,
    left: &Point<T>,
    right: &Point<T>,
    compactness_target: T,
) -> Penalty<T> {
    match T::vector_kernel(SimdLevel::detect()) {
        Some(kernel) => kernel(new_point, old_point, left, right, compactness_target),
        None => edge_collapse_penalty(new_point, old_point, left, right, compactness_target),
    }
}

// Compile-time assertions: evaluators are shared across worker threads.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PenaltyEvaluator<f32>>();
    assert_send_sync::<PenaltyEvaluator<f64>>();
    assert_send_sync::<Fan<f64>>();
};
