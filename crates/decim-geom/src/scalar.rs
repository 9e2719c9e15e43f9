//! Portable edge-collapse penalty.
//!
//! Moving a vertex from `old_point` to `new_point` reshapes every triangle
//! around it. For one such triangle `(left, right, vertex)`:
//!
//! 1. The old and new face normals are `(right - left) x (vertex - left)`.
//! 2. If they point in opposite directions the collapse folds the face
//!    over: the result is a deny with zero penalty.
//! 3. Otherwise the new triangle's compactness
//!    `2*sqrt(3) * |normal| / (|e0|^2 + |e1|^2 + |e2|^2)` is compared
//!    with the target. Below it, the penalty is how much worse the new
//!    shape is than `min(target, old compactness)`, floored at zero.
//!
//! The vector kernels in [`simd`](crate::simd) perform the same
//! operations in the same order.

use crate::real::{Point, Real};

/// Outcome of scoring a collapse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Penalty<T> {
    /// Non-negative shape penalty. Zero whenever `deny` is set.
    pub penalty: T,
    /// The collapse would flip a face and must not be performed.
    pub deny: bool,
}

impl<T: Real> Penalty<T> {
    /// No penalty, not denied.
    pub const ZERO: Self = Self {
        penalty: T::ZERO,
        deny: false,
    };

    /// Denied collapse.
    pub const DENY: Self = Self {
        penalty: T::ZERO,
        deny: true,
    };

    /// Accepted collapse with `penalty`.
    #[inline]
    pub fn score(penalty: T) -> Self {
        Self {
            penalty,
            deny: false,
        }
    }
}

#[inline]
pub(crate) fn sub<T: Real>(a: &Point<T>, b: &Point<T>) -> Point<T> {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn cross<T: Real>(a: &Point<T>, b: &Point<T>) -> Point<T> {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn dot<T: Real>(a: &Point<T>, b: &Point<T>) -> T {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Compactness of triangle `(left, right, vertex)` given its unnormalised
/// normal: 1 for an equilateral triangle, 0 for a degenerate one.
pub fn compactness<T: Real>(left: &Point<T>, right: &Point<T>, vertex: &Point<T>) -> T {
    let edge = sub(right, left);
    let b = sub(vertex, left);
    let c = sub(vertex, right);
    let normal = cross(&edge, &b);
    let norm = dot(&edge, &edge) + dot(&b, &b) + dot(&c, &c);
    if norm <= T::ZERO {
        return T::ZERO;
    }
    T::COMPACTNESS_SCALE * dot(&normal, &normal).sqrt() / norm
}

/// Score moving the shared vertex of triangle `(left, right, old_point)`
/// to `new_point`.
///
/// Pure and reentrant. A degenerate new triangle (all three points equal)
/// never scores below the target, so it is never penalised.
pub fn edge_collapse_penalty<T: Real>(
    new_point: &Point<T>,
    old_point: &Point<T>,
    left: &Point<T>,
    right: &Point<T>,
    compactness_target: T,
) -> Penalty<T> {
    let edge = sub(right, left);
    let old_b = sub(old_point, left);
    let old_normal = cross(&edge, &old_b);

    let new_b = sub(new_point, left);
    let new_normal = cross(&edge, &new_b);

    if dot(&old_normal, &new_normal) < T::ZERO {
        return Penalty::DENY;
    }

    let edge2 = dot(&edge, &edge);
    let new_c = sub(new_point, right);
    let new_compact = T::COMPACTNESS_SCALE * dot(&new_normal, &new_normal).sqrt();
    let norm = edge2 + dot(&new_b, &new_b) + dot(&new_c, &new_c);

    // Compare before dividing so a zero norm never divides.
    if new_compact < compactness_target * norm {
        let new_compact = new_compact / norm;
        let old_c = sub(old_point, right);
        let old_compact = T::COMPACTNESS_SCALE * dot(&old_normal, &old_normal).sqrt()
            / (edge2 + dot(&old_b, &old_b) + dot(&old_c, &old_c));
        let diff = compactness_target.min(old_compact) - new_compact;
        if diff > T::ZERO {
            return Penalty::score(diff);
        }
    }
    Penalty::ZERO
}
