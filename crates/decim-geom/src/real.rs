//! Floating-point scalar abstraction.
//!
//! The evaluator runs in single or double precision. [`Real`] carries the
//! handful of operations the penalty arithmetic needs and the per-type
//! vector kernel lookup; it is sealed to `f32` and `f64`.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use crate::simd::{self, Kernel, SimdLevel};

/// A 3-D point (or edge vector) as `[x, y, z]`.
pub type Point<T> = [T; 3];

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Scalar type the penalty evaluator can run on.
pub trait Real:
    sealed::Sealed
    + Copy
    + PartialOrd
    + fmt::Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// Additive identity.
    const ZERO: Self;

    /// Compactness normalisation `2 * sqrt(3)`: an equilateral triangle
    /// scores exactly 1.
    const COMPACTNESS_SCALE: Self;

    /// Lane count of one SSE register of this type.
    const LANES: usize;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Smaller of two values.
    fn min(self, other: Self) -> Self;

    /// Nearest representable value.
    fn from_f64(value: f64) -> Self;

    /// Widened value.
    fn to_f64(self) -> f64;

    /// Vector kernel for `level`, if the running CPU supports it.
    fn vector_kernel(level: SimdLevel) -> Option<Kernel<Self>>;
}

impl Real for f32 {
    const ZERO: Self = 0.0;
    const COMPACTNESS_SCALE: Self = 0.5 * 4.0 * 1.732_050_8;
    const LANES: usize = 4;

    #[inline]
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }

    #[inline]
    fn min(self, other: Self) -> Self {
        f32::min(self, other)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn vector_kernel(level: SimdLevel) -> Option<Kernel<Self>> {
        simd::kernel_f32(level)
    }
}

impl Real for f64 {
    const ZERO: Self = 0.0;
    const COMPACTNESS_SCALE: Self = 0.5 * 4.0 * 1.732_050_808;
    const LANES: usize = 2;

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn min(self, other: Self) -> Self {
        f64::min(self, other)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    fn vector_kernel(level: SimdLevel) -> Option<Kernel<Self>> {
        simd::kernel_f64(level)
    }
}

/// Narrow an `f64` point to `T`.
pub fn point_from_f64<T: Real>(p: [f64; 3]) -> Point<T> {
    [T::from_f64(p[0]), T::from_f64(p[1]), T::from_f64(p[2])]
}
