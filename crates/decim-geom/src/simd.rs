//! SSE penalty kernels and runtime feature detection.
//!
//! A point lives in one register (`f32`: `[x, y, z, 0]`) or a register
//! pair (`f64`: `[x, y]` and `[z, _]`). Edge differences, cross products
//! and dot products run in the vector unit; the compactness comparison
//! that follows is the scalar kernel's, operation for operation, so the
//! two paths agree up to rounding.
//!
//! Kernels are handed out as safe function pointers only after
//! [`SimdLevel::detect`] has confirmed the CPU supports them.
#![allow(unsafe_code)]

use std::fmt;

use crate::real::{Point, Real};
use crate::scalar::Penalty;

/// Signature shared by every penalty kernel:
/// `(new_point, old_point, left, right, compactness_target)`.
pub type Kernel<T> = fn(&Point<T>, &Point<T>, &Point<T>, &Point<T>, T) -> Penalty<T>;

/// Vector instruction set available to the penalty kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SimdLevel {
    /// No vector kernel on this target.
    None,
    /// SSE2: shuffles, multiplies, horizontal adds by hand.
    Sse2,
    /// SSE4.1: dot products via `dpps` / `dppd`.
    Sse41,
}

impl SimdLevel {
    /// Best level the running CPU supports.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("sse4.1") {
                return Self::Sse41;
            }
            // Baseline on x86_64.
            Self::Sse2
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self::None
        }
    }
}

impl fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Sse2 => write!(f, "sse2"),
            Self::Sse41 => write!(f, "sse4.1"),
        }
    }
}

/// Whether a vector kernel exists for the running CPU.
pub fn simd_available() -> bool {
    SimdLevel::detect() > SimdLevel::None
}

/// `f32` kernel for `level`, or `None` if `level` is `None` or exceeds
/// what the CPU supports.
pub fn kernel_f32(level: SimdLevel) -> Option<Kernel<f32>> {
    if level == SimdLevel::None || level > SimdLevel::detect() {
        return None;
    }
    #[cfg(target_arch = "x86_64")]
    {
        Some(match level {
            SimdLevel::Sse41 => x86::penalty_f32_sse41 as Kernel<f32>,
            _ => x86::penalty_f32_sse2 as Kernel<f32>,
        })
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        None
    }
}

/// `f64` kernel for `level`, or `None` if `level` is `None` or exceeds
/// what the CPU supports.
pub fn kernel_f64(level: SimdLevel) -> Option<Kernel<f64>> {
    if level == SimdLevel::None || level > SimdLevel::detect() {
        return None;
    }
    #[cfg(target_arch = "x86_64")]
    {
        Some(match level {
            SimdLevel::Sse41 => x86::penalty_f64_sse41 as Kernel<f64>,
            _ => x86::penalty_f64_sse2 as Kernel<f64>,
        })
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        None
    }
}

/// Vector representation of a 3-D point.
///
/// # Safety
///
/// Implementations may use instructions beyond the x86_64 baseline; the
/// caller must have verified the matching CPU feature.
#[cfg(target_arch = "x86_64")]
trait Lanes: Copy {
    type Scalar: Real;

    unsafe fn load(p: &Point<Self::Scalar>) -> Self;
    unsafe fn sub(self, other: Self) -> Self;
    unsafe fn cross(self, other: Self) -> Self;
    /// `(x*x' + y*y') + z*z'`.
    unsafe fn dot(self, other: Self) -> Self::Scalar;
}

/// Branch logic shared by every vector kernel.
///
/// # Safety
///
/// `L`'s CPU feature must be available.
#[cfg(target_arch = "x86_64")]
#[inline]
unsafe fn penalty_with<L: Lanes>(
    new_point: &Point<L::Scalar>,
    old_point: &Point<L::Scalar>,
    left: &Point<L::Scalar>,
    right: &Point<L::Scalar>,
    compactness_target: L::Scalar,
) -> Penalty<L::Scalar> {
    let zero = <L::Scalar as Real>::ZERO;
    let scale = <L::Scalar as Real>::COMPACTNESS_SCALE;

    // SAFETY: forwarded from the caller.
    unsafe {
        let l = L::load(left);
        let r = L::load(right);
        let old = L::load(old_point);
        let new = L::load(new_point);

        let edge = r.sub(l);
        let old_b = old.sub(l);
        let old_normal = edge.cross(old_b);
        let new_b = new.sub(l);
        let new_normal = edge.cross(new_b);

        if old_normal.dot(new_normal) < zero {
            return Penalty::DENY;
        }

        let edge2 = edge.dot(edge);
        let new_c = new.sub(r);
        let new_compact = scale * new_normal.dot(new_normal).sqrt();
        let norm = edge2 + new_b.dot(new_b) + new_c.dot(new_c);

        if new_compact < compactness_target * norm {
            let new_compact = new_compact / norm;
            let old_c = old.sub(r);
            let old_compact = scale * old_normal.dot(old_normal).sqrt()
                / (edge2 + old_b.dot(old_b) + old_c.dot(old_c));
            let diff = compactness_target.min(old_compact) - new_compact;
            if diff > zero {
                return Penalty::score(diff);
            }
        }
        Penalty::ZERO
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    use super::{penalty_with, Lanes};
    use crate::real::Point;
    use crate::scalar::Penalty;

    // _MM_SHUFFLE(3, 0, 2, 1) and _MM_SHUFFLE(3, 1, 0, 2).
    const YZX: i32 = 0b11_00_10_01;
    const ZXY: i32 = 0b11_01_00_10;

    /// `[x, y, z, 0]`, dot products by shuffle and add.
    #[derive(Clone, Copy)]
    struct F32Sse2(__m128);

    /// `[x, y, z, 0]`, dot products by `dpps`.
    #[derive(Clone, Copy)]
    struct F32Sse41(__m128);

    /// `xy = [x, y]`, `z = [z, 0]`, dot products by shuffle and add.
    #[derive(Clone, Copy)]
    struct F64Sse2 {
        xy: __m128d,
        z: __m128d,
    }

    /// `xy = [x, y]`, `z = [z, 0]`, dot products by `dppd`.
    #[derive(Clone, Copy)]
    struct F64Sse41 {
        xy: __m128d,
        z: __m128d,
    }

    #[inline]
    unsafe fn load_ps(p: &Point<f32>) -> __m128 {
        unsafe { _mm_set_ps(0.0, p[2], p[1], p[0]) }
    }

    #[inline]
    unsafe fn cross_ps(a: __m128, b: __m128) -> __m128 {
        unsafe {
            let a_yzx = _mm_shuffle_ps::<YZX>(a, a);
            let b_zxy = _mm_shuffle_ps::<ZXY>(b, b);
            let a_zxy = _mm_shuffle_ps::<ZXY>(a, a);
            let b_yzx = _mm_shuffle_ps::<YZX>(b, b);
            _mm_sub_ps(_mm_mul_ps(a_yzx, b_zxy), _mm_mul_ps(a_zxy, b_yzx))
        }
    }

    #[inline]
    unsafe fn dot_ps_sse2(a: __m128, b: __m128) -> f32 {
        unsafe {
            let m = _mm_mul_ps(a, b);
            let y = _mm_shuffle_ps::<0b01>(m, m);
            let z = _mm_movehl_ps(m, m);
            _mm_cvtss_f32(_mm_add_ss(_mm_add_ss(m, y), z))
        }
    }

    #[inline]
    #[target_feature(enable = "sse4.1")]
    unsafe fn dot_ps_sse41(a: __m128, b: __m128) -> f32 {
        // Multiply x, y, z; sum into lane 0.
        unsafe { _mm_cvtss_f32(_mm_dp_ps::<0x71>(a, b)) }
    }

    #[inline]
    unsafe fn load_pd(p: &Point<f64>) -> (__m128d, __m128d) {
        unsafe { (_mm_set_pd(p[1], p[0]), _mm_set_sd(p[2])) }
    }

    #[inline]
    unsafe fn cross_pd(
        a: (__m128d, __m128d),
        b: (__m128d, __m128d),
    ) -> (__m128d, __m128d) {
        unsafe {
            let (axy, az) = a;
            let (bxy, bz) = b;
            // [y, z] and [z, x] of each operand.
            let a_yz = _mm_shuffle_pd::<0b01>(axy, az);
            let a_zx = _mm_shuffle_pd::<0b00>(az, axy);
            let b_yz = _mm_shuffle_pd::<0b01>(bxy, bz);
            let b_zx = _mm_shuffle_pd::<0b00>(bz, bxy);
            let xy = _mm_sub_pd(_mm_mul_pd(a_yz, b_zx), _mm_mul_pd(a_zx, b_yz));

            // [ax*by, ay*bx]
            let t = _mm_mul_pd(axy, _mm_shuffle_pd::<0b01>(bxy, bxy));
            let z = _mm_sub_sd(t, _mm_unpackhi_pd(t, t));
            (xy, _mm_move_sd(_mm_setzero_pd(), z))
        }
    }

    #[inline]
    unsafe fn dot_pd_sse2(a: (__m128d, __m128d), b: (__m128d, __m128d)) -> f64 {
        unsafe {
            let m = _mm_mul_pd(a.0, b.0);
            let xy = _mm_add_sd(m, _mm_unpackhi_pd(m, m));
            _mm_cvtsd_f64(_mm_add_sd(xy, _mm_mul_sd(a.1, b.1)))
        }
    }

    #[inline]
    #[target_feature(enable = "sse4.1")]
    unsafe fn dot_pd_sse41(a: (__m128d, __m128d), b: (__m128d, __m128d)) -> f64 {
        unsafe {
            let xy = _mm_dp_pd::<0x31>(a.0, b.0);
            _mm_cvtsd_f64(_mm_add_sd(xy, _mm_mul_sd(a.1, b.1)))
        }
    }

    impl Lanes for F32Sse2 {
        type Scalar = f32;

        #[inline]
        unsafe fn load(p: &Point<f32>) -> Self {
            Self(unsafe { load_ps(p) })
        }

        #[inline]
        unsafe fn sub(self, other: Self) -> Self {
            Self(unsafe { _mm_sub_ps(self.0, other.0) })
        }

        #[inline]
        unsafe fn cross(self, other: Self) -> Self {
            Self(unsafe { cross_ps(self.0, other.0) })
        }

        #[inline]
        unsafe fn dot(self, other: Self) -> f32 {
            unsafe { dot_ps_sse2(self.0, other.0) }
        }
    }

    impl Lanes for F32Sse41 {
        type Scalar = f32;

        #[inline]
        unsafe fn load(p: &Point<f32>) -> Self {
            Self(unsafe { load_ps(p) })
        }

        #[inline]
        unsafe fn sub(self, other: Self) -> Self {
            Self(unsafe { _mm_sub_ps(self.0, other.0) })
        }

        #[inline]
        unsafe fn cross(self, other: Self) -> Self {
            Self(unsafe { cross_ps(self.0, other.0) })
        }

        #[inline]
        unsafe fn dot(self, other: Self) -> f32 {
            unsafe { dot_ps_sse41(self.0, other.0) }
        }
    }

    impl Lanes for F64Sse2 {
        type Scalar = f64;

        #[inline]
        unsafe fn load(p: &Point<f64>) -> Self {
            let (xy, z) = unsafe { load_pd(p) };
            Self { xy, z }
        }

        #[inline]
        unsafe fn sub(self, other: Self) -> Self {
            unsafe {
                Self {
                    xy: _mm_sub_pd(self.xy, other.xy),
                    z: _mm_sub_pd(self.z, other.z),
                }
            }
        }

        #[inline]
        unsafe fn cross(self, other: Self) -> Self {
            let (xy, z) = unsafe { cross_pd((self.xy, self.z), (other.xy, other.z)) };
            Self { xy, z }
        }

        #[inline]
        unsafe fn dot(self, other: Self) -> f64 {
            unsafe { dot_pd_sse2((self.xy, self.z), (other.xy, other.z)) }
        }
    }

    impl Lanes for F64Sse41 {
        type Scalar = f64;

        #[inline]
        unsafe fn load(p: &Point<f64>) -> Self {
            let (xy, z) = unsafe { load_pd(p) };
            Self { xy, z }
        }

        #[inline]
        unsafe fn sub(self, other: Self) -> Self {
            unsafe {
                Self {
                    xy: _mm_sub_pd(self.xy, other.xy),
                    z: _mm_sub_pd(self.z, other.z),
                }
            }
        }

        #[inline]
        unsafe fn cross(self, other: Self) -> Self {
            let (xy, z) = unsafe { cross_pd((self.xy, self.z), (other.xy, other.z)) };
            Self { xy, z }
        }

        #[inline]
        unsafe fn dot(self, other: Self) -> f64 {
            unsafe { dot_pd_sse41((self.xy, self.z), (other.xy, other.z)) }
        }
    }

    #[target_feature(enable = "sse4.1")]
    unsafe fn f32_sse41(
        n: &Point<f32>,
        o: &Point<f32>,
        l: &Point<f32>,
        r: &Point<f32>,
        target: f32,
    ) -> Penalty<f32> {
        unsafe { penalty_with::<F32Sse41>(n, o, l, r, target) }
    }

    #[target_feature(enable = "sse4.1")]
    unsafe fn f64_sse41(
        n: &Point<f64>,
        o: &Point<f64>,
        l: &Point<f64>,
        r: &Point<f64>,
        target: f64,
    ) -> Penalty<f64> {
        unsafe { penalty_with::<F64Sse41>(n, o, l, r, target) }
    }

    pub(super) fn penalty_f32_sse2(
        n: &Point<f32>,
        o: &Point<f32>,
        l: &Point<f32>,
        r: &Point<f32>,
        target: f32,
    ) -> Penalty<f32> {
        // SAFETY: SSE2 is part of the x86_64 baseline.
        unsafe { penalty_with::<F32Sse2>(n, o, l, r, target) }
    }

    pub(super) fn penalty_f64_sse2(
        n: &Point<f64>,
        o: &Point<f64>,
        l: &Point<f64>,
        r: &Point<f64>,
        target: f64,
    ) -> Penalty<f64> {
        // SAFETY: SSE2 is part of the x86_64 baseline.
        unsafe { penalty_with::<F64Sse2>(n, o, l, r, target) }
    }

    pub(super) fn penalty_f32_sse41(
        n: &Point<f32>,
        o: &Point<f32>,
        l: &Point<f32>,
        r: &Point<f32>,
        target: f32,
    ) -> Penalty<f32> {
        // SAFETY: only handed out by `kernel_f32` after detecting SSE4.1.
        unsafe { f32_sse41(n, o, l, r, target) }
    }

    pub(super) fn penalty_f64_sse41(
        n: &Point<f64>,
        o: &Point<f64>,
        l: &Point<f64>,
        r: &Point<f64>,
        target: f64,
    ) -> Penalty<f64> {
        // SAFETY: only handed out by `kernel_f64` after detecting SSE4.1.
        unsafe { f64_sse41(n, o, l, r, target) }
    }
}
