//! Atomic integer cells with fused test-and-mutate operations.
//!
//! [`Atomic32`] and [`Atomic64`] wrap the signed `std` (or loom) atomics
//! and expose the operation set the allocator and lock-free collections
//! are written against: plain read/write, a fenced write, arithmetic and
//! bitwise read-modify-write with "result is zero / negative" variants,
//! compare-and-swap returning the previous value, and spin-waits.
//!
//! # Memory ordering
//!
//! | Operation | Ordering |
//! |-----------|----------|
//! | `read` | `Acquire` |
//! | `write` | `Release` |
//! | `barrier_write` | `SeqCst` swap, result discarded (full fence) |
//! | arithmetic / bitwise / exchange | `AcqRel` |
//! | `cmp_xchg` | `AcqRel` on success, `Acquire` on failure |
//!
//! [`AtomicL`] is the widest cell the target supports natively: 64-bit
//! where `target_has_atomic = "64"`, otherwise it degrades to 32-bit.

use crate::spin::pause;
use crate::sync::atomic::{AtomicI32, Ordering};

#[cfg(target_has_atomic = "64")]
use crate::sync::atomic::AtomicI64;

macro_rules! atomic_cell {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $int:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        #[repr(transparent)]
        pub struct $name {
            value: $inner,
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(0)
            }
        }

        impl $name {
            /// Create a cell holding `value`.
            pub fn new(value: $int) -> Self {
                Self {
                    value: <$inner>::new(value),
                }
            }

            /// Single-copy-atomic load.
            #[inline]
            pub fn read(&self) -> $int {
                self.value.load(Ordering::Acquire)
            }

            /// Single-copy-atomic store. Earlier accesses are not reordered past it.
            #[inline]
            pub fn write(&self, value: $int) {
                self.value.store(value, Ordering::Release);
            }

            /// Store that also acts as a full bidirectional fence.
            #[inline]
            pub fn barrier_write(&self, value: $int) {
                let _ = self.value.swap(value, Ordering::SeqCst);
            }

            /// Atomically add `i`.
            #[inline]
            pub fn add(&self, i: $int) {
                self.value.fetch_add(i, Ordering::AcqRel);
            }

            /// Atomically subtract `i`.
            #[inline]
            pub fn sub(&self, i: $int) {
                self.value.fetch_sub(i, Ordering::AcqRel);
            }

            /// Atomically increment by one.
            #[inline]
            pub fn inc(&self) {
                self.add(1);
            }

            /// Atomically decrement by one.
            #[inline]
            pub fn dec(&self) {
                self.sub(1);
            }

            /// Add `i`; returns `true` if the result is zero.
            #[inline]
            pub fn add_test_zero(&self, i: $int) -> bool {
                self.value.fetch_add(i, Ordering::AcqRel).wrapping_add(i) == 0
            }

            /// Subtract `i`; returns `true` if the result is zero.
            #[inline]
            pub fn sub_test_zero(&self, i: $int) -> bool {
                self.value.fetch_sub(i, Ordering::AcqRel).wrapping_sub(i) == 0
            }

            /// Increment; returns `true` if the result is zero.
            #[inline]
            pub fn inc_test_zero(&self) -> bool {
                self.add_test_zero(1)
            }

            /// Decrement; returns `true` if the result is zero.
            #[inline]
            pub fn dec_test_zero(&self) -> bool {
                self.sub_test_zero(1)
            }

            /// Add `i`; returns `true` if the result is negative.
            #[inline]
            pub fn add_test_negative(&self, i: $int) -> bool {
                self.value.fetch_add(i, Ordering::AcqRel).wrapping_add(i) < 0
            }

            /// Subtract `i`; returns `true` if the result is negative.
            #[inline]
            pub fn sub_test_negative(&self, i: $int) -> bool {
                self.value.fetch_sub(i, Ordering::AcqRel).wrapping_sub(i) < 0
            }

            /// Atomic bitwise AND.
            #[inline]
            pub fn and(&self, mask: $int) {
                self.value.fetch_and(mask, Ordering::AcqRel);
            }

            /// Atomic bitwise AND; returns `true` if the result is zero.
            #[inline]
            pub fn and_test_zero(&self, mask: $int) -> bool {
                (self.value.fetch_and(mask, Ordering::AcqRel) & mask) == 0
            }

            /// Atomic bitwise OR.
            #[inline]
            pub fn or(&self, mask: $int) {
                self.value.fetch_or(mask, Ordering::AcqRel);
            }

            /// Atomic bitwise OR; returns `true` if the result is zero.
            #[inline]
            pub fn or_test_zero(&self, mask: $int) -> bool {
                (self.value.fetch_or(mask, Ordering::AcqRel) | mask) == 0
            }

            /// Atomic bitwise XOR.
            #[inline]
            pub fn xor(&self, mask: $int) {
                self.value.fetch_xor(mask, Ordering::AcqRel);
            }

            /// Atomic bitwise XOR; returns `true` if the result is zero.
            #[inline]
            pub fn xor_test_zero(&self, mask: $int) -> bool {
                (self.value.fetch_xor(mask, Ordering::AcqRel) ^ mask) == 0
            }

            /// Swap in `value`, returning the previous value.
            #[inline]
            pub fn exchange(&self, value: $int) -> $int {
                self.value.swap(value, Ordering::AcqRel)
            }

            /// Compare-and-swap `old → new`. Returns the value observed before
            /// the operation; the swap happened iff that equals `old`.
            #[inline]
            pub fn cmp_xchg(&self, old: $int, new: $int) -> $int {
                match self
                    .value
                    .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
                {
                    Ok(prev) | Err(prev) => prev,
                }
            }

            /// Compare-and-swap `old → new`; returns `true` if the swap happened.
            #[inline]
            pub fn cmp_replace(&self, old: $int, new: $int) -> bool {
                self.cmp_xchg(old, new) == old
            }

            /// Add and return the new value.
            #[inline]
            pub fn add_read(&self, add: $int) -> $int {
                self.value.fetch_add(add, Ordering::AcqRel).wrapping_add(add)
            }

            /// Add and return the previous value.
            #[inline]
            pub fn read_add(&self, add: $int) -> $int {
                self.value.fetch_add(add, Ordering::AcqRel)
            }

            /// AND and return the previous value.
            #[inline]
            pub fn read_and(&self, mask: $int) -> $int {
                self.value.fetch_and(mask, Ordering::AcqRel)
            }

            /// OR and return the previous value.
            #[inline]
            pub fn read_or(&self, mask: $int) -> $int {
                self.value.fetch_or(mask, Ordering::AcqRel)
            }

            /// Increment, wrapping to zero once the value reaches `max`.
            /// Returns the previous value.
            pub fn read_inc_loop(&self, max: $int) -> $int {
                self.read_add_loop(1, 0, max)
            }

            /// Add `add`, wrapping to `base` once the value reaches `max`.
            /// Returns the previous value.
            pub fn read_add_loop(&self, add: $int, base: $int, max: $int) -> $int {
                loop {
                    let current = self.read();
                    let mut next = current.wrapping_add(add);
                    if next >= max {
                        next = base;
                    }
                    if self.cmp_replace(current, next) {
                        return current;
                    }
                }
            }

            /// Busy-wait until the cell holds `value`.
            pub fn spin_wait_eq(&self, value: $int) {
                while self.read() != value {
                    pause();
                }
            }

            /// Busy-wait until the cell no longer holds `value`.
            pub fn spin_wait_neq(&self, value: $int) {
                while self.read() == value {
                    pause();
                }
            }

            /// Busy-wait until the cell holds `value`, for at most `budget`
            /// polls. Returns the unused budget; `0` means the wait timed out.
            ///
            /// A budget of `0` is treated as `1`.
            pub fn spin_wait_eq_count(&self, value: $int, budget: u32) -> u32 {
                let mut remaining = budget.max(1);
                loop {
                    if self.read() == value {
                        return remaining;
                    }
                    remaining -= 1;
                    if remaining == 0 {
                        return 0;
                    }
                    pause();
                }
            }

            /// Busy-wait until the cell no longer holds `value`, for at most
            /// `budget` polls. Returns the unused budget; `0` means timed out.
            ///
            /// A budget of `0` is treated as `1`.
            pub fn spin_wait_neq_count(&self, value: $int, budget: u32) -> u32 {
                let mut remaining = budget.max(1);
                loop {
                    if self.read() != value {
                        return remaining;
                    }
                    remaining -= 1;
                    if remaining == 0 {
                        return 0;
                    }
                    pause();
                }
            }

            /// Spin until the compare-and-swap `old → new` succeeds.
            pub fn spin(&self, old: $int, new: $int) {
                while !self.cmp_replace(old, new) {
                    while self.read() != old {
                        pause();
                    }
                }
            }

            /// Bounded [`spin`](Self::spin): gives up after `budget` failed
            /// polls and returns `false`.
            pub fn try_spin(&self, old: $int, new: $int, budget: u32) -> bool {
                let mut remaining = budget.max(1);
                while !self.cmp_replace(old, new) {
                    while self.read() != old {
                        remaining -= 1;
                        if remaining == 0 {
                            return false;
                        }
                        pause();
                    }
                }
                true
            }
        }
    };
}

atomic_cell!(
    /// 32-bit signed atomic cell.
    Atomic32,
    AtomicI32,
    i32
);

#[cfg(target_has_atomic = "64")]
atomic_cell!(
    /// 64-bit signed atomic cell. Only available where the target has
    /// native 64-bit atomics; see [`AtomicL`] for the portable choice.
    Atomic64,
    AtomicI64,
    i64
);

/// Widest natively supported atomic cell.
#[cfg(target_has_atomic = "64")]
pub type AtomicL = Atomic64;

/// Widest natively supported atomic cell (32-bit fallback).
#[cfg(not(target_has_atomic = "64"))]
pub type AtomicL = Atomic32;

/// Integer type stored in an [`AtomicL`].
#[cfg(target_has_atomic = "64")]
pub type IntL = i64;

/// Integer type stored in an [`AtomicL`] (32-bit fallback).
#[cfg(not(target_has_atomic = "64"))]
pub type IntL = i32;

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn read_write_roundtrip() {
        let a = Atomic32::new(5);
        assert_eq!(a.read(), 5);
        a.write(-7);
        assert_eq!(a.read(), -7);
        a.barrier_write(11);
        assert_eq!(a.read(), 11);
    }

    #[test]
    fn test_zero_variants() {
        let a = Atomic32::new(2);
        assert!(!a.dec_test_zero());
        assert!(a.dec_test_zero());
        assert!(!a.inc_test_zero());
        assert!(a.sub_test_zero(1));
        assert!(a.add_test_zero(0));
    }

    #[test]
    fn test_negative_variants() {
        let a = Atomic32::new(1);
        assert!(!a.sub_test_negative(1));
        assert!(a.sub_test_negative(1));
        assert!(!a.add_test_negative(1));
        assert!(a.add_test_negative(-5));
    }

    #[test]
    fn bitwise_ops_report_zero() {
        let a = Atomic32::new(0b1100);
        assert!(a.and_test_zero(0b0011));
        a.write(0b1100);
        assert!(!a.and_test_zero(0b0100));
        assert_eq!(a.read(), 0b0100);
        assert!(!a.or_test_zero(0b0001));
        assert_eq!(a.read(), 0b0101);
        assert!(a.xor_test_zero(0b0101));
        assert_eq!(a.read(), 0);
    }

    #[test]
    fn cmp_xchg_returns_previous() {
        let a = Atomic32::new(3);
        assert_eq!(a.cmp_xchg(4, 9), 3);
        assert_eq!(a.read(), 3);
        assert_eq!(a.cmp_xchg(3, 9), 3);
        assert_eq!(a.read(), 9);
        assert!(!a.cmp_replace(3, 1));
        assert!(a.cmp_replace(9, 1));
    }

    #[test]
    fn read_add_variants() {
        let a = Atomic32::new(10);
        assert_eq!(a.read_add(5), 10);
        assert_eq!(a.add_read(5), 20);
        assert_eq!(a.read_and(0b10100), 20);
        assert_eq!(a.read(), 20);
        assert_eq!(a.read_or(1), 20);
        assert_eq!(a.read(), 21);
        assert_eq!(a.exchange(0), 21);
    }

    #[test]
    fn inc_loop_wraps_at_max() {
        let a = Atomic32::new(0);
        let seen: Vec<i32> = (0..7).map(|_| a.read_inc_loop(3)).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn add_loop_wraps_to_base() {
        let a = Atomic32::new(4);
        assert_eq!(a.read_add_loop(3, 1, 8), 4);
        assert_eq!(a.read(), 7);
        assert_eq!(a.read_add_loop(3, 1, 8), 7);
        assert_eq!(a.read(), 1);
    }

    #[test]
    fn spin_wait_count_times_out() {
        let a = Atomic32::new(1);
        assert_eq!(a.spin_wait_eq_count(0, 16), 0);
        assert_eq!(a.spin_wait_neq_count(1, 16), 0);
        assert_eq!(a.spin_wait_eq_count(1, 16), 16);
        assert_eq!(a.spin_wait_neq_count(0, 16), 16);
    }

    #[test]
    fn zero_budget_polls_once() {
        let a = Atomic32::new(1);
        assert_eq!(a.spin_wait_eq_count(1, 0), 1);
        assert_eq!(a.spin_wait_eq_count(2, 0), 0);
    }

    #[test]
    fn try_spin_gives_up() {
        let a = Atomic32::new(1);
        assert!(!a.try_spin(0, 5, 8));
        assert!(a.try_spin(1, 5, 8));
        assert_eq!(a.read(), 5);
    }

    #[test]
    fn spin_wait_observes_other_thread() {
        let a = Arc::new(Atomic32::new(0));
        let writer = {
            let a = Arc::clone(&a);
            thread::spawn(move || a.write(42))
        };
        a.spin_wait_eq(42);
        writer.join().unwrap();
        assert_eq!(a.read(), 42);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let a = Arc::new(AtomicL::new(0));
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        a.inc();
                    }
                });
            }
        });
        assert_eq!(a.read(), 8000 as IntL);
    }

    #[cfg(target_has_atomic = "64")]
    #[test]
    fn wide_cell_holds_values_beyond_i32() {
        let a = Atomic64::new(i64::from(i32::MAX));
        a.inc();
        assert_eq!(a.read(), i64::from(i32::MAX) + 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn add_read_matches_wrapping_add(start in any::<i32>(), add in any::<i32>()) {
                let a = Atomic32::new(start);
                prop_assert_eq!(a.add_read(add), start.wrapping_add(add));
                prop_assert_eq!(a.read(), start.wrapping_add(add));
            }

            #[test]
            fn inc_loop_stays_below_max(max in 1i32..64, steps in 0usize..256) {
                let a = Atomic32::new(0);
                for _ in 0..steps {
                    let prev = a.read_inc_loop(max);
                    prop_assert!(prev >= 0 && prev < max);
                }
                prop_assert_eq!(a.read(), (steps as i32) % max);
            }
        }
    }
}
