//! Busy-waiting mutual exclusion.
//!
//! [`RawSpinLock`] is a bare 0/1 lock word. [`SpinLock<T>`] wraps it
//! around a value and hands out an RAII [`SpinLockGuard`]. Critical
//! sections are expected to be short: holders never block or sleep.
#![allow(unsafe_code)]

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::spin::pause;
use crate::sync::atomic::{AtomicI32, Ordering};
use crate::sync::cell::UnsafeCell;
use crate::sync::{cell_mut, cell_ref};

const UNLOCKED: i32 = 0;
const LOCKED: i32 = 1;

/// A bare spin lock word.
///
/// Lock is a compare-and-swap 0 → 1; unlock is a release store of 0.
/// No ownership is tracked: unlocking a lock the caller does not hold is
/// a logic error.
#[derive(Debug)]
pub struct RawSpinLock {
    state: AtomicI32,
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSpinLock {
    /// Create an unlocked lock.
    pub fn new() -> Self {
        Self {
            state: AtomicI32::new(UNLOCKED),
        }
    }

    /// Spin until the lock is acquired.
    pub fn lock(&self) {
        loop {
            if self.try_lock() {
                return;
            }
            while self.state.load(Ordering::Relaxed) != UNLOCKED {
                pause();
            }
        }
    }

    /// Single acquisition attempt.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Spin for at most `budget` polls; returns `true` if acquired.
    /// A budget of `0` is treated as `1`.
    pub fn try_lock_spin(&self, budget: u32) -> bool {
        let mut remaining = budget.max(1);
        loop {
            if self.try_lock() {
                return true;
            }
            remaining -= 1;
            if remaining == 0 {
                return false;
            }
            pause();
        }
    }

    /// Release the lock.
    #[inline]
    pub fn unlock(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }

    /// `true` if some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != UNLOCKED
    }
}

/// A value protected by a [`RawSpinLock`].
pub struct SpinLock<T> {
    raw: RawSpinLock,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `raw`; a guard only exists
// while the lock is held, so at most one thread touches `T` at a time.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Wrap `value` in an unlocked spin lock.
    pub fn new(value: T) -> Self {
        Self {
            raw: RawSpinLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Spin until the lock is acquired.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.raw.lock();
        SpinLockGuard { lock: self }
    }

    /// Single acquisition attempt.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.raw.try_lock().then_some(SpinLockGuard { lock: self })
    }

    /// Bounded acquisition; see [`RawSpinLock::try_lock_spin`].
    pub fn try_lock_spin(&self, budget: u32) -> Option<SpinLockGuard<'_, T>> {
        self.raw
            .try_lock_spin(budget)
            .then_some(SpinLockGuard { lock: self })
    }

    /// Mutable access without locking; `&mut self` proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: `&mut self` rules out any live guard.
        cell_mut!(self.value)
    }

    /// Consume the lock and return the protected value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.raw.is_locked())
            .finish_non_exhaustive()
    }
}

/// RAII guard for [`SpinLock`]; unlocks on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the lock.
        cell_ref!(self.lock.value)
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the lock and `&mut self` is unique.
        cell_mut!(self.lock.value)
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
