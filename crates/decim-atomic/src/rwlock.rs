//! Reader/writer spin lock on a single signed cell.
//!
//! The cell counts active readers. A writer claims the lock by swapping
//! `0` for [`AtomicRwLock::WRITE`], a large negative value, so any reader
//! that increments while a writer holds the lock sees a negative result
//! and backs its increment out again.
//!
//! The lock carries no data; callers pair it with whatever it guards.

use crate::atomic::Atomic32;
use crate::spin::pause;

/// Reader/writer spin lock.
#[derive(Debug, Default)]
pub struct AtomicRwLock {
    state: Atomic32,
}

impl AtomicRwLock {
    /// Value of the cell while a writer holds the lock.
    pub const WRITE: i32 = -0x1000_0000;

    /// Create an unlocked lock.
    pub fn new() -> Self {
        Self {
            state: Atomic32::new(0),
        }
    }

    /// Single read-acquisition attempt.
    pub fn attempt_read(&self) -> bool {
        if self.state.add_test_negative(1) {
            self.state.dec();
            return false;
        }
        true
    }

    /// Single write-acquisition attempt.
    pub fn attempt_write(&self) -> bool {
        self.state.cmp_replace(0, Self::WRITE)
    }

    /// Spin until read access is granted.
    pub fn spin_read(&self) {
        loop {
            while self.state.read() < 0 {
                pause();
            }
            if !self.state.add_test_negative(1) {
                return;
            }
            self.state.dec();
        }
    }

    /// Spin until write access is granted.
    pub fn spin_write(&self) {
        loop {
            while self.state.read() != 0 {
                pause();
            }
            if self.state.cmp_replace(0, Self::WRITE) {
                return;
            }
        }
    }

    /// Bounded [`spin_read`](Self::spin_read). A budget of `0` is treated as `1`.
    pub fn try_read(&self, budget: u32) -> bool {
        let mut remaining = budget.max(1);
        loop {
            if self.state.read() < 0 {
                pause();
            } else if self.attempt_read() {
                return true;
            }
            remaining -= 1;
            if remaining == 0 {
                return false;
            }
        }
    }

    /// Bounded [`spin_write`](Self::spin_write). A budget of `0` is treated as `1`.
    pub fn try_write(&self, budget: u32) -> bool {
        let mut remaining = budget.max(1);
        loop {
            if self.state.read() != 0 {
                pause();
            } else if self.attempt_write() {
                return true;
            }
            remaining -= 1;
            if remaining == 0 {
                return false;
            }
        }
    }

    /// Release read access.
    pub fn done_read(&self) {
        self.state.dec();
    }

    /// Release write access.
    pub fn done_write(&self) {
        self.state.sub(Self::WRITE);
    }

    /// Number of readers currently holding the lock (`0` while write-locked).
    pub fn readers(&self) -> u32 {
        u32::try_from(self.state.read()).unwrap_or(0)
    }

    /// `true` while a writer holds the lock.
    pub fn is_write_locked(&self) -> bool {
        self.state.read() < 0
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    #[test]
    fn readers_share() {
        let l = AtomicRwLock::new();
        assert!(l.attempt_read());
        assert!(l.attempt_read());
        assert_eq!(l.readers(), 2);
        assert!(!l.attempt_write());
        l.done_read();
        l.done_read();
        assert!(l.attempt_write());
    }

    #[test]
    fn writer_excludes_readers() {
        let l = AtomicRwLock::new();
        l.spin_write();
        assert!(l.is_write_locked());
        assert!(!l.attempt_read());
        assert!(!l.try_read(16));
        assert!(!l.try_write(16));
        assert_eq!(l.readers(), 0);
        l.done_write();
        assert!(!l.is_write_locked());
        assert!(l.try_read(0));
        l.done_read();
    }

    #[test]
    fn failed_read_attempt_leaves_state_untouched() {
        let l = AtomicRwLock::new();
        l.spin_write();
        for _ in 0..100 {
            assert!(!l.attempt_read());
        }
        l.done_write();
        assert_eq!(l.readers(), 0);
        assert!(l.attempt_write());
    }

    #[test]
    fn writers_serialize_under_contention() {
        let l = AtomicRwLock::new();
        let inside = AtomicU64::new(0);
        let total = AtomicU64::new(0);
        thread::scope(|s| {
            for i in 0..6 {
                let (l, inside, total) = (&l, &inside, &total);
                s.spawn(move || {
                    for _ in 0..2_000 {
                        if i % 2 == 0 {
                            l.spin_write();
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            total.fetch_add(1, Ordering::Relaxed);
                            inside.fetch_sub(1, Ordering::SeqCst);
                            l.done_write();
                        } else {
                            l.spin_read();
                            assert_eq!(inside.load(Ordering::SeqCst), 0);
                            l.done_read();
                        }
                    }
                });
            }
        });
        assert_eq!(total.load(Ordering::Relaxed), 6_000);
    }
}
