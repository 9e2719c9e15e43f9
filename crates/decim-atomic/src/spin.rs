//! Spin-loop helpers shared by the lock and barrier implementations.

use crate::sync::{hint, thread};

/// Hint to the CPU that the caller is in a busy-wait loop.
#[inline]
pub fn pause() {
    hint::spin_loop();
}

/// Give up the rest of the current time slice.
#[inline]
pub fn yield_now() {
    thread::yield_now();
}

/// Bounded spin budget.
///
/// `Backoff` counts polls and reports when the budget is spent, letting
/// callers switch from spinning to yielding. A budget of `0` behaves
/// like a budget of `1`.
#[derive(Debug, Clone)]
pub struct Backoff {
    remaining: u32,
}

impl Backoff {
    /// Create a backoff allowing `budget` polls.
    pub fn new(budget: u32) -> Self {
        Self {
            remaining: budget.max(1),
        }
    }

    /// Consume one poll. Returns `false` once the budget is exhausted,
    /// without pausing.
    #[inline]
    pub fn snooze(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return false;
        }
        pause();
        true
    }

    /// Polls left before the budget runs out.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// `true` once [`snooze`](Self::snooze) has reported exhaustion.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}
