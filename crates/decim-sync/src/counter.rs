//! Striped hit counter.
//!
//! Hits land on one of `stripes` padded leaf counters, each counting down
//! a stage of `stage_size` hits. A leaf that completes a stage resets and
//! counts one hit on its parent; parents count completed children the
//! same way up to the root. The hit that completes the root reports
//! `true`.
//!
//! With hits spread evenly over the stripes the root fires once every
//! `stripes * stage_size` hits.

use std::fmt;

use decim_atomic::Atomic32;
use tracing::debug;

use crate::error::SyncError;
use crate::shape::TreeShape;

#[repr(align(128))]
#[derive(Debug)]
struct CounterNode {
    counter: Atomic32,
    parent: Option<usize>,
    reset: i32,
}

impl CounterNode {
    /// Count one hit. The hit that completes a stage reloads the node in
    /// the same CAS and returns `true`, so the count never goes below 1.
    fn count_down(&self) -> bool {
        loop {
            let current = self.counter.read();
            let (next, fired) = if current <= 1 {
                (self.reset, true)
            } else {
                (current - 1, false)
            };
            if self.counter.cmp_replace(current, next) {
                return fired;
            }
        }
    }
}

/// Contended "fire every N hits" counter with reduced false sharing.
pub struct StripedCounter {
    nodes: Box<[CounterNode]>,
    stripes: usize,
    stage_size: usize,
}

impl StripedCounter {
    /// Children per internal node.
    pub const FANOUT: usize = 4;

    /// Counter with `stripes` leaves of `stage_size` hits each.
    pub fn new(stripes: usize, stage_size: usize) -> Result<Self, SyncError> {
        if stripes == 0 {
            return Err(SyncError::ZeroStripes);
        }
        if stage_size == 0 {
            return Err(SyncError::ZeroStageSize);
        }
        let limit = i32::MAX as usize;
        if stage_size > limit || stripes > limit {
            return Err(SyncError::CapacityTooLarge {
                requested: stage_size.max(stripes),
                max: limit,
            });
        }

        let shape = TreeShape::build(&vec![stage_size as i32; stripes], Self::FANOUT);
        debug!(
            stripes,
            stage_size,
            nodes = shape.len(),
            depth = shape.depth,
            "built striped counter"
        );
        let nodes = shape
            .resets
            .iter()
            .zip(&shape.parents)
            .map(|(&reset, &parent)| CounterNode {
                counter: Atomic32::new(reset),
                parent,
                reset,
            })
            .collect();
        Ok(Self {
            nodes,
            stripes,
            stage_size,
        })
    }

    /// Number of stripes.
    pub fn stripes(&self) -> usize {
        self.stripes
    }

    /// Hits per stripe stage.
    pub fn stage_size(&self) -> usize {
        self.stage_size
    }

    /// Count one hit on stripe `stripe % stripes`.
    ///
    /// Returns `true` if this hit completed the root stage.
    pub fn hit(&self, stripe: usize) -> bool {
        let mut node = stripe % self.stripes;
        loop {
            if !self.nodes[node].count_down() {
                return false;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return true,
            }
        }
    }
}

impl fmt::Debug for StripedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedCounter")
            .field("stripes", &self.stripes)
            .field("stage_size", &self.stage_size)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn rejects_empty_shapes() {
        assert_eq!(StripedCounter::new(0, 4).err(), Some(SyncError::ZeroStripes));
        assert_eq!(StripedCounter::new(4, 0).err(), Some(SyncError::ZeroStageSize));
    }

    #[test]
    fn single_stripe_fires_every_stage() {
        let c = StripedCounter::new(1, 3).unwrap();
        let fired: Vec<bool> = (0..9).map(|_| c.hit(0)).collect();
        assert_eq!(
            fired,
            vec![false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn round_robin_fires_after_all_stripes() {
        let c = StripedCounter::new(16, 5).unwrap();
        let total = 16 * 5;
        for round in 0..3 {
            for i in 0..total {
                let fired = c.hit(i);
                assert_eq!(fired, i == total - 1, "round {round} hit {i}");
            }
        }
    }

    #[test]
    fn concurrent_hits_fire_the_expected_number_of_times() {
        const STRIPES: usize = 4;
        const STAGE: usize = 50;
        const STAGES_PER_THREAD: usize = 40;
        let c = StripedCounter::new(STRIPES, STAGE).unwrap();
        let fired = AtomicUsize::new(0);
        thread::scope(|s| {
            for t in 0..STRIPES {
                let (c, fired) = (&c, &fired);
                s.spawn(move || {
                    for _ in 0..STAGE * STAGES_PER_THREAD {
                        if c.hit(t) {
                            fired.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(fired.load(Ordering::Relaxed), STAGES_PER_THREAD);
    }

    fn shared_stripe(stage: usize, threads: usize, hits_per_thread: usize) {
        let c = StripedCounter::new(1, stage).unwrap();
        let fired = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..threads {
                let (c, fired) = (&c, &fired);
                s.spawn(move || {
                    for _ in 0..hits_per_thread {
                        if c.hit(0) {
                            fired.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        let hits = threads * hits_per_thread;
        assert_eq!(fired.load(Ordering::Relaxed), hits / stage);

        // Every stage completed exactly, so the counter is back at a full
        // stage and keeps firing on schedule.
        for round in 0..10 {
            for i in 0..stage {
                assert_eq!(c.hit(0), i == stage - 1, "round {round} hit {i}");
            }
        }
    }

    #[test]
    fn threads_sharing_a_unit_stripe_never_lose_a_fire() {
        shared_stripe(1, 8, 20_000);
    }

    #[test]
    fn threads_sharing_a_stripe_fire_once_per_stage() {
        shared_stripe(7, 8, 7 * 2_000);
    }
}
