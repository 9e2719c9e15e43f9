//! Hierarchical spinning barrier.
//!
//! Participants are spread over leaf nodes of `child_count` each; leaves
//! report to parents the same way up to a single root. A node's counter
//! counts down arrivals; the last arrival resets it, carries the arrival
//! to the parent, and on the way back flips the node's epoch flag, which
//! releases everyone spinning on that node.
//!
//! Flags and counters sit on separate cache lines so spinners do not
//! hammer the line arrivals are decrementing.

use std::fmt;

use decim_atomic::{yield_now, Atomic32};
use tracing::{debug, trace};

use crate::error::SyncError;
use crate::shape::TreeShape;

/// Cache-line padded cell.
#[repr(align(128))]
#[derive(Debug, Default)]
struct Padded<T>(T);

#[derive(Debug)]
struct BarrierNode {
    flag: Padded<Atomic32>,
    counter: Padded<Atomic32>,
    parent: Option<usize>,
    reset: i32,
}

/// Per-thread barrier statistics, accumulated across waits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarrierStats {
    /// Nodes this thread released as the last arrival.
    pub releases: u32,
    /// Yields taken after the spin budget ran out.
    pub yields: u32,
}

/// A reusable barrier for a fixed set of participants.
pub struct BarrierTree {
    nodes: Box<[BarrierNode]>,
    participants: usize,
    child_count: usize,
}

impl BarrierTree {
    /// Barrier for `participants` threads, `child_count` per node.
    pub fn build(participants: usize, child_count: usize) -> Result<Self, SyncError> {
        if participants == 0 {
            return Err(SyncError::ZeroParticipants);
        }
        if child_count < 2 {
            return Err(SyncError::FanoutTooSmall { child_count });
        }
        let limit = i32::MAX as usize;
        if participants > limit {
            return Err(SyncError::CapacityTooLarge {
                requested: participants,
                max: limit,
            });
        }

        let leaves: Vec<i32> = (0..participants)
            .step_by(child_count)
            .map(|first| (participants - first).min(child_count) as i32)
            .collect();
        let shape = TreeShape::build(&leaves, child_count);
        debug!(
            participants,
            child_count,
            nodes = shape.len(),
            depth = shape.depth,
            "built barrier tree"
        );

        let nodes = shape
            .resets
            .iter()
            .zip(&shape.parents)
            .map(|(&reset, &parent)| BarrierNode {
                flag: Padded(Atomic32::new(0)),
                counter: Padded(Atomic32::new(reset)),
                parent,
                reset,
            })
            .collect();
        Ok(Self {
            nodes,
            participants,
            child_count,
        })
    }

    /// Participants the barrier was built for.
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Handle for participant `index` (`0..participants`).
    pub fn participant(&self, index: usize) -> Result<BarrierWaiter<'_>, SyncError> {
        if index >= self.participants {
            return Err(SyncError::ParticipantOutOfRange {
                participant: index,
                participants: self.participants,
            });
        }
        Ok(BarrierWaiter {
            barrier: self,
            leaf: index / self.child_count,
            stats: BarrierStats::default(),
        })
    }

    /// Arrive at `node` and wait for the epoch to turn over.
    fn wait_node(&self, node: usize, spin: Option<u32>, stats: &mut BarrierStats) -> bool {
        let n = &self.nodes[node];
        let epoch = n.flag.0.read();
        if n.counter.0.dec_test_zero() {
            n.counter.0.write(n.reset);
            stats.releases += 1;
            let last = match n.parent {
                Some(parent) => self.wait_node(parent, spin, stats),
                None => true,
            };
            n.flag.0.write(epoch.wrapping_add(1));
            return last;
        }

        match spin {
            None => n.flag.0.spin_wait_neq(epoch),
            Some(budget) => {
                if n.flag.0.spin_wait_neq_count(epoch, budget) == 0 {
                    trace!(node, budget, "barrier spin budget exhausted, yielding");
                    while n.flag.0.read() == epoch {
                        stats.yields += 1;
                        yield_now();
                    }
                }
            }
        }
        false
    }
}

impl fmt::Debug for BarrierTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierTree")
            .field("participants", &self.participants)
            .field("child_count", &self.child_count)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// One participant's view of a [`BarrierTree`].
#[derive(Debug)]
pub struct BarrierWaiter<'a> {
    barrier: &'a BarrierTree,
    leaf: usize,
    stats: BarrierStats,
}

impl BarrierWaiter<'_> {
    /// Block until every participant has called `wait` for this epoch.
    ///
    /// `spin` only bounds the busy-wait per node: once it is spent the
    /// waiter keeps waiting, polling with `yield_now` in between, and
    /// counts those yields in [`BarrierStats::yields`]. It does not make
    /// `wait` return early. `None` spins indefinitely.
    ///
    /// Returns `true` for exactly one participant per epoch: the one
    /// whose arrival completed it.
    pub fn wait(&mut self, spin: Option<u32>) -> bool {
        self.barrier.wait_node(self.leaf, spin, &mut self.stats)
    }

    /// Statistics accumulated by this waiter.
    pub fn stats(&self) -> BarrierStats {
        self.stats
    }
}
