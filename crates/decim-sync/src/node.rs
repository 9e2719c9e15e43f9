//! Node table and link protocol shared by both list flavours.
//!
//! Nodes live in a fixed table owned by the list and are addressed by
//! index. Link words are [`Atomic32`] cells with this encoding:
//!
//! | value | meaning |
//! |-------|---------|
//! | `0` | no node (end of list) |
//! | `1` | busy: a writer owns this slot |
//! | `i + 2` | node `i` |
//!
//! A node's `prev` names the *slot* that points at it: `0` is the list's
//! head slot, `i + 1` is node `i`'s `next`. That gives O(1) unlink.
//!
//! Writers lock a slot by swapping its current value for busy and unlock
//! it by storing the new value. Locks are always taken left to right
//! (predecessor slot, then the node's own `next`), so concurrent removals
//! of neighbours cannot deadlock. Readers spin while they see busy.

use decim_atomic::{pause, Atomic32};

use crate::error::SyncError;

pub(crate) const NONE: i32 = 0;
pub(crate) const BUSY: i32 = 1;
pub(crate) const HEAD_SLOT: i32 = 0;

const VALID: i32 = 0;
const DELETED: i32 = 1;

/// Largest node table the encoding supports.
pub const MAX_NODES: usize = (i32::MAX - 2) as usize;

fn link(index: usize) -> i32 {
    index as i32 + 2
}

fn slot_of(index: usize) -> i32 {
    index as i32 + 1
}

pub(crate) fn decode(value: i32) -> Option<usize> {
    (value >= 2).then(|| (value - 2) as usize)
}

struct ListNode<T> {
    prev: Atomic32,
    next: Atomic32,
    status: Atomic32,
    value: T,
}

pub(crate) struct NodeTable<T> {
    nodes: Box<[ListNode<T>]>,
}

impl<T> NodeTable<T> {
    pub(crate) fn new(values: impl IntoIterator<Item = T>) -> Result<Self, SyncError> {
        let nodes: Box<[ListNode<T>]> = values
            .into_iter()
            .map(|value| ListNode {
                prev: Atomic32::new(HEAD_SLOT),
                next: Atomic32::new(NONE),
                status: Atomic32::new(DELETED),
                value,
            })
            .collect();
        if nodes.len() > MAX_NODES {
            return Err(SyncError::CapacityTooLarge {
                requested: nodes.len(),
                max: MAX_NODES,
            });
        }
        Ok(Self { nodes })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn value(&self, index: usize) -> Option<&T> {
        self.nodes.get(index).map(|n| &n.value)
    }

    pub(crate) fn is_linked(&self, index: usize) -> bool {
        self.nodes
            .get(index)
            .is_some_and(|n| n.status.read() == VALID)
    }

    fn node(&self, index: usize) -> Result<&ListNode<T>, SyncError> {
        self.nodes.get(index).ok_or(SyncError::NodeOutOfRange {
            index,
            capacity: self.nodes.len(),
        })
    }

    /// The cell behind a slot id.
    pub(crate) fn slot<'a>(&'a self, head: &'a Atomic32, slot: i32) -> &'a Atomic32 {
        if slot == HEAD_SLOT {
            head
        } else {
            &self.nodes[(slot - 1) as usize].next
        }
    }

    /// Current value of the head slot, waiting out writers.
    pub(crate) fn first(&self, head: &Atomic32) -> Option<usize> {
        loop {
            let v = head.read();
            if v != BUSY {
                return decode(v);
            }
            pause();
        }
    }

    /// Successor of `index`; `None` at the end or once `index` is deleted.
    pub(crate) fn next(&self, index: usize) -> Option<usize> {
        let node = self.nodes.get(index)?;
        loop {
            let v = node.next.read();
            if node.status.read() == DELETED {
                return None;
            }
            // `v` was read while the node was still live.
            if v != BUSY {
                return decode(v);
            }
            pause();
        }
    }

    /// Mark `index` live so it can be linked. Fails if it already is.
    fn claim(&self, index: usize) -> Result<&ListNode<T>, SyncError> {
        let node = self.node(index)?;
        if !node.status.cmp_replace(DELETED, VALID) {
            return Err(SyncError::AlreadyLinked { index });
        }
        Ok(node)
    }

    /// Splice `index` in front of the node in `head`.
    ///
    /// The new node's `next` stays busy until the old first node's `prev`
    /// points at it, so nobody can unlink that node through a stale
    /// `prev`. `on_empty(slot)` runs, still under that lock, when the list
    /// was empty.
    pub(crate) fn push_front(
        &self,
        head: &Atomic32,
        index: usize,
        on_empty: impl FnOnce(i32),
    ) -> Result<(), SyncError> {
        let node = self.claim(index)?;
        node.next.write(BUSY);
        node.prev.write(HEAD_SLOT);

        let old = loop {
            let h = head.read();
            if h != BUSY && head.cmp_replace(h, link(index)) {
                break h;
            }
            pause();
        };

        match decode(old) {
            Some(old_first) => self.nodes[old_first].prev.write(slot_of(index)),
            None => on_empty(slot_of(index)),
        }
        node.next.write(old);
        Ok(())
    }

    /// Append `index` after the node owning slot `tail`.
    ///
    /// The caller holds `tail` locked (busy); `publish(slot)` runs while
    /// both `tail` and the new node's `next` are locked.
    pub(crate) fn link_after(
        &self,
        head: &Atomic32,
        tail: i32,
        index: usize,
        publish: impl FnOnce(i32),
    ) {
        let node = &self.nodes[index];
        node.next.write(BUSY);
        node.prev.write(tail);
        publish(slot_of(index));
        self.slot(head, tail).write(link(index));
        node.next.write(NONE);
    }

    /// Claim `index` for appending. See [`link_after`](Self::link_after).
    pub(crate) fn claim_for_append(&self, index: usize) -> Result<(), SyncError> {
        self.claim(index).map(|_| ())
    }

    /// Unlink `index`.
    ///
    /// `on_tail(pred_slot)` runs when the node was the last one, while the
    /// predecessor slot and the node's `next` are both still locked.
    pub(crate) fn remove(
        &self,
        head: &Atomic32,
        index: usize,
        on_tail: impl FnOnce(i32),
    ) -> Result<(), SyncError> {
        let node = self.node(index)?;
        if !node.status.cmp_replace(VALID, DELETED) {
            return Err(SyncError::NotLinked { index });
        }

        // Lock the slot that points at us. `prev` may be stale while a
        // neighbour is being spliced in; re-read it until the lock sticks.
        let me = link(index);
        let pred = loop {
            let p = node.prev.read();
            if self.slot(head, p).cmp_replace(me, BUSY) {
                break p;
            }
            pause();
        };

        // Lock our own `next`.
        let succ = loop {
            let n = node.next.read();
            if n != BUSY && node.next.cmp_replace(n, BUSY) {
                break n;
            }
            pause();
        };

        match decode(succ) {
            Some(s) => self.nodes[s].prev.write(pred),
            None => on_tail(pred),
        }
        // Unlock the predecessor past us. Our `next` stays busy.
        self.slot(head, pred).write(succ);
        Ok(())
    }
}
