//! Double-ended lock-free list.
//!
//! Same node protocol as [`AtomicList`](crate::AtomicList) plus a `last`
//! word naming the slot at the tail (the head slot when empty), so
//! producers can append at the back while consumers work the front.
//!
//! `last` only changes while its current slot is locked busy, which is
//! what lets `add_last` trust the slot it just locked.

use std::fmt;

use decim_atomic::{pause, Atomic32};

use crate::error::SyncError;
use crate::list::Iter;
use crate::node::{NodeTable, BUSY, HEAD_SLOT, NONE};

/// Lock-free list with O(1) insertion at both ends.
pub struct DualList<T> {
    first: Atomic32,
    last: Atomic32,
    table: NodeTable<T>,
}

impl<T> DualList<T> {
    /// List with one (initially unlinked) node per value.
    pub fn new(values: impl IntoIterator<Item = T>) -> Result<Self, SyncError> {
        Ok(Self {
            first: Atomic32::new(NONE),
            last: Atomic32::new(HEAD_SLOT),
            table: NodeTable::new(values)?,
        })
    }

    /// Number of nodes in the table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Value stored in node `index`.
    pub fn value(&self, index: usize) -> Option<&T> {
        self.table.value(index)
    }

    /// `true` if node `index` is currently linked.
    pub fn contains(&self, index: usize) -> bool {
        self.table.is_linked(index)
    }

    /// Link node `index` at the front.
    pub fn add_first(&self, index: usize) -> Result<(), SyncError> {
        self.table
            .push_front(&self.first, index, |slot| self.last.write(slot))
    }

    /// Link node `index` at the back.
    pub fn add_last(&self, index: usize) -> Result<(), SyncError> {
        self.table.claim_for_append(index)?;
        let tail = loop {
            let l = self.last.read();
            if self.table.slot(&self.first, l).cmp_replace(NONE, BUSY) {
                if self.last.read() == l {
                    break l;
                }
                // Locked a slot that stopped being the tail; put it back.
                self.table.slot(&self.first, l).write(NONE);
            }
            pause();
        };
        self.table
            .link_after(&self.first, tail, index, |slot| self.last.write(slot));
        Ok(())
    }

    /// Unlink node `index`.
    pub fn remove(&self, index: usize) -> Result<(), SyncError> {
        self.table
            .remove(&self.first, index, |pred| self.last.write(pred))
    }

    /// First linked node.
    pub fn first(&self) -> Option<usize> {
        self.table.first(&self.first)
    }

    /// Node after `index`, or `None` at the end or if `index` was removed.
    pub fn next(&self, index: usize) -> Option<usize> {
        self.table.next(index)
    }

    /// Traverse from the front.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.table, self.first())
    }
}

impl<T> fmt::Debug for DualList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualList")
            .field("capacity", &self.capacity())
            .field("first", &self.first())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    fn list(n: usize) -> DualList<()> {
        DualList::new(std::iter::repeat_n((), n)).unwrap()
    }

    #[test]
    fn both_ends() {
        let l = list(6);
        l.add_last(0).unwrap();
        l.add_last(1).unwrap();
        l.add_first(2).unwrap();
        l.add_last(3).unwrap();
        l.add_first(4).unwrap();
        assert_eq!(l.iter().collect::<Vec<_>>(), vec![4, 2, 0, 1, 3]);
    }

    #[test]
    fn removing_the_tail_moves_last() {
        let l = list(4);
        l.add_last(0).unwrap();
        l.add_last(1).unwrap();
        l.remove(1).unwrap();
        l.add_last(2).unwrap();
        assert_eq!(l.iter().collect::<Vec<_>>(), vec![0, 2]);
        l.remove(0).unwrap();
        l.remove(2).unwrap();
        assert_eq!(l.first(), None);
        l.add_last(3).unwrap();
        l.add_first(1).unwrap();
        assert_eq!(l.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn add_first_on_empty_sets_last() {
        let l = list(3);
        l.add_first(0).unwrap();
        l.add_last(1).unwrap();
        assert_eq!(l.iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::VecDeque;

        proptest! {
            #[test]
            fn matches_a_deque(ops in prop::collection::vec((0u8..3, 0usize..12), 1..200)) {
                let l = list(12);
                let mut model: VecDeque<usize> = VecDeque::new();
                for (op, i) in ops {
                    let linked = model.contains(&i);
                    match op {
                        0 => {
                            prop_assert_eq!(l.add_first(i).is_ok(), !linked);
                            if !linked { model.push_front(i); }
                        }
                        1 => {
                            prop_assert_eq!(l.add_last(i).is_ok(), !linked);
                            if !linked { model.push_back(i); }
                        }
                        _ => {
                            prop_assert_eq!(l.remove(i).is_ok(), linked);
                            model.retain(|&x| x != i);
                        }
                    }
                    prop_assert_eq!(l.iter().collect::<Vec<_>>(), model.iter().copied().collect::<Vec<_>>());
                }
            }
        }
    }
}
