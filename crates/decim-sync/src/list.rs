//! Singly linked lock-free list over a fixed node table.

use std::fmt;

use decim_atomic::Atomic32;

use crate::error::SyncError;
use crate::node::{NodeTable, NONE};

/// Lock-free list whose nodes are the indices of a fixed table.
///
/// Each node carries a value of type `T`, set at construction. Linking
/// and unlinking never allocate; any number of threads may `add`,
/// `remove`, and traverse concurrently, provided each node is added and
/// removed by one thread at a time.
pub struct AtomicList<T> {
    head: Atomic32,
    table: NodeTable<T>,
}

impl<T> AtomicList<T> {
    /// List with one (initially unlinked) node per value.
    pub fn new(values: impl IntoIterator<Item = T>) -> Result<Self, SyncError> {
        Ok(Self {
            head: Atomic32::new(NONE),
            table: NodeTable::new(values)?,
        })
    }

    /// Number of nodes in the table, linked or not.
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

    /// Push node `index` onto the front.
    pub fn add(&self, index: usize) -> Result<(), SyncError> {
        self.table.push_front(&self.head, index, |_| {})
    }

    /// Unlink node `index`.
    pub fn remove(&self, index: usize) -> Result<(), SyncError> {
        self.table.remove(&self.head, index, |_| {})
    }

    /// First linked node.
    pub fn first(&self) -> Option<usize> {
        self.table.first(&self.head)
    }

    /// Node after `index`, or `None` at the end or if `index` was removed.
    pub fn next(&self, index: usize) -> Option<usize> {
        self.table.next(index)
    }

    /// Traverse from the front.
    ///
    /// Under concurrent removal a traversal may end early at a node that
    /// was just deleted; at a quiescent point it visits every linked node.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.table, self.first())
    }
}

impl<T> fmt::Debug for AtomicList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicList")
            .field("capacity", &self.capacity())
            .field("first", &self.first())
            .finish_non_exhaustive()
    }
}

/// Front-to-back traversal of node indices.
pub struct Iter<'a, T> {
    table: &'a NodeTable<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(table: &'a NodeTable<T>, cursor: Option<usize>) -> Self {
        Self { table, cursor }
    }
}

impl<T> Iterator for Iter<'_, T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let at = self.cursor?;
        self.cursor = self.table.next(at);
        Some(at)
    }
}
