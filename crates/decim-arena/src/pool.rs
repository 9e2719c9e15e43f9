//! The fixed-size chunk pool.
//!
//! # Structure
//!
//! ```text
//! ChunkPool
//! ├── PoolLayout (immutable geometry)
//! ├── Box<dyn BackingAllocator>
//! └── SpinLock<PoolState>
//!     ├── blocks: Vec<BlockRecord>   index == tree index
//!     ├── tree: BlockTree            base address → block index
//!     └── free list                  intrusive, threaded through free chunks
//! ```
//!
//! Free chunks store a [`FreeNode`] in their first bytes; allocated chunks
//! carry no metadata at all. The owning block of a chunk is recovered by
//! a floor lookup in the block tree.
//!
//! Blocks are acquired lazily when the free list runs dry and are only
//! returned to the backing allocator by [`ChunkPool::free_all`] or drop.

use std::fmt;
use std::ops::ControlFlow;
use std::ptr::NonNull;

use decim_atomic::SpinLock;
use fixedbitset::FixedBitSet;
use tracing::{debug, trace};

use crate::backing::{acquire_block, release_block, BackingAllocator, HeapBacking};
use crate::config::{PoolConfig, PoolLayout};
use crate::error::ArenaError;
use crate::fatal::{abort_on_exhaustion, FatalHook};
use crate::tree::BlockTree;

/// Free-list link stored in the first bytes of every free chunk.
#[repr(C)]
pub(crate) struct FreeNode {
    next: Option<NonNull<FreeNode>>,
}

#[derive(Debug)]
struct BlockRecord {
    base: NonNull<u8>,
    free: usize,
}

struct PoolState {
    blocks: Vec<BlockRecord>,
    tree: BlockTree,
    free_head: Option<NonNull<FreeNode>>,
    free_count: usize,
}

// SAFETY: the raw pointers in `PoolState` address blocks owned by the
// pool; they are only dereferenced under the pool lock or through
// `&mut ChunkPool`.
unsafe impl Send for PoolState {}

impl PoolState {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            tree: BlockTree::new(),
            free_head: None,
            free_count: 0,
        }
    }

    /// Block index and slot of `addr`, or `None` if no block holds it.
    fn locate(&self, layout: &PoolLayout, addr: usize) -> Option<(usize, usize)> {
        let index = self.tree.resolve(addr)?;
        let offset = addr - self.blocks[index].base.as_ptr() as usize;
        if offset >= layout.block_bytes() {
            return None;
        }
        Some((index, offset / layout.chunk_size()))
    }
}

/// Point-in-time counters for a [`ChunkPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Blocks obtained from the backing allocator.
    pub blocks: usize,
    /// Chunks currently handed out.
    pub used_chunks: usize,
    /// Chunks sitting on the free list.
    pub free_chunks: usize,
    /// Rounded chunk size in bytes.
    pub chunk_size: usize,
    /// Bytes requested from the backing allocator across all blocks.
    pub reserved_bytes: usize,
    /// Keep-free watermark.
    pub keep_free: usize,
}

/// A thread-safe pool of equally sized chunks.
///
/// Every operation except [`free_all`](Self::free_all) takes `&self` and
/// serializes on a short spin lock. Chunk addresses are stable for the
/// lifetime of the pool.
pub struct ChunkPool {
    layout: PoolLayout,
    backing: Box<dyn BackingAllocator>,
    fatal: FatalHook,
    state: SpinLock<PoolState>,
}

impl ChunkPool {
    /// Pool backed by the zero-filling global heap.
    pub fn new(config: &PoolConfig) -> Result<Self, ArenaError> {
        Self::with_backing(config, HeapBacking)
    }

    /// Pool drawing its blocks from `backing`.
    ///
    /// No memory is requested until the first [`allocate`](Self::allocate).
    pub fn with_backing(
        config: &PoolConfig,
        backing: impl BackingAllocator + 'static,
    ) -> Result<Self, ArenaError> {
        let layout = config.validate()?;
        Ok(Self {
            layout,
            backing: Box::new(backing),
            fatal: abort_on_exhaustion,
            state: SpinLock::new(PoolState::new()),
        })
    }

    /// Replace the hook run when the backing allocator fails.
    pub fn with_fatal_hook(mut self, hook: FatalHook) -> Self {
        self.fatal = hook;
        self
    }

    /// Block geometry.
    pub fn layout(&self) -> &PoolLayout {
        &self.layout
    }

    /// Rounded chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.layout.chunk_size()
    }

    /// Hand out one chunk, growing the pool by a block if none are free.
    ///
    /// The returned memory is aligned to `layout().alignment()` and is
    /// valid for `chunk_size()` bytes until passed back to
    /// [`release`](Self::release) or the pool is emptied. Its contents
    /// are unspecified.
    ///
    /// If the backing allocator fails, the fatal hook runs and this call
    /// does not return.
    pub fn allocate(&self) -> NonNull<u8> {
        let mut state = self.state.lock();
        let node = match state.free_head {
            Some(node) => node,
            None => match self.grow(&mut state) {
                Ok(node) => node,
                Err(err) => {
                    drop(state);
                    (self.fatal)(&err)
                }
            },
        };

        // SAFETY: `node` is on the free list, so it points at a free chunk
        // whose first bytes hold a `FreeNode` written by this pool.
        state.free_head = unsafe { (*node.as_ptr()).next };
        state.free_count -= 1;

        let addr = node.as_ptr() as usize;
        let owner = state.locate(&self.layout, addr);
        debug_assert!(owner.is_some(), "free chunk {addr:#x} has no owning block");
        if let Some((index, _)) = owner {
            state.blocks[index].free -= 1;
        }
        node.cast()
    }

    /// Return a chunk to the pool's free list.
    ///
    /// The chunk is kept for reuse; the pool never shrinks here.
    ///
    /// # Safety
    ///
    /// `chunk` must have been returned by [`allocate`](Self::allocate) on
    /// this pool, must not have been released since, and must not be used
    /// afterwards.
    pub unsafe fn release(&self, chunk: NonNull<u8>) {
        let mut state = self.state.lock();
        let addr = chunk.as_ptr() as usize;
        let owner = state.locate(&self.layout, addr);
        debug_assert!(
            owner.is_some_and(|(index, slot)| {
                state.blocks[index].base.as_ptr() as usize + slot * self.layout.chunk_size()
                    == addr
            }),
            "released pointer {addr:#x} is not a chunk of this pool"
        );
        let Some((index, _)) = owner else {
            return;
        };
        state.blocks[index].free += 1;
        state.free_count += 1;

        let node = chunk.cast::<FreeNode>();
        // SAFETY: the caller hands the chunk back to us; it is at least
        // `FreeNode`-sized and -aligned by construction of the layout.
        unsafe {
            node.as_ptr().write(FreeNode {
                next: state.free_head,
            });
        }
        state.free_head = Some(node);
    }

    /// Release every block to the backing allocator and reset the pool.
    ///
    /// All chunks handed out so far become dangling. The pool stays usable
    /// and grows again on the next [`allocate`](Self::allocate).
    pub fn free_all(&mut self) {
        let Self {
            layout,
            backing,
            state,
            ..
        } = self;
        let state = state.get_mut();
        let blocks = state.blocks.len();
        for block in state.blocks.drain(..) {
            // SAFETY: every recorded block came from `acquire_block` with
            // this backing allocator and layout, and is released once.
            unsafe { release_block(backing.as_ref(), layout, block.base) };
        }
        state.tree.clear();
        state.free_head = None;
        state.free_count = 0;
        if blocks > 0 {
            debug!(
                blocks,
                bytes = blocks * layout.alloc_bytes(),
                "chunk pool released all blocks"
            );
        }
    }

    /// Chunks currently handed out.
    pub fn use_count(&self) -> usize {
        let state = self.state.lock();
        state.blocks.len() * self.layout.chunks_per_block() - state.free_count
    }

    /// Chunks on the free list.
    pub fn free_count(&self) -> usize {
        self.state.lock().free_count
    }

    /// Blocks obtained from the backing allocator.
    pub fn block_count(&self) -> usize {
        self.state.lock().blocks.len()
    }

    /// Keep-free watermark (`keep_free_count + chunks_per_block`).
    pub fn keep_free(&self) -> usize {
        self.layout.keep_free()
    }

    /// Snapshot of the pool counters, taken under one lock acquisition.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let blocks = state.blocks.len();
        PoolStats {
            blocks,
            used_chunks: blocks * self.layout.chunks_per_block() - state.free_count,
            free_chunks: state.free_count,
            chunk_size: self.layout.chunk_size(),
            reserved_bytes: blocks * self.layout.alloc_bytes(),
            keep_free: self.layout.keep_free(),
        }
    }

    /// Free chunks left in block `index`, or `None` if there is no such block.
    pub fn block_free_count(&self, index: usize) -> Option<usize> {
        self.state.lock().blocks.get(index).map(|b| b.free)
    }

    /// Call `f` once per allocated chunk, in block order.
    ///
    /// Marks free chunks in a per-block bitmap by walking the free list,
    /// then visits the unmarked slots. The pool lock is held throughout:
    /// `f` must not call back into this pool. Returns early with
    /// `ControlFlow::Break` if `f` does.
    pub fn for_each_allocated<F>(&self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(NonNull<u8>) -> ControlFlow<()>,
    {
        let state = self.state.lock();
        let per_block = self.layout.chunks_per_block();
        let mut free_maps: Vec<FixedBitSet> = (0..state.blocks.len())
            .map(|_| FixedBitSet::with_capacity(per_block))
            .collect();

        let mut cursor = state.free_head;
        while let Some(node) = cursor {
            if let Some((index, slot)) = state.locate(&self.layout, node.as_ptr() as usize) {
                free_maps[index].insert(slot);
            }
            // SAFETY: nodes on the free list hold a valid `FreeNode`.
            cursor = unsafe { (*node.as_ptr()).next };
        }
        trace!(
            blocks = state.blocks.len(),
            free = state.free_count,
            "scanning allocated chunks"
        );

        for (block, free_map) in state.blocks.iter().zip(&free_maps) {
            for slot in 0..per_block {
                if free_map.contains(slot) {
                    continue;
                }
                // SAFETY: `slot < chunks_per_block`, so the offset stays
                // inside the block's `block_bytes`.
                let chunk = unsafe { block.base.add(slot * self.layout.chunk_size()) };
                f(chunk)?;
            }
        }
        ControlFlow::Continue(())
    }

    /// Grow by one block and push its chunks onto the free list.
    /// Returns the new free-list head. Leaves `state` untouched on error.
    fn grow(&self, state: &mut PoolState) -> Result<NonNull<FreeNode>, ArenaError> {
        let base = acquire_block(self.backing.as_ref(), &self.layout).ok_or(
            ArenaError::BackingExhausted {
                requested: self.layout.alloc_bytes(),
                blocks: state.blocks.len(),
            },
        )?;

        let chunk_size = self.layout.chunk_size();
        let count = self.layout.chunks_per_block();
        let index = state.tree.insert(base.as_ptr() as usize);
        debug_assert_eq!(index, state.blocks.len());
        state.blocks.push(BlockRecord { base, free: count });

        let mut next = state.free_head;
        for slot in (0..count).rev() {
            // SAFETY: `slot * chunk_size < block_bytes`; every chunk is
            // aligned for a `FreeNode` and the block is exclusively ours.
            let node = unsafe {
                let node = base.add(slot * chunk_size).cast::<FreeNode>();
                node.as_ptr().write(FreeNode { next });
                node
            };
            next = Some(node);
        }
        state.free_count += count;
        let head = base.cast::<FreeNode>();
        state.free_head = Some(head);

        debug!(
            block = index,
            bytes = self.layout.alloc_bytes(),
            chunks = count,
            chunk_size,
            "chunk pool grew"
        );
        Ok(head)
    }
}

impl Drop for ChunkPool {
    fn drop(&mut self) {
        self.free_all();
    }
}

impl fmt::Debug for ChunkPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPool")
            .field("layout", &self.layout)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(chunk: usize, per_block: usize) -> ChunkPool {
        ChunkPool::new(&PoolConfig::new(chunk, per_block)).unwrap()
    }

    #[test]
    fn lazy_until_first_allocation() {
        let p = pool(32, 8);
        assert_eq!(p.block_count(), 0);
        assert_eq!(p.use_count(), 0);
        let c = p.allocate();
        assert_eq!(p.block_count(), 1);
        assert_eq!(p.use_count(), 1);
        assert_eq!(p.free_count(), 7);
        unsafe { p.release(c) };
        assert_eq!(p.use_count(), 0);
        assert_eq!(p.free_count(), 8);
    }

    #[test]
    fn released_chunk_is_reused_before_growth() {
        let p = pool(32, 4);
        let held: Vec<_> = (0..4).map(|_| p.allocate()).collect();
        assert_eq!(p.block_count(), 1);
        unsafe { p.release(held[2]) };
        let again = p.allocate();
        assert_eq!(again, held[2]);
        assert_eq!(p.block_count(), 1);
        let grown = p.allocate();
        assert_eq!(p.block_count(), 2);
        assert!(!held.contains(&grown));
    }

    #[test]
    fn chunks_are_distinct_and_writable() {
        let p = pool(24, 16);
        let mut seen = HashSet::new();
        for i in 0..100u8 {
            let c = p.allocate();
            unsafe { c.as_ptr().write_bytes(i, p.chunk_size()) };
            assert!(seen.insert(c.as_ptr() as usize));
        }
        assert_eq!(p.block_count(), 7);
        assert_eq!(p.use_count(), 100);
    }

    #[test]
    fn block_counters_track_their_own_chunks() {
        let p = pool(16, 2);
        let a = p.allocate();
        let b = p.allocate();
        let c = p.allocate();
        assert_eq!(p.block_free_count(0), Some(0));
        assert_eq!(p.block_free_count(1), Some(1));
        unsafe { p.release(a) };
        assert_eq!(p.block_free_count(0), Some(1));
        unsafe {
            p.release(b);
            p.release(c);
        }
        assert_eq!(p.block_free_count(0), Some(2));
        assert_eq!(p.block_free_count(1), Some(2));
        assert_eq!(p.block_free_count(2), None);
    }

    #[test]
    fn alignment_is_honoured() {
        for align in [16usize, 32, 64, 256, 4096] {
            let p = ChunkPool::new(&PoolConfig::new(40, 5).with_alignment(align)).unwrap();
            for _ in 0..12 {
                let c = p.allocate();
                assert_eq!(c.as_ptr() as usize % align, 0, "align {align}");
            }
        }
    }

    #[test]
    fn free_all_resets_and_pool_is_reusable() {
        let mut p = pool(64, 8);
        for _ in 0..20 {
            p.allocate();
        }
        assert_eq!(p.block_count(), 3);
        p.free_all();
        assert_eq!(p.stats().blocks, 0);
        assert_eq!(p.use_count(), 0);
        assert_eq!(p.free_count(), 0);
        let _ = p.allocate();
        assert_eq!(p.block_count(), 1);
    }

    #[test]
    fn for_each_allocated_skips_free_chunks() {
        let p = pool(32, 4);
        let chunks: Vec<_> = (0..10).map(|_| p.allocate()).collect();
        for &c in chunks.iter().step_by(3) {
            unsafe { p.release(c) };
        }
        let mut visited = HashSet::new();
        let flow = p.for_each_allocated(|c| {
            visited.insert(c);
            ControlFlow::Continue(())
        });
        assert_eq!(flow, ControlFlow::Continue(()));
        let expected: HashSet<_> = chunks
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 3 != 0)
            .map(|(_, c)| *c)
            .collect();
        // Blocks hold 12 slots; the two never handed out are free too.
        assert_eq!(visited, expected);
    }

    #[test]
    fn for_each_allocated_breaks_early() {
        let p = pool(32, 4);
        for _ in 0..8 {
            p.allocate();
        }
        let mut calls = 0;
        let flow = p.for_each_allocated(|_| {
            calls += 1;
            if calls == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn stats_are_consistent() {
        let p = ChunkPool::new(&PoolConfig::new(48, 10).with_keep_free(5)).unwrap();
        let _a = p.allocate();
        let _b = p.allocate();
        let s = p.stats();
        assert_eq!(s.blocks, 1);
        assert_eq!(s.used_chunks, 2);
        assert_eq!(s.free_chunks, 8);
        assert_eq!(s.chunk_size, 48);
        assert_eq!(s.keep_free, 15);
        assert_eq!(s.reserved_bytes, p.layout().alloc_bytes());
        assert_eq!(p.keep_free(), 15);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert_eq!(
            ChunkPool::new(&PoolConfig::new(8, 0)).err(),
            Some(ArenaError::ZeroChunksPerBlock)
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn live_set_is_bounded_and_reuse_precedes_growth(
                ops in prop::collection::vec(any::<bool>(), 1..400),
                per_block in 1usize..16,
            ) {
                let p = pool(16, per_block);
                let mut live: Vec<NonNull<u8>> = Vec::new();
                for alloc in ops {
                    if alloc || live.is_empty() {
                        let blocks_before = p.block_count();
                        let free_before = p.free_count();
                        let c = p.allocate();
                        prop_assert!(!live.contains(&c));
                        if free_before > 0 {
                            prop_assert_eq!(p.block_count(), blocks_before);
                        }
                        live.push(c);
                    } else {
                        let c = live.swap_remove(live.len() / 2);
                        unsafe { p.release(c) };
                    }
                    prop_assert!(live.len() <= per_block * p.block_count());
                    prop_assert_eq!(p.use_count(), live.len());
                }
            }
        }
    }
}
