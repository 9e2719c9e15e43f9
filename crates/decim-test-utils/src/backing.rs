//! Instrumented backing allocators.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use decim_arena::{BackingAllocator, HeapBacking};

/// Heap backing that counts calls and outstanding bytes.
///
/// Share it with a pool through `Arc<CountingBacking>` and inspect the
/// counters afterwards.
#[derive(Debug, Default)]
pub struct CountingBacking {
    allocs: AtomicUsize,
    frees: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl CountingBacking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful `alloc` calls.
    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::SeqCst)
    }

    /// `free` calls.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    /// Bytes handed out and not yet returned.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Allocations not yet freed.
    pub fn outstanding(&self) -> usize {
        self.allocs() - self.frees()
    }
}

impl BackingAllocator for CountingBacking {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = HeapBacking.alloc(size)?;
        self.allocs.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_add(size, Ordering::SeqCst);
        Some(ptr)
    }

    #[allow(unsafe_code)]
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_sub(size, Ordering::SeqCst);
        // SAFETY: `ptr` came from `HeapBacking.alloc(size)` in `alloc`.
        unsafe { HeapBacking.free(ptr, size) }
    }
}

/// Heap backing that succeeds `budget` times, then returns `None`.
#[derive(Debug)]
pub struct FailingBacking {
    remaining: AtomicUsize,
}

impl FailingBacking {
    pub fn new(budget: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(budget),
        }
    }
}

impl BackingAllocator for FailingBacking {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()?;
        HeapBacking.alloc(size)
    }

    #[allow(unsafe_code)]
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: every pointer we hand out comes from `HeapBacking`.
        unsafe { HeapBacking.free(ptr, size) }
    }
}
