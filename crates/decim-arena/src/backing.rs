//! Backing allocators that supply whole blocks to a pool.
//!
//! A pool never talks to the global allocator directly. Blocks come from
//! a [`BackingAllocator`]; [`HeapBacking`] (zero-filled global heap) is
//! the default, and embedders can substitute e.g. a node-pinned
//! allocator.
//!
//! Backing allocators only guarantee [`BACKING_MIN_ALIGN`]. Pools that
//! need more over-allocate by `alignment + size_of::<AlignHeader>()`
//! bytes, align the block base inside that region, and store an
//! [`AlignHeader`] in the bytes right before the base so the original
//! pointer can be recovered on release:
//!
//! ```text
//! raw                        base (aligned)
//! │ ..slack.. │ AlignHeader │ chunk 0 │ chunk 1 │ ... │ ..slack.. │
//! └─────────── padding ─────┘
//! ```

use std::alloc::{self, Layout};
use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::config::PoolLayout;

/// Alignment every [`BackingAllocator`] must provide.
pub const BACKING_MIN_ALIGN: usize = 16;

/// Source of raw block memory for a pool.
pub trait BackingAllocator: Send + Sync {
    /// Allocate `size` zero-filled bytes aligned to at least
    /// [`BACKING_MIN_ALIGN`]. `None` signals exhaustion.
    fn alloc(&self, size: usize) -> Option<NonNull<u8>>;

    /// Return memory obtained from [`alloc`](Self::alloc).
    ///
    /// # Safety
    ///
    /// `ptr` must have come from `self.alloc(size)` with the same `size`
    /// and must not have been freed already.
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize);
}

impl fmt::Debug for dyn BackingAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn BackingAllocator")
    }
}

impl<B: BackingAllocator + ?Sized> BackingAllocator for Arc<B> {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).alloc(size)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: forwarded contract.
        unsafe { (**self).free(ptr, size) }
    }
}

/// Zero-filled blocks from the global heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapBacking;

impl BackingAllocator for HeapBacking {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, BACKING_MIN_ALIGN).ok()?;
        // SAFETY: `layout` has non-zero size.
        NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: `alloc` built this exact layout for `ptr`, so it was
        // valid then and is still valid now.
        let layout = unsafe { Layout::from_size_align_unchecked(size, BACKING_MIN_ALIGN) };
        // SAFETY: caller guarantees `ptr` came from `alloc(size)`.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Header stored immediately before the base of an over-aligned block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignHeader {
    padding: usize,
}

impl AlignHeader {
    /// Bytes between the backing allocation and the aligned block base.
    pub fn padding(&self) -> usize {
        self.padding
    }
}

/// Obtain one block from `backing`, aligned per `layout`.
///
/// Returns the aligned base of `layout.block_bytes()` usable bytes.
pub(crate) fn acquire_block(
    backing: &dyn BackingAllocator,
    layout: &PoolLayout,
) -> Option<NonNull<u8>> {
    let raw = backing.alloc(layout.alloc_bytes())?;
    if !layout.is_padded() {
        debug_assert_eq!(raw.as_ptr() as usize % layout.alignment(), 0);
        return Some(raw);
    }

    let header = mem::size_of::<AlignHeader>();
    // SAFETY: `alloc_bytes` includes `header` bytes of slack.
    let start = unsafe { raw.as_ptr().add(header) };
    let offset = start.align_offset(layout.alignment());
    if offset >= layout.alignment() {
        // SAFETY: `raw` came from `backing.alloc(alloc_bytes)`.
        unsafe { backing.free(raw, layout.alloc_bytes()) };
        return None;
    }
    // SAFETY: `header + offset < header + alignment`, and the block
    // still fits because `alloc_bytes = block_bytes + alignment + header`.
    let base = unsafe { start.add(offset) };
    let padding = header + offset;
    // SAFETY: `base - header >= raw`; `base` is aligned to at least
    // `BACKING_MIN_ALIGN`, so `base - header` is aligned for a `usize`.
    unsafe {
        base.sub(header)
            .cast::<AlignHeader>()
            .write(AlignHeader { padding });
    }
    NonNull::new(base)
}

/// Return a block obtained from [`acquire_block`].
///
/// # Safety
///
/// `base` must come from `acquire_block(backing, layout)` with the same
/// backing allocator and layout, and must not have been released.
pub(crate) unsafe fn release_block(
    backing: &dyn BackingAllocator,
    layout: &PoolLayout,
    base: NonNull<u8>,
) {
    if !layout.is_padded() {
        // SAFETY: unpadded blocks are the raw allocation.
        unsafe { backing.free(base, layout.alloc_bytes()) };
        return;
    }
    // SAFETY: `acquire_block` wrote the header right before `base`.
    let header = unsafe { read_header(base) };
    // SAFETY: `padding` is the distance back to the raw allocation.
    let raw = unsafe { base.as_ptr().sub(header.padding) };
    if let Some(raw) = NonNull::new(raw) {
        // SAFETY: `raw` is exactly what `backing.alloc` returned.
        unsafe { backing.free(raw, layout.alloc_bytes()) };
    }
}

/// Read the [`AlignHeader`] stored before an over-aligned block base.
///
/// # Safety
///
/// `base` must be the base of a padded block from [`acquire_block`].
pub(crate) unsafe fn read_header(base: NonNull<u8>) -> AlignHeader {
    // SAFETY: upheld by caller.
    unsafe {
        base.as_ptr()
            .sub(mem::size_of::<AlignHeader>())
            .cast::<AlignHeader>()
            .read()
    }
}
