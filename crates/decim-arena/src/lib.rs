//! Fixed-size chunk pools for Decim.
//!
//! A [`ChunkPool`] hands out equally sized, equally aligned chunks carved
//! from coarse blocks. Blocks come from a pluggable [`BackingAllocator`]
//! and are indexed by base address in an insert-only red-black
//! [`BlockTree`], so any chunk pointer maps back to its block without
//! per-chunk metadata.
//!
//! # Lifecycle
//!
//! ```text
//! PoolConfig ──validate──▶ PoolLayout
//!                              │
//! ChunkPool::new ──────────────┘   (no memory yet)
//!   allocate ─▶ free list empty? ─▶ grow one block ─▶ pop chunk
//!   release  ─▶ push chunk (never shrinks)
//!   free_all / drop ─▶ every block back to the backing allocator
//! ```
//!
//! Backing exhaustion is not recoverable: the pool's [`FatalHook`] runs
//! (by default it logs and aborts). Every other operation is total.
//!
//! This crate contains `unsafe` code; every block carries a `SAFETY:`
//! comment.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backing;
pub mod config;
pub mod error;
pub mod fatal;
pub mod pool;
pub mod tree;

pub use backing::{AlignHeader, BackingAllocator, HeapBacking, BACKING_MIN_ALIGN};
pub use config::{PoolConfig, PoolLayout};
pub use error::ArenaError;
pub use fatal::{abort_on_exhaustion, FatalHook};
pub use pool::{ChunkPool, PoolStats};
pub use tree::BlockTree;

// Compile-time assertion: pools are shared across worker threads.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ChunkPool>();
};
