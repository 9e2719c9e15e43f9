//! Decim: the parallel substrate of a triangle-mesh decimator.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Decim sub-crates. Worker threads allocate collapse records from
//! shared chunk pools, score candidate collapses, and coordinate staged
//! passes with lock-free lists and barriers.
//!
//! # Quick start
//!
//! ```rust
//! use decim::prelude::*;
//!
//! // 64-byte records, 512 to a block.
//! let pool = ChunkPool::new(&PoolConfig::new(64, 512)).unwrap();
//! let record = pool.allocate();
//! assert_eq!(pool.use_count(), 1);
//! // SAFETY: `record` came from `pool` and is released once.
//! unsafe { pool.release(record) };
//!
//! // Score moving the apex of an equilateral triangle onto its base.
//! let eval = PenaltyEvaluator::<f64>::new(&PenaltyConfig::new(0.5)).unwrap();
//! let apex = [0.5, 3f64.sqrt() / 2.0, 0.0];
//! let p = eval.evaluate(&[0.5, 0.01, 0.0], &apex, &[0.0; 3], &[1.0, 0.0, 0.0]);
//! assert!(!p.deny && p.penalty > 0.0);
//!
//! // Work list shared between threads.
//! let list = AtomicList::new(0..4u32).unwrap();
//! list.add(2).unwrap();
//! assert_eq!(list.iter().collect::<Vec<_>>(), vec![2]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`atomic`] | `decim-atomic` | Atomic cells, spin budgets, spinlocks, reader/writer lock |
//! | [`arena`] | `decim-arena` | Fixed-size chunk pools and backing allocators |
//! | [`sync`] | `decim-sync` | Lock-free lists, barrier trees, striped counters |
//! | [`geom`] | `decim-geom` | Edge-collapse penalty kernels and fans |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Atomic cells and spin primitives (`decim-atomic`).
///
/// [`atomic::Atomic32`] carries the full read-modify-write and spin-wait
/// vocabulary; [`atomic::SpinLock`] and [`atomic::AtomicRwLock`] build on
/// it.
pub use decim_atomic as atomic;

/// Fixed-size chunk pools (`decim-arena`).
///
/// [`arena::ChunkPool`] hands out chunks carved from blocks obtained
/// through a pluggable [`arena::BackingAllocator`].
pub use decim_arena as arena;

/// Lock-free coordination (`decim-sync`).
///
/// [`sync::AtomicList`], [`sync::DualList`], [`sync::BarrierTree`] and
/// [`sync::StripedCounter`].
pub use decim_sync as sync;

/// Collapse scoring (`decim-geom`).
///
/// [`geom::edge_collapse_penalty`] and its vector counterparts, resolved
/// once by a [`geom::PenaltyEvaluator`].
pub use decim_geom as geom;

/// Common imports for typical Decim usage.
///
/// ```rust
/// use decim::prelude::*;
/// ```
pub mod prelude {
    // Atomics
    pub use decim_atomic::{Atomic32, AtomicRwLock, Backoff, SpinLock};

    // Pools
    pub use decim_arena::{ArenaError, BackingAllocator, ChunkPool, HeapBacking, PoolConfig};

    // Lists and barriers
    pub use decim_sync::{AtomicList, BarrierTree, DualList, StripedCounter, SyncError};

    // Penalty
    pub use decim_geom::{
        collapse_weight, edge_collapse_penalty, simd_available, Fan, GeomError, KernelPath,
        Penalty, PenaltyConfig, PenaltyEvaluator, Point,
    };
}
