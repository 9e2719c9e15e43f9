//! Synchronization primitive shim.
//!
//! Under `cfg(loom)` re-exports from `loom`, otherwise from `std`. Every
//! atomic access in the Decim crates is routed through this module; a
//! direct `std::sync::atomic` import would bypass loom's scheduler and
//! silently weaken the model tests.
#![allow(unused_imports)]

/// Atomic integer types, orderings, and fences.
pub mod atomic {
    #[cfg(loom)]
    pub use loom::sync::atomic::{
        fence, AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering,
    };

    #[cfg(not(loom))]
    pub use std::sync::atomic::{
        fence, AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering,
    };
}

/// Interior mutability cells.
///
/// loom's `UnsafeCell` hands out pointers through closures instead of
/// `get()`; the crate-internal `cell_ref!` / `cell_mut!` macros paper
/// over the difference.
pub mod cell {
    #[cfg(loom)]
    pub use loom::cell::UnsafeCell;

    #[cfg(not(loom))]
    pub use std::cell::UnsafeCell;
}

/// CPU spin hints.
pub mod hint {
    #[cfg(loom)]
    pub use loom::hint::spin_loop;

    #[cfg(not(loom))]
    pub use std::hint::spin_loop;
}

/// Thread scheduling.
pub mod thread {
    #[cfg(loom)]
    pub use loom::thread::yield_now;

    #[cfg(not(loom))]
    pub use std::thread::yield_now;
}

/// Shared ownership.
#[cfg(loom)]
pub use loom::sync::Arc;

/// Shared ownership.
#[cfg(not(loom))]
pub use std::sync::Arc;

/// Borrow the contents of a shim `UnsafeCell` as `&T`.
///
/// # Safety
///
/// The caller must guarantee no concurrent mutable access for the
/// lifetime of the returned reference.
macro_rules! cell_ref {
    ($cell:expr) => {{
        #[cfg(not(loom))]
        {
            unsafe { &*$cell.get() }
        }
        #[cfg(loom)]
        {
            unsafe { $cell.with(|p| &*p) }
        }
    }};
}

/// Borrow the contents of a shim `UnsafeCell` as `&mut T`.
///
/// # Safety
///
/// The caller must guarantee exclusive access for the lifetime of the
/// returned reference.
macro_rules! cell_mut {
    ($cell:expr) => {{
        #[cfg(not(loom))]
        {
            unsafe { &mut *$cell.get() }
        }
        #[cfg(loom)]
        {
            unsafe { $cell.with_mut(|p| &mut *p) }
        }
    }};
}
pub(crate) use {cell_mut, cell_ref};
