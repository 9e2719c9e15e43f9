//! Atomic primitives for the Decim allocator and synchronization crates.
//!
//! Every higher layer builds on the operation set defined here rather
//! than on `std::sync::atomic` directly:
//!
//! ```text
//! sync        loom/std shim (atomics, UnsafeCell, spin hint, yield)
//! ├── atomic  Atomic32 / Atomic64 / AtomicL with fused test variants
//! ├── spin    pause(), yield_now(), Backoff
//! ├── spinlock RawSpinLock, SpinLock<T> + guard
//! └── rwlock  AtomicRwLock (reader count / negative writer sentinel)
//! ```
//!
//! Spin waits accept an optional iteration budget and report a timeout
//! as a plain return value; nothing here blocks on an OS primitive.
//!
//! Build with `RUSTFLAGS="--cfg loom"` to swap the shim over to loom's
//! model-checked types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod sync;

pub mod atomic;
pub mod rwlock;
pub mod spin;
pub mod spinlock;


pub use atomic::{Atomic32, AtomicL, IntL};
#[cfg(target_has_atomic = "64")]
pub use atomic::Atomic64;
pub use rwlock::AtomicRwLock;
pub use spin::{pause, yield_now, Backoff};
pub use spinlock::{RawSpinLock, SpinLock, SpinLockGuard};

// Compile-time assertions: the lock types are shared across threads.
#[cfg(not(loom))]
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Atomic32>();
    assert_send_sync::<AtomicRwLock>();
    assert_send_sync::<RawSpinLock>();
    assert_send_sync::<SpinLock<Vec<u8>>>();
};
