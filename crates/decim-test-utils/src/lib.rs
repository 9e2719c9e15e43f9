//! Test utilities and mock types for Decim development.
//!
//! - [`CountingBacking`] / [`FailingBacking`]: instrumented
//!   [`BackingAllocator`](decim_arena::BackingAllocator)s.
//! - [`fixtures`]: seeded ChaCha RNGs and random penalty inputs.
//! - [`run_threads`]: scoped worker harness for stress tests.
//! - [`init_test_logging`]: route `tracing` output to the test writer.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backing;
pub mod fixtures;

pub use backing::{CountingBacking, FailingBacking};

use tracing::Level;

/// Install a `fmt` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

/// Run `f(worker_index)` on `workers` scoped threads and wait for all.
///
/// Panics in a worker propagate to the caller.
pub fn run_threads<F>(workers: usize, f: F)
where
    F: Fn(usize) + Sync,
{
    std::thread::scope(|s| {
        for id in 0..workers {
            let f = &f;
            s.spawn(move || f(id));
        }
    });
}
