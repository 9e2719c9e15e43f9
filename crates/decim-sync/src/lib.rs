//! Lock-free lists, barriers, and striped counters for staged parallel
//! passes.
//!
//! Everything here is built from [`decim_atomic`] cells and never takes a
//! lock or allocates after construction:
//!
//! - [`AtomicList`]: singly linked list with O(1) unlink.
//! - [`DualList`]: the same with O(1) append at the back.
//! - [`BarrierTree`]: hierarchical spinning barrier; one waiter per epoch
//!   learns it was last.
//! - [`StripedCounter`]: "fire every N hits" across padded stripes.
//!
//! Lists address nodes by index into a table they own, so a removed node
//! can never be freed out from under a concurrent reader.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod barrier;
pub mod counter;
pub mod dual;
pub mod error;
pub mod list;
mod node;
mod shape;


pub use barrier::{BarrierStats, BarrierTree, BarrierWaiter};
pub use counter::StripedCounter;
pub use dual::DualList;
pub use error::SyncError;
pub use list::AtomicList;
pub use node::MAX_NODES;

// Compile-time assertions: everything here is shared between threads.
#[cfg(not(loom))]
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AtomicList<u64>>();
    assert_send_sync::<DualList<u64>>();
    assert_send_sync::<BarrierTree>();
    assert_send_sync::<StripedCounter>();
};
