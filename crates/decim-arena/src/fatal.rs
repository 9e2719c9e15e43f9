//! Handling of unrecoverable backing-allocation failure.
//!
//! A pool that cannot grow has no way to hand out a chunk, and callers
//! of [`ChunkPool::allocate`](crate::ChunkPool::allocate) rely on getting
//! one. The failure is therefore routed to a hook that must not return.

use tracing::error;

use crate::error::ArenaError;

/// Called when a pool's backing allocator fails. Must diverge.
///
/// The pool has not been modified when the hook runs.
pub type FatalHook = fn(&ArenaError) -> !;

/// Default [`FatalHook`]: log the error, then abort the process.
pub fn abort_on_exhaustion(err: &ArenaError) -> ! {
    error!(%err, "chunk pool cannot grow, aborting");
    std::process::abort()
}
