//! Multi-threaded and backing-allocator integration tests for `ChunkPool`.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use decim_arena::{ArenaError, ChunkPool, PoolConfig};
use decim_test_utils::{init_test_logging, run_threads, CountingBacking, FailingBacking};

fn panic_on_exhaustion(err: &ArenaError) -> ! {
    panic!("fatal: {err}")
}

#[test]
fn threads_never_share_a_chunk() {
    init_test_logging();
    let pool = ChunkPool::new(&PoolConfig::new(32, 64)).unwrap();
    let (tx, rx) = unbounded::<usize>();

    run_threads(8, |worker| {
        let mut held = Vec::new();
        for round in 0..500 {
            let c = pool.allocate();
            // Stamp the chunk so overlapping hand-outs would corrupt it.
            unsafe { c.as_ptr().cast::<usize>().write(worker) };
            held.push(c);
            if round % 3 == 0 {
                let victim = held.swap_remove(0);
                assert_eq!(unsafe { victim.as_ptr().cast::<usize>().read() }, worker);
                unsafe { pool.release(victim) };
            }
        }
        for c in &held {
            assert_eq!(unsafe { c.as_ptr().cast::<usize>().read() }, worker);
            tx.send(c.as_ptr() as usize).unwrap();
        }
    });
    drop(tx);

    let live: Vec<usize> = rx.iter().collect();
    let distinct: HashSet<usize> = live.iter().copied().collect();
    assert_eq!(live.len(), distinct.len());
    assert_eq!(pool.use_count(), live.len());
    assert!(live.len() <= pool.block_count() * 64);
}

#[test]
fn concurrent_churn_returns_to_zero() {
    let pool = ChunkPool::new(&PoolConfig::new(48, 16).with_alignment(64)).unwrap();
    run_threads(6, |_| {
        for _ in 0..200 {
            let batch: Vec<NonNull<u8>> = (0..10).map(|_| pool.allocate()).collect();
            for c in batch {
                assert_eq!(c.as_ptr() as usize % 64, 0);
                unsafe { pool.release(c) };
            }
        }
    });
    let stats = pool.stats();
    assert_eq!(stats.used_chunks, 0);
    assert_eq!(stats.free_chunks, stats.blocks * 16);
    // At most 60 chunks are ever live at once.
    assert!(stats.blocks <= 4, "grew to {} blocks", stats.blocks);
}

#[test]
fn blocks_go_back_to_the_backing_allocator() {
    let backing = Arc::new(CountingBacking::new());
    let mut pool =
        ChunkPool::with_backing(&PoolConfig::new(16, 8), Arc::clone(&backing)).unwrap();
    for _ in 0..33 {
        pool.allocate();
    }
    assert_eq!(backing.allocs(), 5);
    assert_eq!(backing.live_bytes(), 5 * pool.layout().alloc_bytes());

    pool.free_all();
    assert_eq!(backing.frees(), 5);
    assert_eq!(backing.live_bytes(), 0);

    pool.allocate();
    drop(pool);
    assert_eq!(backing.allocs(), 6);
    assert_eq!(backing.outstanding(), 0);
}

#[test]
fn padded_blocks_return_the_original_pointer() {
    let backing = Arc::new(CountingBacking::new());
    let pool = ChunkPool::with_backing(
        &PoolConfig::new(8, 4).with_alignment(512),
        Arc::clone(&backing),
    )
    .unwrap();
    for _ in 0..9 {
        assert_eq!(pool.allocate().as_ptr() as usize % 512, 0);
    }
    drop(pool);
    assert_eq!(backing.allocs(), 3);
    assert_eq!(backing.outstanding(), 0);
    assert_eq!(backing.live_bytes(), 0);
}

#[test]
fn exhaustion_runs_the_fatal_hook_before_touching_state() {
    let pool = ChunkPool::with_backing(&PoolConfig::new(16, 4), FailingBacking::new(1))
        .unwrap()
        .with_fatal_hook(panic_on_exhaustion);
    for _ in 0..4 {
        pool.allocate();
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| pool.allocate()));
    let payload = result.expect_err("fifth allocation must hit the hook");
    let msg = payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(msg.contains("backing allocator failed"), "{msg}");

    // Lock released, counters unchanged.
    let stats = pool.stats();
    assert_eq!(stats.blocks, 1);
    assert_eq!(stats.used_chunks, 4);
    assert_eq!(stats.free_chunks, 0);
}

#[test]
fn bulk_scan_sees_every_live_chunk_once() {
    let pool = ChunkPool::new(&PoolConfig::new(64, 32)).unwrap();
    let (tx, rx) = unbounded::<usize>();
    run_threads(4, |_| {
        let mut mine = Vec::new();
        for i in 0..100 {
            let c = pool.allocate();
            if i % 4 == 0 {
                unsafe { pool.release(c) };
            } else {
                mine.push(c);
            }
        }
        for c in mine {
            tx.send(c.as_ptr() as usize).unwrap();
        }
    });
    drop(tx);
    let expected: HashSet<usize> = rx.iter().collect();

    let mut seen = Vec::new();
    let _ = pool.for_each_allocated(|c| {
        seen.push(c.as_ptr() as usize);
        std::ops::ControlFlow::Continue(())
    });
    assert_eq!(seen.len(), expected.len());
    assert_eq!(seen.into_iter().collect::<HashSet<_>>(), expected);
}
