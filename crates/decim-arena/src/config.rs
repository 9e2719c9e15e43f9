//! Pool configuration and the derived block layout.

use std::mem;

use crate::backing::BACKING_MIN_ALIGN;
use crate::error::ArenaError;
use crate::pool::FreeNode;

/// Configuration for a [`ChunkPool`](crate::ChunkPool).
///
/// Plain data; call [`validate`](Self::validate) (or hand it to
/// `ChunkPool::new`) to obtain the immutable [`PoolLayout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Requested bytes per chunk. Rounded up to hold a free-list node and
    /// to a multiple of the alignment.
    pub chunk_size: usize,

    /// Chunks carved out of each backing block.
    pub chunks_per_block: usize,

    /// Extra free chunks the pool is willing to retain beyond one block.
    ///
    /// Default: 0. The resulting watermark is reported by
    /// [`ChunkPool::keep_free`](crate::ChunkPool::keep_free).
    pub keep_free_count: usize,

    /// Required alignment of every chunk. Must be a power of two.
    ///
    /// Default: 16. Alignments above 16 are served by over-allocating the
    /// backing block and recording the padding in an [`AlignHeader`](crate::backing::AlignHeader).
    pub alignment: usize,
}

impl PoolConfig {
    /// Default number of chunks per block.
    pub const DEFAULT_CHUNKS_PER_BLOCK: usize = 256;

    /// Default keep-free count.
    pub const DEFAULT_KEEP_FREE_COUNT: usize = 0;

    /// Default chunk alignment.
    pub const DEFAULT_ALIGNMENT: usize = 16;

    /// Config for `chunk_size`-byte chunks, `chunks_per_block` to a block.
    pub fn new(chunk_size: usize, chunks_per_block: usize) -> Self {
        Self {
            chunk_size,
            chunks_per_block,
            keep_free_count: Self::DEFAULT_KEEP_FREE_COUNT,
            alignment: Self::DEFAULT_ALIGNMENT,
        }
    }

    /// Config whose chunks can hold one `T`.
    pub fn for_type<T>(chunks_per_block: usize) -> Self {
        Self {
            chunk_size: mem::size_of::<T>().max(1),
            chunks_per_block,
            keep_free_count: Self::DEFAULT_KEEP_FREE_COUNT,
            alignment: mem::align_of::<T>(),
        }
    }

    /// Set the keep-free count.
    pub fn with_keep_free(mut self, keep_free_count: usize) -> Self {
        self.keep_free_count = keep_free_count;
        self
    }

    /// Set the chunk alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check the parameters and compute the block layout.
    pub fn validate(&self) -> Result<PoolLayout, ArenaError> {
        if self.chunk_size == 0 {
            return Err(ArenaError::ZeroChunkSize);
        }
        if self.chunks_per_block == 0 {
            return Err(ArenaError::ZeroChunksPerBlock);
        }
        if !self.alignment.is_power_of_two() {
            return Err(ArenaError::InvalidAlignment {
                alignment: self.alignment,
            });
        }

        let overflow = || ArenaError::LayoutOverflow {
            chunk_size: self.chunk_size,
            chunks_per_block: self.chunks_per_block,
        };

        // Free chunks hold a `FreeNode`, so chunks must fit and align one.
        let alignment = self.alignment.max(mem::align_of::<FreeNode>());
        let chunk_size = self
            .chunk_size
            .max(mem::size_of::<FreeNode>())
            .checked_next_multiple_of(alignment)
            .ok_or_else(overflow)?;
        let block_bytes = chunk_size
            .checked_mul(self.chunks_per_block)
            .ok_or_else(overflow)?;

        let padded = alignment > BACKING_MIN_ALIGN;
        let alloc_bytes = if padded {
            block_bytes
                .checked_add(alignment)
                .and_then(|n| n.checked_add(mem::size_of::<crate::backing::AlignHeader>()))
                .ok_or_else(overflow)?
        } else {
            block_bytes
        };
        if alloc_bytes > isize::MAX as usize {
            return Err(overflow());
        }

        Ok(PoolLayout {
            chunk_size,
            chunks_per_block: self.chunks_per_block,
            alignment,
            block_bytes,
            alloc_bytes,
            padded,
            keep_free: self.keep_free_count.saturating_add(self.chunks_per_block),
        })
    }
}

/// Immutable block geometry derived from a [`PoolConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolLayout {
    chunk_size: usize,
    chunks_per_block: usize,
    alignment: usize,
    block_bytes: usize,
    alloc_bytes: usize,
    padded: bool,
    keep_free: usize,
}

impl PoolLayout {
    /// Rounded chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunks per block.
    pub fn chunks_per_block(&self) -> usize {
        self.chunks_per_block
    }

    /// Effective chunk alignment (never below a free-list node's).
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Usable bytes per block: `chunk_size * chunks_per_block`.
    pub fn block_bytes(&self) -> usize {
        self.block_bytes
    }

    /// Bytes requested from the backing allocator per block, including
    /// alignment slack and header when [`is_padded`](Self::is_padded).
    pub fn alloc_bytes(&self) -> usize {
        self.alloc_bytes
    }

    /// `true` when blocks are over-allocated to meet the alignment.
    pub fn is_padded(&self) -> bool {
        self.padded
    }

    /// Keep-free watermark: `keep_free_count + chunks_per_block`.
    pub fn keep_free(&self) -> usize {
        self.keep_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_chunks_round_up_to_a_free_node() {
        let layout = PoolConfig::new(1, 8).with_alignment(1).validate().unwrap();
        assert_eq!(layout.chunk_size(), mem::size_of::<FreeNode>());
        assert_eq!(layout.alignment(), mem::align_of::<FreeNode>());
        assert_eq!(layout.block_bytes(), 8 * layout.chunk_size());
        assert!(!layout.is_padded());
    }

    #[test]
    fn chunk_size_rounds_to_alignment() {
        let layout = PoolConfig::new(40, 4).validate().unwrap();
        assert_eq!(layout.chunk_size(), 48);
        assert_eq!(layout.block_bytes(), 192);
        assert_eq!(layout.alloc_bytes(), 192);
    }

    #[test]
    fn wide_alignment_pads_the_block() {
        let layout = PoolConfig::new(24, 4).with_alignment(64).validate().unwrap();
        assert_eq!(layout.chunk_size(), 64);
        assert!(layout.is_padded());
        assert!(layout.alloc_bytes() >= layout.block_bytes() + 64);
    }

    #[test]
    fn keep_free_adds_one_block() {
        let layout = PoolConfig::new(16, 32).with_keep_free(10).validate().unwrap();
        assert_eq!(layout.keep_free(), 42);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(PoolConfig::new(0, 4).validate(), Err(ArenaError::ZeroChunkSize));
        assert_eq!(
            PoolConfig::new(8, 0).validate(),
            Err(ArenaError::ZeroChunksPerBlock)
        );
        assert_eq!(
            PoolConfig::new(8, 4).with_alignment(24).validate(),
            Err(ArenaError::InvalidAlignment { alignment: 24 })
        );
        assert!(matches!(
            PoolConfig::new(usize::MAX / 2, 4).validate(),
            Err(ArenaError::LayoutOverflow { .. })
        ));
    }

    #[test]
    fn for_type_matches_record() {
        #[repr(align(32))]
        struct Wide([u8; 40]);
        let cfg = PoolConfig::for_type::<Wide>(16);
        assert_eq!(cfg.chunk_size, 64);
        assert_eq!(cfg.alignment, 32);
        let layout = cfg.validate().unwrap();
        assert_eq!(layout.chunk_size(), 64);
    }
}
