//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors produced while configuring or growing a chunk pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// Chunk size of zero.
    ZeroChunkSize,
    /// A block must hold at least one chunk.
    ZeroChunksPerBlock,
    /// Alignment is not a power of two.
    InvalidAlignment {
        /// The rejected alignment.
        alignment: usize,
    },
    /// Rounded chunk size times chunk count (plus alignment slack) does
    /// not fit in `usize` / `isize`.
    LayoutOverflow {
        /// Requested chunk size in bytes.
        chunk_size: usize,
        /// Requested chunks per block.
        chunks_per_block: usize,
    },
    /// The backing allocator returned no memory while growing the pool.
    ///
    /// Never returned from a pool method: it is handed to the pool's
    /// fatal hook, which does not return.
    BackingExhausted {
        /// Bytes requested from the backing allocator.
        requested: usize,
        /// Blocks the pool already owned.
        blocks: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroChunkSize => write!(f, "chunk size must be non-zero"),
            Self::ZeroChunksPerBlock => write!(f, "chunks per block must be non-zero"),
            Self::InvalidAlignment { alignment } => {
                write!(f, "alignment {alignment} is not a power of two")
            }
            Self::LayoutOverflow {
                chunk_size,
                chunks_per_block,
            } => {
                write!(
                    f,
                    "block layout overflows: {chunks_per_block} chunks of {chunk_size} bytes"
                )
            }
            Self::BackingExhausted { requested, blocks } => {
                write!(
                    f,
                    "backing allocator failed: requested {requested} bytes with {blocks} blocks live"
                )
            }
        }
    }
}

impl Error for ArenaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_numbers() {
        let e = ArenaError::BackingExhausted {
            requested: 4096,
            blocks: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains('3'));
        assert_eq!(
            ArenaError::InvalidAlignment { alignment: 24 }.to_string(),
            "alignment 24 is not a power of two"
        );
    }
}
