//! Size constants shared across the heap implementation.

use static_assertions::const_assert;

/// log2 of the number of bytes in a machine word.
#[cfg(target_pointer_width = "64")]
pub const LOG_BYTES_IN_WORD: u8 = 3;
#[cfg(target_pointer_width = "32")]
pub const LOG_BYTES_IN_WORD: u8 = 2;

/// The number of bytes in a machine word.
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;

/// The number of machine words per block. Design-fixed at 4: large enough that
/// per-block bookkeeping overhead is small, small enough that internal
/// fragmentation within the last block of an object stays bounded.
pub const WORDS_IN_BLOCK: usize = 4;

/// The number of bytes in a block.
pub const BYTES_IN_BLOCK: usize = WORDS_IN_BLOCK * BYTES_IN_WORD;

/// The number of block-state slots packed into a single metadata byte (two
/// bits per slot).
pub const BLOCKS_IN_META_BYTE: usize = 4;

/// Default capacity of the mark engine's bounded explicit stack, in entries.
pub const DEFAULT_MARK_STACK_SIZE: usize = 4;

/// Default fraction of the heap that must remain free immediately after a
/// collection, below which the allocator proactively grows the heap.
pub const DEFAULT_HEADROOM_NUMERATOR: usize = 1;
pub const DEFAULT_HEADROOM_DENOMINATOR: usize = 3;

/// Default initial heap size: 128 MiB, as given in the external interface.
pub const DEFAULT_HEAP_SIZE: usize = 128 * 1024 * 1024;

const_assert!(WORDS_IN_BLOCK >= 1);
const_assert!(BLOCKS_IN_META_BYTE == 4);
