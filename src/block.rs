//! Block address algebra.
//!
//! A block is the fixed-size allocation quantum ([`crate::constants::BYTES_IN_BLOCK`]
//! bytes, four machine words by default). Blocks are addressed by a
//! zero-based index; this module converts between block indices and raw
//! addresses and implements the two object-boundary walks the mark engine
//! relies on: [`find_head`] and [`find_next`].

use crate::constants::BYTES_IN_BLOCK;
use crate::metadata::MetaView;
use crate::Address;

/// The state of a single block, packed as two bits in the metadata region.
///
/// The bit assignment is not arbitrary: every legal upgrade is a bitwise-OR,
/// because each target's pattern is a superset of its source's
/// (`Free` = `00` is a subset of everything; `Head` = `01` is a subset of
/// `Mark` = `11`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockState {
    /// Not part of any allocated object.
    Free = 0b00,
    /// The first block of an allocated object.
    Head = 0b01,
    /// A non-first block of an allocated object.
    Tail = 0b10,
    /// A `Head` block discovered reachable during the current GC cycle.
    Mark = 0b11,
}

impl BlockState {
    pub(crate) const fn from_bits(bits: u8) -> BlockState {
        match bits & 0b11 {
            0b00 => BlockState::Free,
            0b01 => BlockState::Head,
            0b10 => BlockState::Tail,
            0b11 => BlockState::Mark,
            _ => unreachable!(),
        }
    }

    pub(crate) const fn bits(self) -> u8 {
        self as u8
    }
}

/// A zero-based block index.
pub type BlockIndex = usize;

/// Converts a block index to its starting address.
pub fn addr_of(heap_start: Address, index: BlockIndex) -> Address {
    heap_start + index * BYTES_IN_BLOCK
}

/// Converts an address inside the block area to its block index.
///
/// # Panics
/// Panics in debug builds if `addr` is not word-aligned to a block boundary
/// relative to `heap_start`, or lies outside `[heap_start, meta_start)`.
pub fn block_of(heap_start: Address, meta_start: Address, addr: Address) -> BlockIndex {
    debug_assert!(
        addr >= heap_start && addr < meta_start,
        "address {addr} outside block region [{heap_start}, {meta_start})"
    );
    addr.get_extent(heap_start) / BYTES_IN_BLOCK
}

/// Walks backwards from `b` while it names a `Tail` block, returning the
/// `Head` (or `Mark`) block that starts the object containing `b`.
///
/// This is the only reason `Tail` is a state distinct from `Free`: it lets a
/// conservative interior pointer resolve to its containing object in
/// amortized `O(object size)`, without an auxiliary object table.
///
/// # Panics
/// In debug builds, panics if it walks off the start of the heap without
/// finding a `Head`/`Mark` block -- this indicates a `Tail` with no `Head`,
/// an invariant violation.
pub fn find_head(meta: &MetaView, mut b: BlockIndex) -> BlockIndex {
    while meta.state(b) == BlockState::Tail {
        debug_assert!(b > 0, "Tail block at index 0 violates the heap invariant");
        b -= 1;
    }
    debug_assert!(matches!(meta.state(b), BlockState::Head | BlockState::Mark));
    b
}

/// Returns the index of the first block after the object starting at `b`.
///
/// `b` must name a `Head` or `Mark` block: the walk advances past `b` itself,
/// then past every consecutive `Tail` block that follows, stopping at
/// `end_block` if reached. Calling this on a `Tail` block is a precondition
/// violation -- the mark engine never does so -- and in debug builds trips an
/// assertion rather than silently returning `b` unchanged.
pub fn find_next(meta: &MetaView, b: BlockIndex, end_block: BlockIndex) -> BlockIndex {
    debug_assert!(
        matches!(meta.state(b), BlockState::Head | BlockState::Mark),
        "find_next called on a block that is not a Head/Mark block"
    );
    let mut next = b + 1;
    while next < end_block && meta.state(next) == BlockState::Tail {
        next += 1;
    }
    next
}
