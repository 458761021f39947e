//! Packed two-bit-per-block metadata.
//!
//! A strongly-typed wrapper around raw shift/mask byte arithmetic: all other
//! code consumes [`BlockState`] through the four operations below and never
//! touches a bit pattern directly.
//!
//! Encoding: the state of block `b` lives in bit positions
//! `(b % 4) * 2 .. (b % 4) * 2 + 2` of byte `b / 4` (low-index block in the
//! least-significant bits).

use crate::block::{BlockIndex, BlockState};
use crate::constants::BLOCKS_IN_META_BYTE;

/// A view over a byte-packed metadata region.
///
/// `MetaView` owns the metadata bytes directly when backed by an in-process
/// `Vec`/boxed slice (as in the unit tests), and is reconstructed over the
/// live metadata region of the heap on every layout recomputation -- see
/// [`crate::layout::HeapLayout`].
pub struct MetaView {
    bytes: Box<[u8]>,
}

const BITS_PER_STATE: u32 = 2;

impl MetaView {
    /// Wraps an existing, already-zeroed (or previously populated) byte
    /// buffer as a metadata view.
    pub fn new(bytes: Box<[u8]>) -> Self {
        MetaView { bytes }
    }

    /// Creates a fresh, all-`Free` metadata view with enough bytes for
    /// `num_blocks` blocks.
    pub fn zeroed(num_blocks: usize) -> Self {
        let byte_len = num_blocks.div_ceil(BLOCKS_IN_META_BYTE);
        MetaView::new(vec![0u8; byte_len].into_boxed_slice())
    }

    fn locate(&self, b: BlockIndex) -> (usize, u32) {
        let byte_index = b / BLOCKS_IN_META_BYTE;
        let shift = ((b % BLOCKS_IN_META_BYTE) as u32) * BITS_PER_STATE;
        debug_assert!(
            byte_index < self.bytes.len(),
            "block {b} has no metadata slot (region holds {} bytes)",
            self.bytes.len()
        );
        (byte_index, shift)
    }

    /// Reads the state of block `b`.
    pub fn state(&self, b: BlockIndex) -> BlockState {
        let (byte_index, shift) = self.locate(b);
        let bits = (self.bytes[byte_index] >> shift) & 0b11;
        BlockState::from_bits(bits)
    }

    /// Bitwise-ORs `state`'s bits into block `b`'s slot.
    ///
    /// This is the only metadata mutator used by the allocator (`Free ->
    /// Head`/`Free -> Tail`) and the marker (`Head -> Mark`). OR-upgrading is
    /// correct because every legal target's pattern is a superset of its
    /// source's.
    pub fn set_state(&mut self, b: BlockIndex, state: BlockState) {
        let (byte_index, shift) = self.locate(b);
        self.bytes[byte_index] |= state.bits() << shift;
    }

    /// Unconditionally clears block `b`'s two bits, returning it to `Free`.
    pub fn mark_free(&mut self, b: BlockIndex) {
        let (byte_index, shift) = self.locate(b);
        self.bytes[byte_index] &= !(0b11 << shift);
    }

    /// Clears only the high bit of block `b`'s slot, demoting `Mark` (`11`)
    /// to `Head` (`01`).
    ///
    /// # Panics
    /// In debug builds, panics if `b` is not currently `Mark`.
    pub fn unmark(&mut self, b: BlockIndex) {
        debug_assert_eq!(self.state(b), BlockState::Mark, "unmark on a non-Mark block");
        let (byte_index, shift) = self.locate(b);
        self.bytes[byte_index] &= !(0b10 << shift);
    }

    /// The number of blocks this view has a metadata slot for.
    pub fn capacity(&self) -> usize {
        self.bytes.len() * BLOCKS_IN_META_BYTE
    }

    /// Borrows the raw backing bytes, e.g. to relocate them on heap growth.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies `prefix` into the start of this view's bytes.
    ///
    /// Used when the heap grows: the byte holding block `b`'s state is
    /// `b / 4` regardless of heap size, so copying a smaller metadata
    /// region's bytes as a prefix of a larger one preserves every existing
    /// block's state exactly, leaving the newly added blocks `Free`.
    pub fn overwrite_prefix(&mut self, prefix: &[u8]) {
        debug_assert!(prefix.len() <= self.bytes.len());
        self.bytes[..prefix.len()].copy_from_slice(prefix);
    }
}
