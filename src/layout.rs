//! The heap layout manager.
//!
//! Given a raw byte region handed back by the backing allocator, this module
//! computes the split between the block area (where objects live) and the
//! metadata area (packed block states), so that every block that fits below
//! `metadata_start` has exactly one metadata slot.

use crate::constants::{BLOCKS_IN_META_BYTE, BYTES_IN_BLOCK};
use crate::metadata::MetaView;
use crate::Address;

/// The computed placement of the block area and metadata area within a byte
/// region `[heap_start, heap_end)`.
#[derive(Debug, Clone, Copy)]
pub struct HeapLayout {
    pub heap_start: Address,
    pub heap_end: Address,
    pub meta_start: Address,
    pub end_block: usize,
}

impl HeapLayout {
    /// Computes the layout for a region `[heap_start, heap_end)`.
    ///
    /// `metadata_bytes` is the smallest integer `m` such that
    /// `m * blocks_per_byte * bytes_per_block + m >= total_bytes`, i.e. the
    /// smallest metadata allocation that still leaves enough state bits for
    /// every block it makes room for. Solving
    /// `m * (K + 1) >= total_bytes` where `K = blocks_per_byte * bytes_per_block`
    /// for the smallest such `m` gives `m = ceil(total_bytes / (K + 1))`,
    /// computed here with integer arithmetic as `(total_bytes + k) / (k + 1)`.
    pub fn compute(heap_start: Address, heap_end: Address) -> HeapLayout {
        debug_assert!(heap_end > heap_start);
        let total_bytes = heap_end.get_extent(heap_start);
        let k = BLOCKS_IN_META_BYTE * BYTES_IN_BLOCK;
        let metadata_bytes = (total_bytes + k) / (k + 1);
        let meta_start = heap_end - metadata_bytes;
        let end_block = meta_start.get_extent(heap_start) / BYTES_IN_BLOCK;

        debug_assert!(
            meta_start >= heap_start + end_block * BYTES_IN_BLOCK,
            "metadata region must not overlap the block region"
        );
        debug_assert!(
            end_block * BLOCKS_IN_META_BYTE <= metadata_bytes * BLOCKS_IN_META_BYTE,
            "metadata region must have a slot for every block"
        );

        HeapLayout {
            heap_start,
            heap_end,
            meta_start,
            end_block,
        }
    }

    /// A fresh, all-`Free` metadata view sized for this layout.
    pub fn zeroed_metadata(&self) -> MetaView {
        MetaView::zeroed(self.end_block)
    }

    /// `true` if `addr` lies within the scannable block region, i.e. it could
    /// plausibly be a conservative pointer into this heap. The metadata
    /// region is intentionally excluded from the scanning range.
    pub fn in_block_region(&self, addr: Address) -> bool {
        addr >= self.heap_start && addr < self.meta_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BYTES_IN_BLOCK;

    #[test]
    fn every_block_gets_a_metadata_slot() {
        // A handful of region sizes, including ones that don't divide evenly.
        for total in [256usize, 1024, 4096, 100_003] {
            let layout = HeapLayout::compute(Address::ZERO, Address::from_usize(total));
            let meta = layout.zeroed_metadata();
            assert!(meta.capacity() >= layout.end_block);
            assert!(layout.meta_start.as_usize() >= layout.end_block * BYTES_IN_BLOCK);
        }
    }

    #[test]
    fn scenario_layout_eight_blocks() {
        // bytesPerBlock = 32 (W=4, 8-byte words): a region sized to
        // comfortably hold 8 blocks plus metadata.
        let layout = HeapLayout::compute(Address::ZERO, Address::from_usize(300));
        assert!(layout.end_block >= 8);
    }
}
