//! The conservative mark engine.
//!
//! A block is reachable if its address is discoverable by word-scanning the
//! roots, or by word-scanning the body of another reachable object. Neither
//! scan consults any type information: every word-aligned word in range is a
//! *candidate* pointer (see [`looks_like_pointer`]), and false positives are
//! tolerated as floating garbage rather than rejected.

use crate::block::{self, BlockIndex, BlockState};
use crate::layout::HeapLayout;
use crate::metadata::MetaView;
use crate::roots::{RootRange, RootSink};
use crate::Address;
use std::mem::size_of;

/// `true` if `w`, read as a raw word, could plausibly be a pointer into this
/// heap's scannable block region.
fn looks_like_pointer(layout: &HeapLayout, w: usize) -> bool {
    let addr = Address::from_usize(w);
    layout.in_block_region(addr)
}

/// Drives one full mark phase: scans the roots, then transitively scans
/// every object reached from them, using a bounded explicit stack that never
/// reallocates mid-cycle.
///
/// Grounded in the same shape as a worklist-driven transitive closure (push
/// newly discovered nodes, pop and expand until empty), generalized here to
/// the bounded-capacity, overflow-and-rescan variant the block metadata
/// makes possible without a heap-allocated frontier.
pub(crate) struct Marker<'a> {
    layout: &'a HeapLayout,
    meta: &'a mut MetaView,
    stack: Vec<BlockIndex>,
    capacity: usize,
    overflow: bool,
}

impl<'a> Marker<'a> {
    pub(crate) fn new(layout: &'a HeapLayout, meta: &'a mut MetaView, mark_stack_size: usize) -> Self {
        Marker {
            layout,
            meta,
            stack: Vec::with_capacity(mark_stack_size),
            capacity: mark_stack_size,
            overflow: false,
        }
    }

    /// Runs a complete mark phase: roots, then transitive closure, then as
    /// many overflow re-scans as `finish_mark` needs.
    pub(crate) fn run(&mut self, scan_roots: impl FnOnce(&mut dyn RootSink)) {
        scan_roots(&mut |range: RootRange| self.mark_roots(range.start, range.end));
        self.finish_mark();
    }

    /// Scans `[start, end)` for candidate pointers and starts a mark from
    /// each one that resolves to a live, not-yet-marked object.
    fn mark_roots(&mut self, start: Address, end: Address) {
        let word_size = size_of::<usize>();
        let mut a = start;
        while a.as_usize() + word_size <= end.as_usize() {
            // SAFETY: `a` is word-aligned within `[start, end)`, a range the
            // root provider claims is live, word-aligned memory.
            let w: usize = unsafe { a.load() };
            if looks_like_pointer(self.layout, w) {
                self.consider(Address::from_usize(w));
            }
            a += word_size;
        }
    }

    /// Resolves `candidate` to a block and, if it names a live, unmarked
    /// object, marks it and pushes it onto the work stack.
    fn consider(&mut self, candidate: Address) {
        let b = block::block_of(self.layout.heap_start, self.layout.meta_start, candidate);
        if self.meta.state(b) == BlockState::Free {
            return;
        }
        let head = block::find_head(self.meta, b);
        if self.meta.state(head) == BlockState::Mark {
            return;
        }
        self.meta.set_state(head, BlockState::Mark);
        self.push(head);
    }

    fn push(&mut self, b: BlockIndex) {
        if self.stack.len() == self.capacity {
            log::debug!("mark stack overflowed at capacity {}; will re-scan", self.capacity);
            self.overflow = true;
            return;
        }
        self.stack.push(b);
    }

    /// Scans the body of every block popped from the stack, considering each
    /// word-aligned word inside the object's extent as a candidate pointer.
    fn drain_stack(&mut self) {
        while let Some(b) = self.stack.pop() {
            let next = block::find_next(self.meta, b, self.layout.end_block);
            let obj_start = block::addr_of(self.layout.heap_start, b);
            let obj_end = block::addr_of(self.layout.heap_start, next);
            let word_size = size_of::<usize>();
            let mut a = obj_start;
            while a.as_usize() + word_size <= obj_end.as_usize() {
                // SAFETY: `[obj_start, obj_end)` is a live object's extent,
                // entirely within the committed block region.
                let w: usize = unsafe { a.load() };
                if looks_like_pointer(self.layout, w) {
                    self.consider(Address::from_usize(w));
                }
                a += word_size;
            }
        }
    }

    /// Drains the stack, and, as long as a drain overflowed, re-scans every
    /// `Mark` block in the heap to rediscover any children dropped on the
    /// floor by the overflow.
    ///
    /// Terminates because the set of `Mark` blocks is monotone non-decreasing
    /// and bounded by `end_block`; a re-scan pass that re-arms `overflow`
    /// must have marked at least one new block, or there was nothing left to
    /// discover and the flag stays clear.
    fn finish_mark(&mut self) {
        self.drain_stack();
        while self.overflow {
            self.overflow = false;
            for b in 0..self.layout.end_block {
                if self.meta.state(b) == BlockState::Mark {
                    // Re-enter this block as if starting a fresh mark from
                    // it, draining before moving to the next candidate so a
                    // second overflow within this very loop is possible
                    // (and handled by the next outer iteration) rather than
                    // silently dropped.
                    self.push(b);
                    self.drain_stack();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BYTES_IN_BLOCK;
    use crate::layout::HeapLayout;
    use crate::roots::{RootRange, ScriptedRootScanner, RootScanner};

    fn fresh(num_blocks: usize) -> (Vec<u8>, HeapLayout, MetaView) {
        let storage = vec![0u8; num_blocks * BYTES_IN_BLOCK + 64];
        let heap_start = Address::from_mut_ptr(storage.as_ptr() as *mut u8);
        let layout = HeapLayout {
            heap_start,
            heap_end: heap_start + storage.len(),
            meta_start: heap_start + num_blocks * BYTES_IN_BLOCK,
            end_block: num_blocks,
        };
        let meta = layout.zeroed_metadata();
        (storage, layout, meta)
    }

    #[test]
    fn marks_a_chain_that_fits_within_the_bounded_stack() {
        let (storage, layout, mut meta) = fresh(4);
        // Four one-block objects, object i's body holding a pointer to i+1.
        for i in 0..4 {
            meta.set_state(i, BlockState::Head);
        }
        for i in 0..3 {
            let addr = block::addr_of(layout.heap_start, i);
            let next_addr = block::addr_of(layout.heap_start, i + 1);
            unsafe { addr.store(next_addr.as_usize()) };
        }

        let mut scripted = ScriptedRootScanner::new();
        let root_addr = block::addr_of(layout.heap_start, 0);
        // A root slot elsewhere in `storage` holding a pointer to block 0.
        let root_slot = layout.heap_end - 8;
        unsafe { root_slot.store(root_addr.as_usize()) };
        scripted.push_stack_range(root_slot, root_slot + 8);

        let mut marker = Marker::new(&layout, &mut meta, 4);
        marker.run(|sink| scripted.scan_stack(sink));

        for i in 0..4 {
            assert_eq!(meta.state(i), BlockState::Mark, "block {i} should be marked");
        }
        drop(storage);
    }

    #[test]
    fn overflowing_fanout_is_fully_marked_after_rescan() {
        // A single one-block root object whose four words each point to a
        // distinct leaf block. With a mark stack of capacity 4, discovering
        // all four children while scanning the root overflows on the fifth
        // push attempt in `drain_stack`'s caller below -- here we give the
        // root five children by using a two-block object, so the fifth
        // discovery overflows and must be recovered by `finish_mark`'s
        // re-scan. A plain linked chain (one child per node) never grows the
        // stack past depth one and so would not exercise this path at all.
        let (storage, layout, mut meta) = fresh(7);
        // Root: blocks 0,1 (Head, Tail) -- 8 words of storage.
        meta.set_state(0, BlockState::Head);
        meta.set_state(1, BlockState::Tail);
        // Five one-block leaves: blocks 2..7.
        for leaf in 2..7 {
            meta.set_state(leaf, BlockState::Head);
        }
        let root_addr = block::addr_of(layout.heap_start, 0);
        for (i, leaf) in (2..7).enumerate() {
            let slot = root_addr + i * 8;
            let leaf_addr = block::addr_of(layout.heap_start, leaf);
            unsafe { slot.store(leaf_addr.as_usize()) };
        }

        let mut scripted = ScriptedRootScanner::new();
        let root_slot = layout.heap_end - 8;
        unsafe { root_slot.store(root_addr.as_usize()) };
        scripted.push_stack_range(root_slot, root_slot + 8);

        let mut marker = Marker::new(&layout, &mut meta, 4);
        marker.run(|sink| scripted.scan_stack(sink));

        for b in 0..7 {
            assert_eq!(meta.state(b), BlockState::Mark, "block {b} should be marked after rescan");
        }
        drop(storage);
    }

    #[test]
    fn word_that_resolves_to_a_free_block_is_ignored() {
        let (storage, layout, mut meta) = fresh(2);
        // Root slot pointing into a block that is Free: no-op.
        let root_slot = layout.heap_end - 8;
        let free_block_addr = block::addr_of(layout.heap_start, 1);
        unsafe { root_slot.store(free_block_addr.as_usize()) };

        let range = RootRange { start: root_slot, end: root_slot + 8 };
        let mut marker = Marker::new(&layout, &mut meta, 4);
        marker.run(|sink| sink.visit_range(range));

        assert_eq!(meta.state(0), BlockState::Free);
        assert_eq!(meta.state(1), BlockState::Free);
        drop(storage);
    }
}
