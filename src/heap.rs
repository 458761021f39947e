//! The top-level `Heap`: owns the layout, metadata, cursor, and the two
//! externally supplied collaborators (the backing allocator and the root
//! scanner), and exposes the public allocation/collection API.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::backing::BackingAllocator;
use crate::block::{self, BlockIndex, BlockState};
use crate::constants::BYTES_IN_BLOCK;
use crate::error::GcError;
use crate::layout::HeapLayout;
use crate::logger;
use crate::mark::Marker;
use crate::metadata::MetaView;
use crate::options::Options;
use crate::roots::RootScanner;
use crate::sweep;
use crate::Address;

/// A conservative, non-moving, mark-and-sweep heap.
///
/// Not `Sync`: collection is stop-the-world on whichever thread calls
/// [`Heap::alloc`] or [`Heap::gc`], and the metadata region has no internal
/// synchronization. An embedder driving this from multiple threads is
/// responsible for excluding concurrent calls itself.
pub struct Heap<B: BackingAllocator, R: RootScanner> {
    backing: B,
    root_scanner: R,
    options: Options,
    layout: HeapLayout,
    meta: MetaView,
    next_alloc: BlockIndex,
    zero_sentinel: Box<u8>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<B: BackingAllocator, R: RootScanner> Heap<B, R> {
    /// Acquires `options.heap_size` bytes from `backing`, computes the
    /// layout, and zeroes the metadata. Must run before any other call.
    pub fn init(options: Options, mut backing: B, root_scanner: R) -> Result<Self, GcError> {
        logger::try_init();

        let total_bytes = options.heap_size;
        let heap_start = backing.alloc(total_bytes).ok_or(GcError::OutOfMemory)?;
        let layout = HeapLayout::compute(heap_start, heap_start + total_bytes);
        let meta = layout.zeroed_metadata();

        log::info!(
            "convgc heap initialized: {total_bytes} bytes, {} blocks, mark_stack_size={}",
            layout.end_block,
            options.mark_stack_size
        );

        Ok(Heap {
            backing,
            root_scanner,
            options,
            layout,
            meta,
            next_alloc: 0,
            zero_sentinel: Box::new(0u8),
            _not_sync: PhantomData,
        })
    }

    /// Returns the stable address of the shared zero-size sentinel. Never
    /// inside the managed block region and never marked or swept.
    fn zero_sentinel_address(&self) -> Address {
        let addr = Address::from_mut_ptr(self.zero_sentinel.as_ref() as *const u8 as *mut u8);
        debug_assert!(!self.layout.in_block_region(addr));
        addr
    }

    /// Returns `size` zero-filled, `bytesPerBlock`-aligned bytes. `size == 0`
    /// returns the zero-size sentinel without touching heap state.
    ///
    /// Fails with [`GcError::OutOfMemory`] only once both a collection and a
    /// heap-growth attempt have failed to make room.
    pub fn alloc(&mut self, size: usize) -> Result<Address, GcError> {
        if size == 0 {
            return Ok(self.zero_sentinel_address());
        }
        let need = size.div_ceil(BYTES_IN_BLOCK);
        let this_alloc = self.find_room(need)?;
        Ok(self.commit(this_alloc, this_alloc + need, size))
    }

    /// Rotating first-fit scan starting at `next_alloc`, escalating to GC and
    /// then heap growth once a full circle turns up no run of `need` free
    /// blocks.
    fn find_room(&mut self, need: usize) -> Result<BlockIndex, GcError> {
        let mut index = self.next_alloc;
        let mut run = 0usize;
        let mut phase: u32 = 0;

        loop {
            if index == self.layout.end_block {
                index = 0;
                run = 0;
            }

            if self.meta.state(index) != BlockState::Free {
                run = 0;
                index += 1;
            } else {
                run += 1;
                index += 1;
                if run == need {
                    return Ok(index - need);
                }
            }

            if index == self.next_alloc {
                phase += 1;
                self.escalate(phase)?;
            }
        }
    }

    /// Reacts to a full circle of the allocator scan finding no fit. Phase 1
    /// just begins the second circle; phase 2 runs a collection and grows
    /// the heap if the result leaves less than the headroom fraction free;
    /// phase 3 and beyond grow unconditionally, failing with `OutOfMemory` if
    /// growth itself fails.
    fn escalate(&mut self, phase: u32) -> Result<(), GcError> {
        match phase {
            1 => {
                log::trace!("allocator completed one circle with no fit; beginning a second");
            }
            2 => {
                log::debug!("allocator circled twice with no fit; running GC");
                let free_bytes = self.collect();
                let heap_bytes = self.layout.end_block * BYTES_IN_BLOCK;
                if free_bytes * self.options.headroom_denominator
                    < heap_bytes * self.options.headroom_numerator
                {
                    log::debug!(
                        "post-GC free bytes {free_bytes} below headroom threshold ({}/{} of {heap_bytes}); growing heap",
                        self.options.headroom_numerator,
                        self.options.headroom_denominator
                    );
                    self.try_grow();
                }
            }
            _ => {
                log::debug!("still no fit after GC; requesting heap growth");
                if !self.try_grow() {
                    return Err(GcError::OutOfMemory);
                }
            }
        }
        Ok(())
    }

    /// Runs one full mark-then-sweep cycle, discarding no information:
    /// returns the free-byte count the sweep reports.
    fn collect(&mut self) -> usize {
        log::info!("GC start");
        {
            let mut marker = Marker::new(&self.layout, &mut self.meta, self.options.mark_stack_size);
            let root_scanner = &self.root_scanner;
            marker.run(|sink| {
                root_scanner.scan_stack(sink);
                root_scanner.scan_globals(sink);
            });
        }
        let free_bytes = sweep::sweep(&self.layout, &mut self.meta);
        log::info!("GC end: {free_bytes} bytes free");
        free_bytes
    }

    /// Runs a full collection cycle, discarding the free-byte count. Exposed
    /// to the embedder for explicit collection requests outside the
    /// allocator's own escalation path.
    pub fn gc(&mut self) {
        self.collect();
    }

    /// Doubles the current total heap size and asks the backing allocator to
    /// grow in place; on success, recomputes the layout and carries forward
    /// every existing block's metadata. Returns `false` if the backing
    /// allocator refuses (e.g. its reservation is exhausted).
    fn try_grow(&mut self) -> bool {
        let current_total = self.layout.heap_end.get_extent(self.layout.heap_start);
        let new_total = current_total.saturating_mul(2);

        if !self.backing.grow(new_total) {
            log::warn!("heap growth from {current_total} to {new_total} bytes failed");
            return false;
        }

        let old_meta_bytes = self.meta.as_bytes().to_vec();
        let new_layout = HeapLayout::compute(self.layout.heap_start, self.layout.heap_start + new_total);
        let mut new_meta = new_layout.zeroed_metadata();
        new_meta.overwrite_prefix(&old_meta_bytes);

        log::info!(
            "heap grown from {current_total} to {new_total} bytes ({} blocks)",
            new_layout.end_block
        );

        self.layout = new_layout;
        self.meta = new_meta;
        true
    }

    /// Commits the run `[this_alloc, next)` as a freshly allocated object,
    /// zero-fills its `size` user-visible bytes, and advances the cursor.
    fn commit(&mut self, this_alloc: BlockIndex, next: BlockIndex, size: usize) -> Address {
        self.meta.set_state(this_alloc, BlockState::Head);
        for b in (this_alloc + 1)..next {
            self.meta.set_state(b, BlockState::Tail);
        }
        self.next_alloc = next;

        let addr = block::addr_of(self.layout.heap_start, this_alloc);
        // SAFETY: `[addr, addr + size)` lies within the just-committed run of
        // blocks, which this call alone has exclusive, initialized access to.
        unsafe { addr.zero(size) };
        addr
    }

    /// The first address of the managed block region. Stable for the
    /// process lifetime: growth only ever extends the region past its end.
    pub fn starting_heap_address(&self) -> Address {
        self.layout.heap_start
    }

    /// The number of block-region bytes currently committed (free and
    /// allocated together). Does not include metadata, which this crate
    /// keeps as a separate allocation rather than colocated in the block
    /// region's backing bytes.
    pub fn total_bytes(&self) -> usize {
        self.layout.end_block * BYTES_IN_BLOCK
    }

    /// No-op: present purely for surface compatibility with runtimes that
    /// call it to pin a reference across a GC-unsafe point. This collector
    /// never moves or frees anything except from inside `alloc`/`gc`, so
    /// there is nothing to pin against.
    pub fn keep_alive(&self, _obj: Address) {}

    /// No-op: present purely for surface compatibility. Finalization is out
    /// of scope for this collector.
    pub fn set_finalizer<F: FnOnce(Address) + 'static>(&mut self, _obj: Address, _finalizer: F) {}
}
