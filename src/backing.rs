//! The backing byte allocator: the raw, external collaborator this crate
//! asks for its initial heap region and, optionally, in-place growth.
//!
//! The heap region is never moved once handed to an embedder -- a root may
//! hold a raw address into it indefinitely -- so growth must extend the
//! region in place rather than relocate it. [`MmapBackingAllocator`], the
//! production implementation, achieves this the way a conservative collector
//! typically does: it reserves a large virtual address range up front with
//! no access permissions, then commits (`mprotect`s readable/writable) a
//! growing prefix of it. [`VecBackingAllocator`] does the analogous thing
//! over a plain `Vec<u8>` for tests, by pre-reserving capacity and only
//! growing the initialized length.

use crate::Address;

/// The raw byte-allocation collaborator: acquires the initial heap region
/// and, optionally, grows it in place.
pub trait BackingAllocator {
    /// Acquires a fresh, zeroed region of at least `bytes` bytes. Called once
    /// at `init()`.
    fn alloc(&mut self, bytes: usize) -> Option<Address>;

    /// Attempts to extend the most recently allocated region in place so
    /// that it is at least `new_len` bytes (from the same start address).
    /// Returns `false` if growth is not possible; the region is left
    /// unchanged in that case. The default implementation always returns
    /// `false`, for allocators that cannot grow in place.
    fn grow(&mut self, new_len: usize) -> bool {
        let _ = new_len;
        false
    }
}

/// Default production backing allocator: reserves `reserve_bytes` of virtual
/// address space with `PROT_NONE` and commits a growing prefix of it with
/// `mprotect`, so the base address returned from `alloc` is stable for the
/// lifetime of the process.
pub struct MmapBackingAllocator {
    reserve_bytes: usize,
    base: Option<Address>,
    committed: usize,
}

impl MmapBackingAllocator {
    /// `reserve_bytes` bounds how large the heap may ever grow to; it is
    /// reserved as address space (not committed memory) up front.
    pub fn new(reserve_bytes: usize) -> Self {
        MmapBackingAllocator {
            reserve_bytes,
            base: None,
            committed: 0,
        }
    }
}

impl BackingAllocator for MmapBackingAllocator {
    fn alloc(&mut self, bytes: usize) -> Option<Address> {
        debug_assert!(self.base.is_none(), "MmapBackingAllocator::alloc called twice");
        let reserve = self.reserve_bytes.max(bytes);
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                reserve,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return None;
        }
        if unsafe { libc::mprotect(ptr, bytes, libc::PROT_READ | libc::PROT_WRITE) } != 0 {
            unsafe {
                libc::munmap(ptr, reserve);
            }
            return None;
        }
        self.base = Some(Address::from_mut_ptr(ptr));
        self.committed = bytes;
        self.base
    }

    fn grow(&mut self, new_len: usize) -> bool {
        let Some(base) = self.base else {
            return false;
        };
        if new_len <= self.committed {
            return true;
        }
        if new_len > self.reserve_bytes {
            log::warn!(
                "cannot grow heap to {new_len} bytes: exceeds the {} byte virtual reservation",
                self.reserve_bytes
            );
            return false;
        }
        let ok = unsafe {
            libc::mprotect(
                base.to_mut_ptr(),
                new_len,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        } == 0;
        if ok {
            self.committed = new_len;
        }
        ok
    }
}

/// A `Vec<u8>`-backed allocator for unit and integration tests. Pre-reserves
/// `reserve_bytes` of capacity so that `grow` never triggers a reallocation
/// (which would move the region and invalidate addresses already handed
/// out), matching the non-moving contract `MmapBackingAllocator` gives in
/// production.
pub struct VecBackingAllocator {
    storage: Vec<u8>,
    reserve_bytes: usize,
}

impl VecBackingAllocator {
    pub fn new(reserve_bytes: usize) -> Self {
        VecBackingAllocator {
            storage: Vec::new(),
            reserve_bytes,
        }
    }
}

impl BackingAllocator for VecBackingAllocator {
    fn alloc(&mut self, bytes: usize) -> Option<Address> {
        debug_assert!(self.storage.is_empty(), "VecBackingAllocator::alloc called twice");
        self.storage = vec![0u8; self.reserve_bytes.max(bytes)];
        self.storage.truncate(bytes);
        self.storage.shrink_to(self.reserve_bytes.max(bytes));
        // `truncate` only shrinks `len`; `capacity` keeps the full
        // reservation, so the backing pointer never moves on growth below.
        Some(Address::from_mut_ptr(self.storage.as_mut_ptr()))
    }

    fn grow(&mut self, new_len: usize) -> bool {
        if new_len <= self.storage.len() {
            return true;
        }
        if new_len > self.storage.capacity() {
            return false;
        }
        let old_len = self.storage.len();
        let base = self.storage.as_mut_ptr();
        unsafe {
            self.storage.set_len(new_len);
            std::ptr::write_bytes(base.add(old_len), 0, new_len - old_len);
        }
        true
    }
}
