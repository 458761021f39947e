//! A lightweight, zero-overhead address type.
//!
//! `Address` wraps a raw `usize` and provides safe arithmetic for the parts of
//! the heap that only ever compare or offset addresses, while keeping the one
//! genuinely unsafe primitive -- reading or writing through the address -- as
//! a small, clearly marked seam (see [`Address::load`] / [`Address::store`]).

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// size in bytes
pub type ByteSize = usize;

/// An address into the process's address space. This may point inside the
/// heap region managed by this crate, or anywhere else (e.g. a root that
/// happens not to be a heap pointer at all).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq)]
pub struct Address(usize);

impl Address {
    /// The lowest possible address.
    pub const ZERO: Self = Address(0);

    /// Creates an `Address` from a raw `usize`.
    pub const fn from_usize(raw: usize) -> Address {
        Address(raw)
    }

    /// Creates an `Address` from a raw pointer.
    pub fn from_mut_ptr<T>(ptr: *mut T) -> Address {
        Address(ptr as usize)
    }

    /// Returns the address as a raw `usize`.
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns the address as a mutable raw pointer.
    pub fn to_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Returns `true` if the address is aligned to `align` bytes. `align`
    /// must be a power of two.
    pub const fn is_aligned_to(self, align: usize) -> bool {
        self.0 & (align - 1) == 0
    }

    /// Rounds the address down to the nearest multiple of `align`, which must
    /// be a power of two.
    pub const fn align_down(self, align: usize) -> Address {
        Address(self.0 & !(align - 1))
    }

    /// Get the number of bytes between two addresses. `self` must be the
    /// higher (or equal) address.
    pub const fn get_extent(self, other: Address) -> ByteSize {
        self.0 - other.0
    }

    /// Loads a value of type `T` from this address.
    ///
    /// # Safety
    /// The caller must ensure `self` is valid, word-aligned for `T`, and that
    /// a `T` was previously stored there (or that reading uninitialized bytes
    /// as `T` is acceptable for `T`, e.g. `usize`).
    pub unsafe fn load<T: Copy>(self) -> T {
        *(self.0 as *const T)
    }

    /// Stores a value of type `T` at this address.
    ///
    /// # Safety
    /// The caller must ensure `self` is valid and word-aligned for `T`.
    pub unsafe fn store<T>(self, value: T) {
        (self.0 as *mut T).write(value);
    }

    /// Zero-fills `len` bytes starting at this address.
    ///
    /// # Safety
    /// The caller must ensure `[self, self + len)` is valid, writable memory.
    pub unsafe fn zero(self, len: usize) {
        std::ptr::write_bytes(self.0 as *mut u8, 0, len);
    }
}

impl Add<ByteSize> for Address {
    type Output = Address;
    fn add(self, offset: ByteSize) -> Address {
        Address(self.0 + offset)
    }
}

impl AddAssign<ByteSize> for Address {
    fn add_assign(&mut self, offset: ByteSize) {
        self.0 += offset;
    }
}

impl Sub<ByteSize> for Address {
    type Output = Address;
    fn sub(self, offset: ByteSize) -> Address {
        Address(self.0 - offset)
    }
}

impl SubAssign<ByteSize> for Address {
    fn sub_assign(&mut self, offset: ByteSize) {
        self.0 -= offset;
    }
}

/// Address - Address (the first address must be higher, or equal)
impl Sub<Address> for Address {
    type Output = ByteSize;
    fn sub(self, other: Address) -> ByteSize {
        debug_assert!(
            self.0 >= other.0,
            "for (addr_a - addr_b), a({}) needs to be >= b({})",
            self,
            other
        );
        self.0 - other.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
