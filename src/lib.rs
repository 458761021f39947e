//! A conservative, non-moving, mark-and-sweep garbage-collected heap for
//! runtimes that lack precise type information at the machine-word level.
//!
//! The heap is a single contiguous byte region, partitioned into fixed-size
//! blocks with packed two-bit-per-block state metadata. Allocation is a
//! rotating first-fit scan over the blocks; on exhaustion it escalates to a
//! conservative mark-and-sweep collection, and failing that, to growing the
//! backing region in place. Nothing ever moves: an embedder may hold a raw
//! address into the heap indefinitely.
//!
//! Logically, this crate is built from:
//! * [`address`]: the `Address` newtype and its safe arithmetic.
//! * [`block`] / [`metadata`]: block address algebra and packed block-state
//!   storage.
//! * [`layout`]: the heap layout manager, splitting a raw byte region into
//!   block area and metadata area.
//! * [`backing`]: the external byte-allocation collaborator ([`BackingAllocator`]),
//!   plus the production ([`MmapBackingAllocator`]) and test
//!   ([`VecBackingAllocator`]) implementations.
//! * [`roots`]: the external root-enumeration collaborator ([`RootScanner`]).
//! * [`mark`] / [`sweep`]: the conservative mark engine and the sweep engine.
//! * [`heap`]: [`Heap`], tying the above together behind the public API.
//! * [`options`]: run-time tunable parameters.
//! * [`error`]: the error surface.
//!
//! An embedder drives the heap by implementing [`RootScanner`] (and,
//! typically, using [`MmapBackingAllocator`] as the backing allocator),
//! calling [`Heap::init`] once, and then [`Heap::alloc`] on the allocation
//! path. Collection happens implicitly inside `alloc`; [`Heap::gc`] is
//! available for an embedder that wants to force a cycle explicitly (e.g.
//! between requests).

pub mod address;
pub mod backing;
pub mod block;
pub mod constants;
pub mod error;
pub mod heap;
mod layout;
mod logger;
mod mark;
pub mod metadata;
pub mod options;
pub mod roots;
mod sweep;

pub use address::Address;
pub use backing::{BackingAllocator, MmapBackingAllocator, VecBackingAllocator};
pub use error::GcError;
pub use heap::Heap;
pub use options::Options;
pub use roots::{RootRange, RootScanner, RootSink, ScriptedRootScanner};
