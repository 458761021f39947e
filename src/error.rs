//! The error surface exposed by this crate.
//!
//! The only caller-visible failure mode is running out of memory: both
//! collection and heap growth failed to satisfy an allocation request. Every
//! other invariant violation is a bug in this crate or in the root-scanning
//! implementation supplied by the embedder, and is reported through
//! `debug_assert!` rather than through this type.

use std::fmt;

/// Errors that can be returned from this crate's public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcError {
    /// Both garbage collection and heap growth failed to free or acquire
    /// enough space to satisfy a non-zero allocation request.
    OutOfMemory,
}

impl fmt::Display for GcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcError::OutOfMemory => write!(
                f,
                "out of memory: collection and heap growth both failed to satisfy the allocation"
            ),
        }
    }
}

impl std::error::Error for GcError {}
