//! Tunable parameters for the heap.
//!
//! `Options` gathers every knob the collector's behavior depends on -- heap
//! size, mark stack capacity, and the growth headroom fraction -- so an
//! embedder can retune them without touching the algorithm. Defaults are
//! reasonable reference values; any of them can be overridden via
//! [`Options::read_env_var_settings`] or explicitly before the heap is
//! initialized.

use crate::constants::{
    DEFAULT_HEADROOM_DENOMINATOR, DEFAULT_HEADROOM_NUMERATOR, DEFAULT_HEAP_SIZE,
    DEFAULT_MARK_STACK_SIZE,
};

/// Tunable parameters for a [`crate::Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Initial heap size in bytes, acquired from the backing allocator at
    /// `init()`. Reference value: 128 MiB.
    pub heap_size: usize,
    /// Capacity of the mark engine's bounded explicit stack, in entries.
    pub mark_stack_size: usize,
    /// Numerator of the headroom fraction: after a collection, if free bytes
    /// are below `numerator / denominator` of the heap, the allocator
    /// proactively grows the heap.
    pub headroom_numerator: usize,
    /// Denominator of the headroom fraction.
    pub headroom_denominator: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            heap_size: DEFAULT_HEAP_SIZE,
            mark_stack_size: DEFAULT_MARK_STACK_SIZE,
            headroom_numerator: DEFAULT_HEADROOM_NUMERATOR,
            headroom_denominator: DEFAULT_HEADROOM_DENOMINATOR,
        }
    }
}

impl Options {
    /// Creates an `Options` with built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `CONVGC_`-prefixed environment variables and applies any that
    /// match a known option, leaving the rest at their current value.
    ///
    /// Recognized variables: `CONVGC_HEAP_SIZE`, `CONVGC_MARK_STACK_SIZE`,
    /// `CONVGC_HEADROOM_NUMERATOR`, `CONVGC_HEADROOM_DENOMINATOR`.
    pub fn read_env_var_settings(&mut self) {
        const PREFIX: &str = "CONVGC_";
        for (key, val) in std::env::vars() {
            let Some(rest) = key.strip_prefix(PREFIX) else {
                continue;
            };
            let parsed = val.parse::<usize>();
            match (rest, parsed) {
                ("HEAP_SIZE", Ok(v)) => self.heap_size = v,
                ("MARK_STACK_SIZE", Ok(v)) => self.mark_stack_size = v,
                ("HEADROOM_NUMERATOR", Ok(v)) => self.headroom_numerator = v,
                ("HEADROOM_DENOMINATOR", Ok(v)) => self.headroom_denominator = v,
                (name, Err(_)) if matches!(name, "HEAP_SIZE" | "MARK_STACK_SIZE" | "HEADROOM_NUMERATOR" | "HEADROOM_DENOMINATOR") => {
                    log::warn!("ignoring {key}={val}: not a valid unsigned integer");
                }
                _ => {}
            }
        }
    }
}
