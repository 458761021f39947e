//! The sweep engine: a single linear pass reclaiming unmarked objects and
//! demoting survivors back to `Head`.

use crate::block::BlockState;
use crate::constants::BYTES_IN_BLOCK;
use crate::layout::HeapLayout;
use crate::metadata::MetaView;

/// Sweeps `[0, layout.end_block)` left to right, freeing every object whose
/// `Head` block was not marked and demoting every marked survivor back to
/// plain `Head`. Returns the number of free bytes after the pass (reclaimed
/// plus already-free).
///
/// `free_current_object` tracks whether the object the pass is currently
/// inside of turned out to be garbage, so its `Tail` blocks are freed too
/// without needing to look ahead or behind.
pub(crate) fn sweep(layout: &HeapLayout, meta: &mut MetaView) -> usize {
    let mut free_bytes = 0usize;
    let mut free_current_object = false;

    for b in 0..layout.end_block {
        match meta.state(b) {
            BlockState::Head => {
                meta.mark_free(b);
                free_current_object = true;
                free_bytes += BYTES_IN_BLOCK;
            }
            BlockState::Tail => {
                if free_current_object {
                    meta.mark_free(b);
                    free_bytes += BYTES_IN_BLOCK;
                }
            }
            BlockState::Mark => {
                meta.unmark(b);
                free_current_object = false;
            }
            BlockState::Free => {
                free_bytes += BYTES_IN_BLOCK;
            }
        }
    }

    let heap_bytes = layout.end_block * BYTES_IN_BLOCK;
    let occupancy_percent = if heap_bytes == 0 {
        0
    } else {
        100 - (free_bytes * 100 / heap_bytes)
    };
    log::debug!(
        "sweep reclaimed/free: {free_bytes} bytes of {heap_bytes} ({occupancy_percent}% occupied)"
    );

    free_bytes
}
