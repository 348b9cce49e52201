//! # Growth Policy
//!
//! Maps a requested record count and the current capacity to the next
//! capacity. Small buffers double; past [`GROWTH_THRESHOLD`] records the
//! factor eases toward 1.25x.
//!
//! ```text
//! old_cap < 256    : 2x
//! old_cap >= 256   : cap += (cap + 768) / 4, repeated until it fits
//! request > 2x old : exactly the request
//! ```

/// Capacity at which growth switches from doubling to ~1.25x.
pub const GROWTH_THRESHOLD: usize = 256;

/// Computes the capacity to allocate when `requested` records must fit and
/// the buffer currently holds `old_cap`.
///
/// Arithmetic is done in `isize` with wrapping: if the 1.25x loop overflows,
/// the requested length is returned unchanged.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn next_capacity(requested: usize, old_cap: usize) -> usize {
    const THRESHOLD: isize = GROWTH_THRESHOLD as isize;

    // No allocation can exceed isize::MAX bytes; let the allocator report it.
    if requested > isize::MAX as usize || old_cap > isize::MAX as usize {
        return requested;
    }

    let new_len = requested as isize;
    let mut new_cap = old_cap as isize;
    let doubled = new_cap.wrapping_add(new_cap);
    if new_len > doubled {
        return requested;
    }

    if new_cap < THRESHOLD {
        return doubled as usize;
    }

    loop {
        new_cap = new_cap.wrapping_add(new_cap.wrapping_add(3 * THRESHOLD) >> 2);
        // Unsigned compare catches both "large enough" and "wrapped negative".
        if new_cap as usize >= requested {
            break;
        }
    }

    if new_cap <= 0 {
        return requested;
    }
    new_cap as usize
}
