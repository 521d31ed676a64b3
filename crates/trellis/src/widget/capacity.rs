//! Capacity policy for element and peer arrays.
//!
//! The legacy engine grew its backing arrays in fixed blocks and only gave
//! memory back once the slack reached two full blocks, so bursts of
//! insert/delete traffic do not reallocate on every call. That observable
//! policy is preserved here as a pair of pure functions applied to plain
//! `Vec` storage, so it can be tested in isolation.
//!
//! Invariant maintained for any insert/delete sequence:
//! `count <= capacity` and `capacity - count < 2 * GROW_UNIT`.

/// Block size for growth and the unit of the shrink threshold.
pub(crate) const GROW_UNIT: usize = 4;

/// The capacity a collection of `count` elements should reserve: `count`
/// rounded up to the next multiple of [`GROW_UNIT`].
pub(crate) fn padded_capacity(count: usize) -> usize {
    count.div_ceil(GROW_UNIT) * GROW_UNIT
}

/// Whether a collection's slack is large enough to give memory back.
pub(crate) fn should_shrink(count: usize, capacity: usize) -> bool {
    capacity.saturating_sub(count) >= 2 * GROW_UNIT
}

/// Reserve room for one more element, growing in [`GROW_UNIT`] blocks.
pub(crate) fn reserve_for_push<T>(vec: &mut Vec<T>) {
    let wanted = padded_capacity(vec.len() + 1);
    if vec.capacity() < wanted {
        vec.reserve_exact(wanted - vec.len());
    }
}

/// Give slack back after removals, if the policy allows it.
pub(crate) fn trim_after_remove<T>(vec: &mut Vec<T>) {
    if should_shrink(vec.len(), vec.capacity()) {
        vec.shrink_to(padded_capacity(vec.len()));
    }
}
