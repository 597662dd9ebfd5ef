/// Align `size` upwards to `align`.
///
/// Requires that `align` is a power of two.
#[inline]
pub const fn align_up(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (size + align - 1) & !(align - 1)
}

/// Whether `value` is a multiple of `align`.
///
/// Requires that `align` is a power of two.
#[inline]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    debug_assert!(align.is_power_of_two());
    value & (align - 1) == 0
}
