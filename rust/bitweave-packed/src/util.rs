//! Sizing checks shared by the paged, appending and block-packed structures.

use bitweave_common::{Result, verify_arg};

/// Validates that `block_size` is a power of two within `[min, max]` and returns its
/// base-2 logarithm.
pub fn check_block_size(block_size: usize, min: usize, max: usize) -> Result<u32> {
    verify_arg!(block_size, block_size >= min && block_size <= max);
    verify_arg!(block_size, block_size.is_power_of_two());
    Ok(block_size.trailing_zeros())
}

/// Number of blocks of `block_size` values needed for `size` values.
///
/// The count must be addressable with a signed 32-bit index.
pub fn num_blocks(size: u64, block_size: usize) -> Result<usize> {
    let count = size.div_ceil(block_size as u64);
    verify_arg!(size, count <= i32::MAX as u64);
    Ok(count as usize)
}

/// Value predicted by a linear model `average * index`, truncated toward zero.
///
/// Writers and readers of monotonic data must both use this exact rounding.
#[inline]
pub(crate) fn linear_expected(average: f32, index: usize) -> i64 {
    (average * index as f32) as i64
}
