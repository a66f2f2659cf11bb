//! Construction of the fastest mutable array for a width and overhead budget.

use bitweave_common::{Error, Result, verify_arg};

use crate::{
    MAX_VALUE_COUNT,
    direct::{Direct8, Direct16, Direct32, Direct64},
    format::{Format, FormatAndBits},
    packed64::Packed64,
    reader::Mutable,
    single_block::Packed64SingleBlock,
    three_blocks::{Packed8ThreeBlocks, Packed16ThreeBlocks},
};

/// Allocates a zeroed array of `value_count` values able to hold `bits_per_value` bits,
/// trading up to `acceptable_overhead_ratio` extra bits per value for speed.
pub fn get_mutable(
    value_count: usize,
    bits_per_value: u32,
    acceptable_overhead_ratio: f32,
) -> Result<Box<dyn Mutable>> {
    verify_arg!(bits_per_value, (1..=64).contains(&bits_per_value));
    let choice = FormatAndBits::fastest(value_count, bits_per_value, acceptable_overhead_ratio);
    get_mutable_with_format(value_count, choice.bits_per_value, choice.format)
}

/// Allocates a zeroed array with exactly the given layout.
pub fn get_mutable_with_format(
    value_count: usize,
    bits_per_value: u32,
    format: Format,
) -> Result<Box<dyn Mutable>> {
    verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
    if !format.is_supported(bits_per_value) {
        return Err(Error::invalid_arg(
            "bits_per_value",
            format!("{bits_per_value} is not supported by {format:?}"),
        ));
    }
    Ok(new_mutable(value_count, bits_per_value, format))
}

/// Infallible allocation for arguments already validated by the caller.
pub(crate) fn new_mutable(
    value_count: usize,
    bits_per_value: u32,
    format: Format,
) -> Box<dyn Mutable> {
    debug_assert!(value_count <= MAX_VALUE_COUNT);
    debug_assert!(format.is_supported(bits_per_value));
    match format {
        Format::PackedSingleBlock => {
            Box::new(Packed64SingleBlock::alloc(value_count, bits_per_value))
        }
        Format::Packed => match bits_per_value {
            8 => Box::new(Direct8::alloc(value_count)),
            16 => Box::new(Direct16::alloc(value_count)),
            32 => Box::new(Direct32::alloc(value_count)),
            64 => Box::new(Direct64::alloc(value_count)),
            24 if value_count <= Packed8ThreeBlocks::MAX_SIZE => {
                Box::new(Packed8ThreeBlocks::alloc(value_count))
            }
            48 if value_count <= Packed16ThreeBlocks::MAX_SIZE => {
                Box::new(Packed16ThreeBlocks::alloc(value_count))
            }
            _ => Box::new(Packed64::alloc(value_count, bits_per_value)),
        },
    }
}
