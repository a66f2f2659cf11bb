//! Physical layouts of packed data and the heuristic that picks one.

use bitweave_common::{Error, Result};

use crate::three_blocks::{Packed8ThreeBlocks, Packed16ThreeBlocks};

/// No memory overhead at all, but the returned implementation may be slow.
pub const COMPACT: f32 = 0.0;

/// At most 25% memory overhead.
pub const DEFAULT: f32 = 0.25;

/// At most 50% memory overhead, always selects a reasonably fast implementation.
pub const FAST: f32 = 0.5;

/// At most 700% memory overhead, always selects a direct implementation.
pub const FASTEST: f32 = 7.0;

/// Widths for which the single-block layout is available.
pub const SINGLE_BLOCK_BITS: [u32; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 16, 21, 32];

/// Byte layout of a packed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Values are stored as one contiguous run of bits, most significant bit first, and
    /// may span two words.
    Packed = 0,
    /// `64 / bits_per_value` values share each 64-bit word and never span words; the
    /// remaining high bits of a word are unused.
    PackedSingleBlock = 1,
}

impl Format {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Result<Format> {
        match id {
            0 => Ok(Format::Packed),
            1 => Ok(Format::PackedSingleBlock),
            _ => Err(Error::invalid_format("format_id", format!("unknown format {id}"))),
        }
    }

    pub fn is_supported(self, bits_per_value: u32) -> bool {
        match self {
            Format::Packed => (1..=64).contains(&bits_per_value),
            Format::PackedSingleBlock => SINGLE_BLOCK_BITS.contains(&bits_per_value),
        }
    }

    /// Number of bytes needed to store `value_count` values.
    pub fn byte_count(self, value_count: usize, bits_per_value: u32) -> u64 {
        debug_assert!(self.is_supported(bits_per_value));
        match self {
            Format::Packed => (value_count as u64 * bits_per_value as u64).div_ceil(8),
            Format::PackedSingleBlock => self.long_count(value_count, bits_per_value) * 8,
        }
    }

    /// Number of 64-bit words needed to store `value_count` values.
    pub fn long_count(self, value_count: usize, bits_per_value: u32) -> u64 {
        debug_assert!(self.is_supported(bits_per_value));
        match self {
            Format::Packed => self.byte_count(value_count, bits_per_value).div_ceil(8),
            Format::PackedSingleBlock => {
                let values_per_block = (64 / bits_per_value) as u64;
                (value_count as u64).div_ceil(values_per_block)
            }
        }
    }

    /// Wasted bits per value.
    pub fn overhead_per_value(self, bits_per_value: u32) -> f32 {
        debug_assert!(self.is_supported(bits_per_value));
        match self {
            Format::Packed => 0.0,
            Format::PackedSingleBlock => {
                let values_per_block = 64 / bits_per_value;
                let overhead = 64 % bits_per_value;
                overhead as f32 / values_per_block as f32
            }
        }
    }

    /// Wasted bits per value relative to `bits_per_value`.
    pub fn overhead_ratio(self, bits_per_value: u32) -> f32 {
        self.overhead_per_value(bits_per_value) / bits_per_value as f32
    }
}

/// A format paired with the actual number of bits per value it stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatAndBits {
    pub format: Format,
    pub bits_per_value: u32,
}

impl FormatAndBits {
    pub fn new(format: Format, bits_per_value: u32) -> FormatAndBits {
        FormatAndBits {
            format,
            bits_per_value,
        }
    }

    /// Picks the fastest layout for `value_count` values needing `bits_per_value` bits
    /// that stays within `acceptable_overhead_ratio` extra bits per value.
    ///
    /// Direct widths (8/16/32/64) come first, then the three-block widths (24/48), then
    /// the narrowest single-block width within budget, and finally exact packing.
    /// `COMPACT` always yields `Format::Packed` at exactly `bits_per_value`.
    pub fn fastest(
        value_count: usize,
        bits_per_value: u32,
        acceptable_overhead_ratio: f32,
    ) -> FormatAndBits {
        debug_assert!((1..=64).contains(&bits_per_value));
        let ratio = acceptable_overhead_ratio.clamp(COMPACT, FASTEST);
        let acceptable_overhead_per_value = ratio * bits_per_value as f32;
        let max_bits_per_value = bits_per_value + acceptable_overhead_per_value as u32;

        let fits = |width: u32| bits_per_value <= width && max_bits_per_value >= width;
        let direct = if fits(8) {
            Some(8)
        } else if fits(16) {
            Some(16)
        } else if fits(32) {
            Some(32)
        } else if fits(64) {
            Some(64)
        } else if value_count <= Packed8ThreeBlocks::MAX_SIZE && fits(24) {
            Some(24)
        } else if value_count <= Packed16ThreeBlocks::MAX_SIZE && fits(48) {
            Some(48)
        } else {
            None
        };
        if let Some(width) = direct {
            return FormatAndBits::new(Format::Packed, width);
        }
        if ratio <= COMPACT {
            return FormatAndBits::new(Format::Packed, bits_per_value);
        }

        for width in bits_per_value..=max_bits_per_value {
            if Format::PackedSingleBlock.is_supported(width) {
                let overhead = Format::PackedSingleBlock.overhead_per_value(width);
                let acceptable =
                    acceptable_overhead_per_value + bits_per_value as f32 - width as f32;
                if overhead <= acceptable {
                    return FormatAndBits::new(Format::PackedSingleBlock, width);
                }
            }
        }
        FormatAndBits::new(Format::Packed, bits_per_value)
    }
}
