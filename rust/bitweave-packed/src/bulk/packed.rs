//! Kernels for the contiguous-bits layout.
//!
//! Values are laid out most significant bit first: the first value occupies the high
//! bits of the first word, and a value may continue into the high bits of the next word.
//! Byte blocks carry the same bit stream in big-endian order.
//!
//! A single algorithm serves every width. [`PackedBulkOperation`] runs it with a width
//! chosen at runtime; [`SpecializedBulkOperation`] fixes the width at compile time, which
//! lets the optimizer unroll the shift/mask sequence for that width.

use bitweave_bits::word::low_mask;
use bitweave_common::Result;

use super::{BulkOperation, too_wide_for_ints};

/// Per-width constants of the contiguous-bits layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedLayout {
    pub bits_per_value: u32,
    pub long_block_count: usize,
    pub long_value_count: usize,
    pub byte_block_count: usize,
    pub byte_value_count: usize,
    pub mask: u64,
}

impl PackedLayout {
    /// The smallest run of words holding a whole number of values: the odd part of
    /// `bits_per_value` words hold `64 * blocks / bits_per_value` values.
    pub const fn new(bits_per_value: u32) -> PackedLayout {
        assert!(bits_per_value >= 1 && bits_per_value <= 64);
        let mut blocks = bits_per_value as usize;
        while blocks & 1 == 0 {
            blocks >>= 1;
        }
        let long_value_count = 64 * blocks / bits_per_value as usize;
        let mut byte_block_count = 8 * blocks;
        let mut byte_value_count = long_value_count;
        while byte_block_count & 1 == 0 && byte_value_count & 1 == 0 {
            byte_block_count >>= 1;
            byte_value_count >>= 1;
        }
        let mask = if bits_per_value == 64 {
            u64::MAX
        } else {
            (1u64 << bits_per_value) - 1
        };
        PackedLayout {
            bits_per_value,
            long_block_count: blocks,
            long_value_count,
            byte_block_count,
            byte_value_count,
            mask,
        }
    }
}

/// Source of a kernel's layout, either fixed by the type or carried at runtime.
pub trait Width: Copy + Send + Sync + 'static {
    fn layout(&self) -> PackedLayout;
}

impl Width for PackedLayout {
    #[inline(always)]
    fn layout(&self) -> PackedLayout {
        *self
    }
}

/// Width known at compile time.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWidth<const BPV: u32>;

impl<const BPV: u32> FixedWidth<BPV> {
    const LAYOUT: PackedLayout = PackedLayout::new(BPV);
}

impl<const BPV: u32> Width for FixedWidth<BPV> {
    #[inline(always)]
    fn layout(&self) -> PackedLayout {
        Self::LAYOUT
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PackedBulkOperation<W: Width = PackedLayout>(pub W);

/// Kernel with the width baked into the type.
pub type SpecializedBulkOperation<const BPV: u32> = PackedBulkOperation<FixedWidth<BPV>>;

#[inline(always)]
fn decode_blocks(
    layout: PackedLayout,
    blocks: &[u64],
    iterations: usize,
    mut emit: impl FnMut(usize, u64),
) {
    let bpv = layout.bits_per_value as i32;
    let mut block_idx = 0;
    let mut bits_left = 64i32;
    for i in 0..layout.long_value_count * iterations {
        bits_left -= bpv;
        let value = if bits_left > 0 {
            (blocks[block_idx] >> bits_left) & layout.mask
        } else if bits_left == 0 {
            let value = blocks[block_idx] & layout.mask;
            block_idx += 1;
            bits_left = 64;
            value
        } else {
            // The value continues in the high bits of the next word.
            let low_bits = (-bits_left) as u32;
            let high = blocks[block_idx] & low_mask(layout.bits_per_value - low_bits);
            block_idx += 1;
            bits_left += 64;
            (high << low_bits) | (blocks[block_idx] >> bits_left)
        };
        emit(i, value);
    }
}

#[inline(always)]
fn encode_blocks(
    layout: PackedLayout,
    iterations: usize,
    value_at: impl Fn(usize) -> u64,
    blocks: &mut [u64],
) {
    let bpv = layout.bits_per_value as i32;
    let mut next = 0u64;
    let mut bits_left = 64i32;
    let mut block_idx = 0;
    for i in 0..layout.long_value_count * iterations {
        let value = value_at(i);
        debug_assert!(value & !layout.mask == 0, "{value} needs more than {bpv} bits");
        bits_left -= bpv;
        if bits_left > 0 {
            next |= value << bits_left;
        } else if bits_left == 0 {
            blocks[block_idx] = next | value;
            block_idx += 1;
            next = 0;
            bits_left = 64;
        } else {
            let low_bits = (-bits_left) as u32;
            blocks[block_idx] = next | (value >> low_bits);
            block_idx += 1;
            bits_left += 64;
            next = (value & low_mask(low_bits)) << bits_left;
        }
    }
}

#[inline(always)]
fn decode_byte_blocks(
    layout: PackedLayout,
    blocks: &[u8],
    iterations: usize,
    mut emit: impl FnMut(usize, u64),
) {
    let bpv = layout.bits_per_value;
    let mut next_value = 0u64;
    let mut bits_left = bpv;
    let mut out = 0;
    for &byte in &blocks[..layout.byte_block_count * iterations] {
        let byte = byte as u64;
        if bits_left > 8 {
            bits_left -= 8;
            next_value |= byte << bits_left;
        } else {
            let mut bits = 8 - bits_left;
            emit(out, next_value | (byte >> bits));
            out += 1;
            while bits >= bpv {
                bits -= bpv;
                emit(out, (byte >> bits) & layout.mask);
                out += 1;
            }
            bits_left = bpv - bits;
            next_value = if bits == 0 {
                0
            } else {
                (byte & low_mask(bits)) << bits_left
            };
        }
    }
    debug_assert_eq!(out, layout.byte_value_count * iterations);
}

#[inline(always)]
fn encode_byte_blocks(
    layout: PackedLayout,
    iterations: usize,
    value_at: impl Fn(usize) -> u64,
    blocks: &mut [u8],
) {
    let bpv = layout.bits_per_value;
    let mut next = 0u64;
    let mut bits_left = 8u32;
    let mut out = 0;
    for i in 0..layout.byte_value_count * iterations {
        let value = value_at(i);
        debug_assert!(value & !layout.mask == 0, "{value} needs more than {bpv} bits");
        if bpv < bits_left {
            next |= value << (bits_left - bpv);
            bits_left -= bpv;
        } else {
            let mut bits = bpv - bits_left;
            blocks[out] = (next | (value >> bits)) as u8;
            out += 1;
            while bits >= 8 {
                bits -= 8;
                blocks[out] = (value >> bits) as u8;
                out += 1;
            }
            bits_left = 8 - bits;
            next = (value & low_mask(bits)) << bits_left;
        }
    }
    debug_assert_eq!(out, layout.byte_block_count * iterations);
}

impl<W: Width> BulkOperation for PackedBulkOperation<W> {
    fn bits_per_value(&self) -> u32 {
        self.0.layout().bits_per_value
    }

    fn long_block_count(&self) -> usize {
        self.0.layout().long_block_count
    }

    fn long_value_count(&self) -> usize {
        self.0.layout().long_value_count
    }

    fn byte_block_count(&self) -> usize {
        self.0.layout().byte_block_count
    }

    fn byte_value_count(&self) -> usize {
        self.0.layout().byte_value_count
    }

    fn decode_longs(&self, blocks: &[u64], values: &mut [i64], iterations: usize) {
        decode_blocks(self.0.layout(), blocks, iterations, |i, v| {
            values[i] = v as i64
        });
    }

    fn decode_bytes(&self, blocks: &[u8], values: &mut [i64], iterations: usize) {
        decode_byte_blocks(self.0.layout(), blocks, iterations, |i, v| {
            values[i] = v as i64
        });
    }

    fn decode_longs_to_ints(
        &self,
        blocks: &[u64],
        values: &mut [i32],
        iterations: usize,
    ) -> Result<()> {
        let layout = self.0.layout();
        if layout.bits_per_value > 32 {
            return too_wide_for_ints(layout.bits_per_value);
        }
        decode_blocks(layout, blocks, iterations, |i, v| values[i] = v as i32);
        Ok(())
    }

    fn decode_bytes_to_ints(
        &self,
        blocks: &[u8],
        values: &mut [i32],
        iterations: usize,
    ) -> Result<()> {
        let layout = self.0.layout();
        if layout.bits_per_value > 32 {
            return too_wide_for_ints(layout.bits_per_value);
        }
        decode_byte_blocks(layout, blocks, iterations, |i, v| values[i] = v as i32);
        Ok(())
    }

    fn encode_longs(&self, values: &[i64], blocks: &mut [u64], iterations: usize) {
        encode_blocks(self.0.layout(), iterations, |i| values[i] as u64, blocks);
    }

    fn encode_longs_to_bytes(&self, values: &[i64], blocks: &mut [u8], iterations: usize) {
        encode_byte_blocks(self.0.layout(), iterations, |i| values[i] as u64, blocks);
    }

    fn encode_ints(&self, values: &[i32], blocks: &mut [u64], iterations: usize) {
        encode_blocks(
            self.0.layout(),
            iterations,
            |i| values[i] as u32 as u64,
            blocks,
        );
    }

    fn encode_ints_to_bytes(&self, values: &[i32], blocks: &mut [u8], iterations: usize) {
        encode_byte_blocks(
            self.0.layout(),
            iterations,
            |i| values[i] as u32 as u64,
            blocks,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let layout = PackedLayout::new(1);
        assert_eq!((layout.long_block_count, layout.long_value_count), (1, 64));
        assert_eq!((layout.byte_block_count, layout.byte_value_count), (1, 8));

        let layout = PackedLayout::new(12);
        assert_eq!((layout.long_block_count, layout.long_value_count), (3, 16));
        assert_eq!((layout.byte_block_count, layout.byte_value_count), (3, 2));

        let layout = PackedLayout::new(64);
        assert_eq!((layout.long_block_count, layout.long_value_count), (1, 1));
        assert_eq!((layout.byte_block_count, layout.byte_value_count), (8, 1));
        assert_eq!(layout.mask, u64::MAX);

        let layout = PackedLayout::new(63);
        assert_eq!((layout.long_block_count, layout.long_value_count), (63, 64));
        assert_eq!((layout.byte_block_count, layout.byte_value_count), (63, 8));
    }

    #[test]
    fn test_straddling_value() {
        // Eight 40-bit values over five words; the second spans the first two.
        let op = PackedBulkOperation(PackedLayout::new(40));
        assert_eq!(op.long_block_count(), 5);
        let values: Vec<i64> = (0..8).map(|i| (0xAB_CDEF_0123 + i) & 0xFF_FFFF_FFFF).collect();
        let mut blocks = vec![0u64; 5];
        op.encode_longs(&values, &mut blocks, 1);
        assert_eq!(blocks[0] >> 24, 0xAB_CDEF_0123);
        let mut decoded = vec![0i64; 8];
        op.decode_longs(&blocks, &mut decoded, 1);
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_full_width_negative() {
        let op = PackedBulkOperation(FixedWidth::<64>);
        let values = [-1i64, i64::MIN, 0, 42];
        let mut bytes = vec![0u8; 32];
        op.encode_longs_to_bytes(&values, &mut bytes, 4);
        assert_eq!(&bytes[..8], &[0xFF; 8]);
        let mut decoded = [0i64; 4];
        op.decode_bytes(&bytes, &mut decoded, 4);
        assert_eq!(decoded, values);
    }
}
