//! Kernels for the single-block layout: `64 / bits_per_value` values per word, value `j`
//! of a word in bits `[j * bits_per_value, (j + 1) * bits_per_value)`.

use arrayref::{array_mut_ref, array_ref};
use bitweave_common::Result;

use super::{BulkOperation, too_wide_for_ints};

#[derive(Debug, Clone, Copy)]
pub struct SingleBlockBulkOperation {
    bits_per_value: u32,
    values_per_block: usize,
    mask: u64,
}

impl SingleBlockBulkOperation {
    pub const fn new(bits_per_value: u32) -> SingleBlockBulkOperation {
        assert!(bits_per_value >= 1 && bits_per_value <= 32);
        SingleBlockBulkOperation {
            bits_per_value,
            values_per_block: (64 / bits_per_value) as usize,
            mask: (1u64 << bits_per_value) - 1,
        }
    }

    #[inline]
    fn decode_with(
        &self,
        iterations: usize,
        block_at: impl Fn(usize) -> u64,
        mut emit: impl FnMut(usize, u64),
    ) {
        let mut out = 0;
        for i in 0..iterations {
            let block = block_at(i);
            for j in 0..self.values_per_block {
                emit(out, (block >> (j as u32 * self.bits_per_value)) & self.mask);
                out += 1;
            }
        }
    }

    #[inline]
    fn encode_with(
        &self,
        iterations: usize,
        value_at: impl Fn(usize) -> u64,
        mut store: impl FnMut(usize, u64),
    ) {
        let mut idx = 0;
        for i in 0..iterations {
            let mut block = 0u64;
            for j in 0..self.values_per_block {
                let value = value_at(idx);
                debug_assert!(value & !self.mask == 0);
                block |= value << (j as u32 * self.bits_per_value);
                idx += 1;
            }
            store(i, block);
        }
    }
}

impl BulkOperation for SingleBlockBulkOperation {
    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    fn long_block_count(&self) -> usize {
        1
    }

    fn long_value_count(&self) -> usize {
        self.values_per_block
    }

    fn byte_block_count(&self) -> usize {
        8
    }

    fn byte_value_count(&self) -> usize {
        self.values_per_block
    }

    fn decode_longs(&self, blocks: &[u64], values: &mut [i64], iterations: usize) {
        self.decode_with(iterations, |i| blocks[i], |i, v| values[i] = v as i64);
    }

    fn decode_bytes(&self, blocks: &[u8], values: &mut [i64], iterations: usize) {
        self.decode_with(
            iterations,
            |i| u64::from_be_bytes(*array_ref![blocks, 8 * i, 8]),
            |i, v| values[i] = v as i64,
        );
    }

    fn decode_longs_to_ints(
        &self,
        blocks: &[u64],
        values: &mut [i32],
        iterations: usize,
    ) -> Result<()> {
        if self.bits_per_value > 32 {
            return too_wide_for_ints(self.bits_per_value);
        }
        self.decode_with(iterations, |i| blocks[i], |i, v| values[i] = v as i32);
        Ok(())
    }

    fn decode_bytes_to_ints(
        &self,
        blocks: &[u8],
        values: &mut [i32],
        iterations: usize,
    ) -> Result<()> {
        if self.bits_per_value > 32 {
            return too_wide_for_ints(self.bits_per_value);
        }
        self.decode_with(
            iterations,
            |i| u64::from_be_bytes(*array_ref![blocks, 8 * i, 8]),
            |i, v| values[i] = v as i32,
        );
        Ok(())
    }

    fn encode_longs(&self, values: &[i64], blocks: &mut [u64], iterations: usize) {
        self.encode_with(iterations, |i| values[i] as u64, |i, b| blocks[i] = b);
    }

    fn encode_longs_to_bytes(&self, values: &[i64], blocks: &mut [u8], iterations: usize) {
        self.encode_with(
            iterations,
            |i| values[i] as u64,
            |i, b| *array_mut_ref![blocks, 8 * i, 8] = b.to_be_bytes(),
        );
    }

    fn encode_ints(&self, values: &[i32], blocks: &mut [u64], iterations: usize) {
        self.encode_with(iterations, |i| values[i] as u32 as u64, |i, b| blocks[i] = b);
    }

    fn encode_ints_to_bytes(&self, values: &[i32], blocks: &mut [u8], iterations: usize) {
        self.encode_with(
            iterations,
            |i| values[i] as u32 as u64,
            |i, b| *array_mut_ref![blocks, 8 * i, 8] = b.to_be_bytes(),
        );
    }
}
