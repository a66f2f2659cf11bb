//! Contiguous-bits array over 64-bit words, for any width in `1..=64`.

use bitweave_bits::word::{gcd, low_mask};
use bitweave_common::{Result, verify_arg};
use bitweave_io::DataInput;

use crate::{
    MAX_VALUE_COUNT,
    bulk::{BulkOperation, bulk_operation},
    format::Format,
    reader::{Mutable, Reader},
};

/// Values are stored back to back, most significant bit first, and a value may span
/// two words. Byte for byte this is the `Packed` serialization format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed64 {
    blocks: Vec<u64>,
    value_count: usize,
    bits_per_value: u32,
    mask_right: u64,
    bpv_minus_block_size: i64,
}

impl Packed64 {
    pub fn new(value_count: usize, bits_per_value: u32) -> Result<Packed64> {
        verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
        verify_arg!(bits_per_value, (1..=64).contains(&bits_per_value));
        Ok(Packed64::alloc(value_count, bits_per_value))
    }

    pub(crate) fn alloc(value_count: usize, bits_per_value: u32) -> Packed64 {
        let long_count = Format::Packed.long_count(value_count, bits_per_value) as usize;
        Packed64::with_blocks(vec![0; long_count], value_count, bits_per_value)
    }

    fn with_blocks(blocks: Vec<u64>, value_count: usize, bits_per_value: u32) -> Packed64 {
        Packed64 {
            blocks,
            value_count,
            bits_per_value,
            mask_right: low_mask(bits_per_value),
            bpv_minus_block_size: bits_per_value as i64 - 64,
        }
    }

    /// Reads the `Packed` serialization of `value_count` values: whole big-endian longs,
    /// then the trailing bytes, which land in the high bits of the last word.
    pub(crate) fn read_from<I: DataInput + ?Sized>(
        input: &mut I,
        value_count: usize,
        bits_per_value: u32,
    ) -> Result<Packed64> {
        let mut array = Packed64::new(value_count, bits_per_value)?;
        let byte_count = Format::Packed.byte_count(value_count, bits_per_value);
        let full_longs = (byte_count / 8) as usize;
        for block in &mut array.blocks[..full_longs] {
            *block = input.read_long()? as u64;
        }
        let remaining = (byte_count % 8) as usize;
        if remaining != 0 {
            let mut last = 0u64;
            for i in 0..remaining {
                last |= (input.read_byte()? as u64) << (56 - 8 * i);
            }
            if let Some(block) = array.blocks.last_mut() {
                *block = last;
            }
        }
        Ok(array)
    }

    pub fn blocks(&self) -> &[u64] {
        &self.blocks
    }

    fn op(&self) -> &'static dyn BulkOperation {
        bulk_operation(Format::Packed, self.bits_per_value)
    }

    /// Word index of the value and the signed position of its last bit relative to the
    /// end of that word (positive when the value spills into the next word).
    #[inline]
    fn locate(&self, index: usize) -> (usize, i64) {
        let major_bit_pos = index as u64 * self.bits_per_value as u64;
        let element_pos = (major_bit_pos >> 6) as usize;
        let end_bits = (major_bit_pos & 63) as i64 + self.bpv_minus_block_size;
        (element_pos, end_bits)
    }
}

impl Reader for Packed64 {
    #[inline]
    fn get(&self, index: usize) -> i64 {
        debug_assert!(index < self.value_count);
        let (element_pos, end_bits) = self.locate(index);
        let value = if end_bits <= 0 {
            self.blocks[element_pos] >> -end_bits
        } else {
            (self.blocks[element_pos] << end_bits)
                | (self.blocks[element_pos + 1] >> (64 - end_bits))
        };
        (value & self.mask_right) as i64
    }

    fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
        debug_assert!(index < self.value_count);
        let mut len = buf.len().min(self.value_count - index);
        let op = self.op();
        let long_value_count = op.long_value_count();
        let mut index = index;
        let mut off = 0;

        // Single values up to the next position that starts on a word boundary.
        let offset_in_blocks = index % long_value_count;
        if offset_in_blocks != 0 {
            for _ in offset_in_blocks..long_value_count {
                if len == 0 {
                    break;
                }
                buf[off] = self.get(index);
                off += 1;
                index += 1;
                len -= 1;
            }
            if len == 0 {
                return off;
            }
        }

        let block_index = (index as u64 * self.bits_per_value as u64 >> 6) as usize;
        let iterations = len / long_value_count;
        op.decode_longs(&self.blocks[block_index..], &mut buf[off..], iterations);
        let decoded = iterations * long_value_count;
        off += decoded;
        len -= decoded;

        if off > 0 {
            off
        } else {
            debug_assert!(len > 0);
            let count = len.min(buf.len());
            for (i, slot) in buf[..count].iter_mut().enumerate() {
                *slot = self.get(index + i);
            }
            count
        }
    }

    fn size(&self) -> usize {
        self.value_count
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + 8 * self.blocks.len()
    }
}

impl Mutable for Packed64 {
    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    #[inline]
    fn set(&mut self, index: usize, value: i64) {
        debug_assert!(index < self.value_count);
        let value = value as u64;
        debug_assert!(value & !self.mask_right == 0);
        let (element_pos, end_bits) = self.locate(index);
        if end_bits <= 0 {
            let shift = -end_bits;
            let block = &mut self.blocks[element_pos];
            *block = (*block & !(self.mask_right << shift)) | (value << shift);
        } else {
            let block = &mut self.blocks[element_pos];
            *block = (*block & !(self.mask_right >> end_bits)) | (value >> end_bits);
            let next = &mut self.blocks[element_pos + 1];
            *next = (*next & (u64::MAX >> end_bits)) | (value << (64 - end_bits));
        }
    }

    fn set_bulk(&mut self, index: usize, values: &[i64]) -> usize {
        debug_assert!(index < self.value_count);
        let mut len = values.len().min(self.value_count - index);
        let op = self.op();
        let long_value_count = op.long_value_count();
        let mut index = index;
        let mut off = 0;

        let offset_in_blocks = index % long_value_count;
        if offset_in_blocks != 0 {
            for _ in offset_in_blocks..long_value_count {
                if len == 0 {
                    break;
                }
                self.set(index, values[off]);
                off += 1;
                index += 1;
                len -= 1;
            }
            if len == 0 {
                return off;
            }
        }

        let block_index = (index as u64 * self.bits_per_value as u64 >> 6) as usize;
        let iterations = len / long_value_count;
        op.encode_longs(&values[off..], &mut self.blocks[block_index..], iterations);
        let encoded = iterations * long_value_count;
        off += encoded;
        len -= encoded;

        if off > 0 {
            off
        } else {
            debug_assert!(len > 0);
            let count = len.min(values.len());
            for (i, &value) in values[..count].iter().enumerate() {
                self.set(index + i, value);
            }
            count
        }
    }

    fn fill(&mut self, from: usize, to: usize, value: i64) {
        debug_assert!(from <= to && to <= self.value_count);
        debug_assert!((value as u64) & !self.mask_right == 0);
        let bits_per_value = self.bits_per_value as u64;
        // Smallest run of values that covers a whole number of words.
        let aligned_values = 64 / gcd(64, self.bits_per_value as usize);
        if to - from <= 3 * aligned_values {
            for i in from..to {
                self.set(i, value);
            }
            return;
        }

        let mut from = from;
        let from_mod = from % aligned_values;
        if from_mod != 0 {
            for _ in from_mod..aligned_values {
                self.set(from, value);
                from += 1;
            }
        }

        let aligned_blocks = (aligned_values as u64 * bits_per_value >> 6) as usize;
        let mut pattern = Packed64::alloc(aligned_values, self.bits_per_value);
        for i in 0..aligned_values {
            pattern.set(i, value);
        }
        let start_block = (from as u64 * bits_per_value >> 6) as usize;
        let end_block = (to as u64 * bits_per_value >> 6) as usize;
        for block in start_block..end_block {
            self.blocks[block] = pattern.blocks[block % aligned_blocks];
        }

        let tail = ((end_block as u64) << 6) / bits_per_value;
        for i in tail as usize..to {
            self.set(i, value);
        }
    }

    fn clear(&mut self) {
        self.blocks.fill(0);
    }
}
