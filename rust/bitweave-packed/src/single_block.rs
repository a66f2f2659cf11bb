//! Array in the single-block layout: no value spans two words.

use bitweave_common::{Error, Result, verify_arg};
use bitweave_io::DataInput;

use crate::{
    MAX_VALUE_COUNT,
    bulk::{BulkOperation, bulk_operation},
    format::Format,
    reader::{Mutable, Reader},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed64SingleBlock {
    blocks: Vec<u64>,
    value_count: usize,
    bits_per_value: u32,
    values_per_block: usize,
    mask: u64,
}

impl Packed64SingleBlock {
    pub fn is_supported(bits_per_value: u32) -> bool {
        Format::PackedSingleBlock.is_supported(bits_per_value)
    }

    pub fn new(value_count: usize, bits_per_value: u32) -> Result<Packed64SingleBlock> {
        verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
        if !Self::is_supported(bits_per_value) {
            return Err(Error::invalid_arg(
                "bits_per_value",
                format!("{bits_per_value} is not a single-block width"),
            ));
        }
        Ok(Packed64SingleBlock::alloc(value_count, bits_per_value))
    }

    pub(crate) fn alloc(value_count: usize, bits_per_value: u32) -> Packed64SingleBlock {
        let values_per_block = (64 / bits_per_value) as usize;
        Packed64SingleBlock {
            blocks: vec![0; value_count.div_ceil(values_per_block)],
            value_count,
            bits_per_value,
            values_per_block,
            mask: (1u64 << bits_per_value) - 1,
        }
    }

    pub(crate) fn read_from<I: DataInput + ?Sized>(
        input: &mut I,
        value_count: usize,
        bits_per_value: u32,
    ) -> Result<Packed64SingleBlock> {
        let mut array = Packed64SingleBlock::new(value_count, bits_per_value)?;
        for block in array.blocks.iter_mut() {
            *block = input.read_long()? as u64;
        }
        Ok(array)
    }

    fn op(&self) -> &'static dyn BulkOperation {
        bulk_operation(Format::PackedSingleBlock, self.bits_per_value)
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        let block = index / self.values_per_block;
        let shift = (index % self.values_per_block) as u32 * self.bits_per_value;
        (block, shift)
    }
}

impl Reader for Packed64SingleBlock {
    #[inline]
    fn get(&self, index: usize) -> i64 {
        debug_assert!(index < self.value_count);
        let (block, shift) = self.locate(index);
        ((self.blocks[block] >> shift) & self.mask) as i64
    }

    fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
        debug_assert!(index < self.value_count);
        let mut len = buf.len().min(self.value_count - index);
        let mut index = index;
        let mut off = 0;

        let offset_in_block = index % self.values_per_block;
        if offset_in_block != 0 {
            for _ in offset_in_block..self.values_per_block {
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

        let block_index = index / self.values_per_block;
        let blocks = (index + len) / self.values_per_block - block_index;
        self.op()
            .decode_longs(&self.blocks[block_index..], &mut buf[off..], blocks);
        let decoded = blocks * self.values_per_block;
        off += decoded;
        len -= decoded;

        if off > 0 {
            off
        } else {
            for (i, slot) in buf[..len].iter_mut().enumerate() {
                *slot = self.get(index + i);
            }
            len
        }
    }

    fn size(&self) -> usize {
        self.value_count
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + 8 * self.blocks.len()
    }
}

impl Mutable for Packed64SingleBlock {
    fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    #[inline]
    fn set(&mut self, index: usize, value: i64) {
        debug_assert!(index < self.value_count);
        debug_assert!((value as u64) & !self.mask == 0);
        let (block, shift) = self.locate(index);
        let word = &mut self.blocks[block];
        *word = (*word & !(self.mask << shift)) | ((value as u64) << shift);
    }

    fn set_bulk(&mut self, index: usize, values: &[i64]) -> usize {
        debug_assert!(index < self.value_count);
        let mut len = values.len().min(self.value_count - index);
        let mut index = index;
        let mut off = 0;

        let offset_in_block = index % self.values_per_block;
        if offset_in_block != 0 {
            for _ in offset_in_block..self.values_per_block {
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

        let block_index = index / self.values_per_block;
        let blocks = (index + len) / self.values_per_block - block_index;
        let op = self.op();
        op.encode_longs(&values[off..], &mut self.blocks[block_index..], blocks);
        let encoded = blocks * self.values_per_block;
        off += encoded;
        len -= encoded;

        if off > 0 {
            off
        } else {
            for (i, &value) in values[..len].iter().enumerate() {
                self.set(index + i, value);
            }
            len
        }
    }

    fn fill(&mut self, from: usize, to: usize, value: i64) {
        debug_assert!(from <= to && to <= self.value_count);
        debug_assert!((value as u64) & !self.mask == 0);
        if to - from <= self.values_per_block << 1 {
            for i in from..to {
                self.set(i, value);
            }
            return;
        }

        let mut from = from;
        let offset_in_block = from % self.values_per_block;
        if offset_in_block != 0 {
            for _ in offset_in_block..self.values_per_block {
                self.set(from, value);
                from += 1;
            }
        }

        let from_block = from / self.values_per_block;
        let to_block = to / self.values_per_block;
        let mut pattern = 0u64;
        for i in 0..self.values_per_block {
            pattern |= (value as u64) << (i as u32 * self.bits_per_value);
        }
        self.blocks[from_block..to_block].fill(pattern);

        for i in self.values_per_block * to_block..to {
            self.set(i, value);
        }
    }

    fn clear(&mut self) {
        self.blocks.fill(0);
    }

    fn format(&self) -> Format {
        Format::PackedSingleBlock
    }
}

#[cfg(test)]
mod tests {
    use bitweave_bits::word::max_value;

    use super::*;
    use crate::format::SINGLE_BLOCK_BITS;

    #[test]
    fn test_set_get_fill() {
        let mut rng = fastrand::Rng::with_seed(21);
        for bits_per_value in SINGLE_BLOCK_BITS {
            let mut array = Packed64SingleBlock::new(777, bits_per_value).unwrap();
            let values: Vec<i64> = (0..777)
                .map(|_| rng.i64(0..=max_value(bits_per_value)))
                .collect();
            for (i, &v) in values.iter().enumerate() {
                array.set(i, v);
            }
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(array.get(i), v);
            }

            let fill = max_value(bits_per_value);
            array.fill(3, 700, fill);
            assert!((3..700).all(|i| array.get(i) == fill));
            assert_eq!(array.get(2), values[2]);
            assert_eq!(array.get(700), values[700]);
        }
    }

    #[test]
    fn test_bulk() {
        let mut array = Packed64SingleBlock::new(100, 21).unwrap();
        let values: Vec<i64> = (0..97).map(|i| i * 1000).collect();
        let mut done = 0;
        while done < values.len() {
            done += array.set_bulk(1 + done, &values[done..]);
        }
        let mut buf = vec![0i64; 97];
        let mut done = 0;
        while done < buf.len() {
            done += array.get_bulk(1 + done, &mut buf[done..]);
        }
        assert_eq!(buf, values);
    }

    #[test]
    fn test_unsupported_width() {
        assert!(Packed64SingleBlock::new(10, 11).is_err());
        assert!(Packed64SingleBlock::new(10, 64).is_err());
        assert_eq!(
            Packed64SingleBlock::new(10, 32).unwrap().format(),
            Format::PackedSingleBlock
        );
    }
}
