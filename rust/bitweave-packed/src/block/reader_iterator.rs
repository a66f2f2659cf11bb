use bitweave_bits::zigzag;
use bitweave_common::{Error, Result};
use bitweave_io::DataInput;

use super::{
    BPV_SHIFT, MIN_VALUE_EQUALS_0, check_block_size, corrupted_bits_per_value,
    read_block_values, read_block_vlong,
};
use crate::format::Format;

/// Sequential reader over a stream written by
/// [`BlockPackedWriter`](super::BlockPackedWriter).
///
/// Decodes one block at a time. [`skip`](Self::skip) jumps over whole blocks
/// without decoding them.
pub struct BlockPackedReaderIterator<I> {
    input: I,
    value_count: u64,
    values: Vec<i64>,
    blocks: Vec<u8>,
    off: usize,
    ord: u64,
}

impl<I: DataInput> BlockPackedReaderIterator<I> {
    pub fn new(input: I, block_size: usize, value_count: u64) -> Result<Self> {
        check_block_size(block_size)?;
        Ok(BlockPackedReaderIterator {
            input,
            value_count,
            values: vec![0; block_size],
            blocks: Vec::new(),
            off: block_size,
            ord: 0,
        })
    }

    /// Restarts on a new stream of `value_count` values with the same block size.
    pub fn reset(&mut self, input: I, value_count: u64) {
        self.input = input;
        self.value_count = value_count;
        self.off = self.block_size();
        self.ord = 0;
    }

    fn block_size(&self) -> usize {
        self.values.len()
    }

    /// Number of values consumed so far.
    pub fn ord(&self) -> u64 {
        self.ord
    }

    pub fn value_count(&self) -> u64 {
        self.value_count
    }

    pub fn into_inner(self) -> I {
        self.input
    }

    pub fn next_value(&mut self) -> Result<i64> {
        if self.ord == self.value_count {
            return Err(Error::end_of_stream("BlockPackedReaderIterator::next_value"));
        }
        if self.off == self.block_size() {
            self.refill()?;
        }
        let value = self.values[self.off];
        self.off += 1;
        self.ord += 1;
        Ok(value)
    }

    /// Returns between 1 and `count` values, never crossing a block boundary.
    pub fn next_slice(&mut self, count: usize) -> Result<&[i64]> {
        debug_assert!(count > 0);
        if self.ord == self.value_count {
            return Err(Error::end_of_stream("BlockPackedReaderIterator::next_slice"));
        }
        if self.off == self.block_size() {
            self.refill()?;
        }
        let remaining = self.value_count - self.ord;
        let count = count
            .min(self.block_size() - self.off)
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let start = self.off;
        self.off += count;
        self.ord += count as u64;
        Ok(&self.values[start..start + count])
    }

    /// Skips `count` values. Fails without moving if fewer than `count` remain.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        match self.ord.checked_add(count) {
            Some(target) if target <= self.value_count => {}
            _ => return Err(Error::end_of_stream("BlockPackedReaderIterator::skip")),
        }
        let block_size = self.block_size();

        let buffered = count.min((block_size - self.off) as u64);
        self.off += buffered as usize;
        self.ord += buffered;
        let mut count = count - buffered;
        if count == 0 {
            return Ok(());
        }

        debug_assert_eq!(self.off, block_size);
        while count >= block_size as u64 {
            let token = self.input.read_byte()?;
            let bits_per_value = (token >> BPV_SHIFT) as u32;
            if bits_per_value > 64 {
                return Err(corrupted_bits_per_value(bits_per_value));
            }
            if token & MIN_VALUE_EQUALS_0 == 0 {
                read_block_vlong(&mut self.input)?;
            }
            if bits_per_value > 0 {
                let block_bytes = Format::Packed.byte_count(block_size, bits_per_value);
                self.input.skip_bytes(block_bytes)?;
            }
            self.ord += block_size as u64;
            count -= block_size as u64;
        }
        if count == 0 {
            return Ok(());
        }

        self.refill()?;
        self.ord += count;
        self.off += count as usize;
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        let token = self.input.read_byte()?;
        let min_equals_0 = token & MIN_VALUE_EQUALS_0 != 0;
        let bits_per_value = (token >> BPV_SHIFT) as u32;
        if bits_per_value > 64 {
            return Err(corrupted_bits_per_value(bits_per_value));
        }
        let min = if min_equals_0 {
            0
        } else {
            zigzag::decode(read_block_vlong(&mut self.input)?.wrapping_add(1) as i64)
        };

        if bits_per_value == 0 {
            self.values.fill(min);
        } else {
            let block_size = self.block_size() as u64;
            let count = (self.value_count - self.ord).min(block_size) as usize;
            read_block_values(
                &mut self.input,
                bits_per_value,
                count,
                &mut self.values,
                &mut self.blocks,
            )?;
            if min != 0 {
                for value in &mut self.values[..count] {
                    *value = value.wrapping_add(min);
                }
            }
        }
        self.off = 0;
        Ok(())
    }
}

impl<I: DataInput> Iterator for BlockPackedReaderIterator<I> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Result<i64>> {
        if self.ord == self.value_count {
            return None;
        }
        Some(self.next_value())
    }
}
