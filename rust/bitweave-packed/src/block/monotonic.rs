use bitweave_bits::{word::unsigned_bits_required, zigzag};
use bitweave_common::{Result, verify_arg};
use bitweave_io::{DataInput, DataOutput};

use super::{BlockBuffer, check_block_size, corrupted_bits_per_value};
use crate::{
    format::Format,
    reader::{NullReader, Reader},
    serialize::get_reader_no_header,
    util::{linear_expected, num_blocks},
};

/// Block writer for non-negative, mostly increasing sequences such as file offsets.
///
/// Each block is modeled as a line from its first value with the average slope up
/// to its last value; only the zigzag-encoded distance from that line is packed.
pub struct MonotonicBlockPackedWriter<O> {
    buf: BlockBuffer<O>,
}

impl<O: DataOutput> MonotonicBlockPackedWriter<O> {
    pub fn new(out: O, block_size: usize) -> Result<MonotonicBlockPackedWriter<O>> {
        Ok(MonotonicBlockPackedWriter {
            buf: BlockBuffer::new(out, block_size)?,
        })
    }

    /// Adds a value. Negative values are rejected.
    pub fn add(&mut self, value: i64) -> Result<()> {
        self.buf.check_not_finished()?;
        verify_arg!(value, value >= 0);
        if self.buf.is_full() {
            self.flush()?;
        }
        self.buf.push(value);
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.buf.check_not_finished()?;
        if self.buf.off > 0 {
            self.flush()?;
        }
        self.buf.set_finished();
        Ok(())
    }

    pub fn ord(&self) -> u64 {
        self.buf.ord
    }

    pub fn into_inner(self) -> O {
        self.buf.out
    }

    fn flush(&mut self) -> Result<()> {
        let buf = &mut self.buf;
        let off = buf.off;
        let min = buf.values[0];
        let average = if off == 1 {
            0.0
        } else {
            (buf.values[off - 1] - min) as f32 / (off - 1) as f32
        };

        let mut max_zigzag = 0u64;
        for (i, value) in buf.values[..off].iter_mut().enumerate() {
            let residual = value.wrapping_sub(min).wrapping_sub(linear_expected(average, i));
            *value = zigzag::encode(residual);
            max_zigzag = max_zigzag.max(*value as u64);
        }

        buf.out.write_vlong(min)?;
        buf.out.write_int(average.to_bits() as i32)?;
        if max_zigzag == 0 {
            buf.out.write_vint(0)?;
        } else {
            let bits_per_value = unsigned_bits_required(max_zigzag);
            buf.out.write_vint(bits_per_value as i32)?;
            buf.write_values(bits_per_value)?;
        }
        log::trace!("flushed monotonic block of {off} values: min {min}, average {average}");
        buf.off = 0;
        Ok(())
    }
}

/// Random access over a stream written by [`MonotonicBlockPackedWriter`].
pub struct MonotonicBlockPackedReader {
    block_shift: u32,
    block_mask: u64,
    value_count: u64,
    min_values: Vec<i64>,
    averages: Vec<f32>,
    sub_readers: Vec<Box<dyn Reader>>,
}

impl MonotonicBlockPackedReader {
    pub fn read<I>(
        input: &mut I,
        block_size: usize,
        value_count: u64,
    ) -> Result<MonotonicBlockPackedReader>
    where
        I: DataInput + ?Sized,
    {
        let block_shift = check_block_size(block_size)?;
        let block_count = num_blocks(value_count, block_size)?;
        let mut min_values = Vec::with_capacity(block_count);
        let mut averages = Vec::with_capacity(block_count);
        let mut sub_readers: Vec<Box<dyn Reader>> = Vec::with_capacity(block_count);
        for i in 0..block_count {
            min_values.push(input.read_vlong()?);
            averages.push(f32::from_bits(input.read_int()? as u32));
            let bits_per_value = input.read_vint()? as u32;
            if bits_per_value > 64 {
                return Err(corrupted_bits_per_value(bits_per_value));
            }
            let size = (value_count - (i as u64) * block_size as u64).min(block_size as u64) as usize;
            if bits_per_value == 0 {
                sub_readers.push(Box::new(NullReader::new(size)));
            } else {
                sub_readers.push(get_reader_no_header(
                    input,
                    Format::Packed,
                    size,
                    bits_per_value,
                )?);
            }
        }
        Ok(MonotonicBlockPackedReader {
            block_shift,
            block_mask: block_size as u64 - 1,
            value_count,
            min_values,
            averages,
            sub_readers,
        })
    }

    pub fn get(&self, index: u64) -> i64 {
        debug_assert!(index < self.value_count);
        let block = (index >> self.block_shift) as usize;
        let element = (index & self.block_mask) as usize;
        self.min_values[block]
            .wrapping_add(linear_expected(self.averages[block], element))
            .wrapping_add(zigzag::decode(self.sub_readers[block].get(element)))
    }

    pub fn size(&self) -> u64 {
        self.value_count
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + 8 * self.min_values.capacity()
            + 4 * self.averages.capacity()
            + self
                .sub_readers
                .iter()
                .map(|r| std::mem::size_of::<Box<dyn Reader>>() + r.ram_bytes_used())
                .sum::<usize>()
    }
}
