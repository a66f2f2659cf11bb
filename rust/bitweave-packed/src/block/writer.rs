use bitweave_bits::{
    word::{max_value, unsigned_bits_required},
    zigzag,
};
use bitweave_common::Result;
use bitweave_io::DataOutput;

use super::{BPV_SHIFT, BlockBuffer, MIN_VALUE_EQUALS_0, write_block_vlong};

/// Writes a stream of `i64` values in independently packed blocks, each stored as
/// offsets from the block minimum.
///
/// Values are buffered until a block is full. [`finish`](Self::finish) must be called
/// to write the final, possibly partial, block; nothing else marks the end of the
/// stream, so readers are told the value count separately.
pub struct BlockPackedWriter<O> {
    buf: BlockBuffer<O>,
}

impl<O: DataOutput> BlockPackedWriter<O> {
    pub fn new(out: O, block_size: usize) -> Result<BlockPackedWriter<O>> {
        Ok(BlockPackedWriter {
            buf: BlockBuffer::new(out, block_size)?,
        })
    }

    pub fn add(&mut self, value: i64) -> Result<()> {
        self.buf.check_not_finished()?;
        if self.buf.is_full() {
            self.flush()?;
        }
        self.buf.push(value);
        Ok(())
    }

    /// Flushes the pending block. The writer accepts no more values afterwards.
    pub fn finish(&mut self) -> Result<()> {
        self.buf.check_not_finished()?;
        if self.buf.off > 0 {
            self.flush()?;
        }
        self.buf.set_finished();
        Ok(())
    }

    /// Number of values added so far.
    pub fn ord(&self) -> u64 {
        self.buf.ord
    }

    pub fn into_inner(self) -> O {
        self.buf.out
    }

    fn flush(&mut self) -> Result<()> {
        let buf = &mut self.buf;
        let block = &buf.values[..buf.off];
        let mut min = block.iter().copied().min().unwrap_or(0);
        let max = block.iter().copied().max().unwrap_or(0);

        let delta = max.wrapping_sub(min);
        let bits_per_value = if delta == 0 {
            0
        } else {
            unsigned_bits_required(delta as u64)
        };
        if bits_per_value == 64 {
            min = 0;
        } else if min > 0 && bits_per_value > 0 {
            // Prefer a zero minimum when the values fit anyway: it saves the vlong.
            min = (max - max_value(bits_per_value)).max(0);
        }

        let mut token = (bits_per_value as u8) << BPV_SHIFT;
        if min == 0 {
            token |= MIN_VALUE_EQUALS_0;
        }
        buf.out.write_byte(token)?;
        if min != 0 {
            write_block_vlong(&mut buf.out, (zigzag::encode(min) as u64).wrapping_sub(1))?;
        }

        if bits_per_value > 0 {
            if min != 0 {
                for value in &mut buf.values[..buf.off] {
                    *value = value.wrapping_sub(min);
                }
            }
            buf.write_values(bits_per_value)?;
        }
        log::trace!(
            "flushed block of {} values: min {}, {} bits",
            buf.off,
            min,
            bits_per_value
        );
        buf.off = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(block_size: usize, values: &[i64]) -> Vec<u8> {
        let mut writer = BlockPackedWriter::new(Vec::new(), block_size).unwrap();
        for &v in values {
            writer.add(v).unwrap();
        }
        writer.finish().unwrap();
        assert_eq!(writer.ord(), values.len() as u64);
        writer.into_inner()
    }

    #[test]
    fn test_constant_block_is_one_token() {
        // Zero minimum, zero width.
        assert_eq!(encode(64, &[0; 64]), vec![MIN_VALUE_EQUALS_0]);
        // Non-zero constant: token, then vlong(zigzag(5) - 1) = 9.
        assert_eq!(encode(64, &[5; 10]), vec![0, 9]);
    }

    #[test]
    fn test_positive_minimum_is_dropped_when_redundant() {
        // 1 and 3 fit in the 2 bits the range needs, so no minimum is stored.
        assert_eq!(encode(64, &[1, 3]), vec![(2 << BPV_SHIFT) | MIN_VALUE_EQUALS_0, 0b0111_0000]);
        // 6 does not: store min 3 as vlong(zigzag(3) - 1), then offsets 0 and 3.
        assert_eq!(encode(64, &[3, 6]), vec![2 << BPV_SHIFT, 5, 0b0011_0000]);
    }

    #[test]
    fn test_full_range_block() {
        let bytes = encode(64, &[i64::MIN, i64::MAX]);
        assert_eq!(bytes[0], (64 << BPV_SHIFT) as u8 | MIN_VALUE_EQUALS_0);
        assert_eq!(bytes.len(), 1 + 16);
    }

    #[test]
    fn test_use_after_finish() {
        let mut writer = BlockPackedWriter::new(Vec::new(), 64).unwrap();
        writer.add(1).unwrap();
        writer.finish().unwrap();
        assert!(writer.add(2).is_err());
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_empty_stream_writes_nothing() {
        assert!(encode(128, &[]).is_empty());
        assert!(BlockPackedWriter::new(Vec::new(), 48).is_err());
    }
}
