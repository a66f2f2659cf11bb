use bitweave_bits::zigzag;
use bitweave_common::Result;
use bitweave_io::DataInput;

use super::{
    BPV_SHIFT, MIN_VALUE_EQUALS_0, check_block_size, corrupted_bits_per_value, read_block_vlong,
};
use crate::{
    format::Format,
    reader::{NullReader, Reader},
    serialize::get_reader_no_header,
    util::num_blocks,
};

/// Random access over a block-packed stream, loaded fully into memory.
pub struct BlockPackedReader {
    block_shift: u32,
    block_mask: u64,
    value_count: u64,
    min_values: Option<Vec<i64>>,
    sub_readers: Vec<Box<dyn Reader>>,
}

impl BlockPackedReader {
    /// Reads every block of a stream of `value_count` values.
    pub fn read<I>(input: &mut I, block_size: usize, value_count: u64) -> Result<BlockPackedReader>
    where
        I: DataInput + ?Sized,
    {
        let block_shift = check_block_size(block_size)?;
        let block_count = num_blocks(value_count, block_size)?;
        let mut min_values: Option<Vec<i64>> = None;
        let mut sub_readers: Vec<Box<dyn Reader>> = Vec::with_capacity(block_count);
        for i in 0..block_count {
            let token = input.read_byte()?;
            let bits_per_value = (token >> BPV_SHIFT) as u32;
            if bits_per_value > 64 {
                return Err(corrupted_bits_per_value(bits_per_value));
            }
            if token & MIN_VALUE_EQUALS_0 == 0 {
                let min = zigzag::decode(read_block_vlong(input)?.wrapping_add(1) as i64);
                min_values.get_or_insert_with(|| vec![0; block_count])[i] = min;
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
        log::debug!(
            "loaded {} values in {} blocks of {}",
            value_count,
            block_count,
            block_size
        );
        Ok(BlockPackedReader {
            block_shift,
            block_mask: block_size as u64 - 1,
            value_count,
            min_values,
            sub_readers,
        })
    }

    pub fn get(&self, index: u64) -> i64 {
        debug_assert!(index < self.value_count);
        let block = (index >> self.block_shift) as usize;
        let element = (index & self.block_mask) as usize;
        let min = self.min_values.as_ref().map_or(0, |mins| mins[block]);
        min.wrapping_add(self.sub_readers[block].get(element))
    }

    pub fn size(&self) -> u64 {
        self.value_count
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.min_values.as_ref().map_or(0, |mins| 8 * mins.capacity())
            + self
                .sub_readers
                .iter()
                .map(|r| std::mem::size_of::<Box<dyn Reader>>() + r.ram_bytes_used())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use bitweave_io::ByteSliceInput;

    use super::*;
    use crate::block::BlockPackedWriter;

    #[test]
    fn test_random_access_matches_input() {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut values: Vec<i64> = (0..1000).map(|_| rng.i64(..)).collect();
        values.extend((0..300).map(|i| 1 << 40 | i));
        values.extend(vec![-3; 200]);
        values.extend((0..77).map(|_| rng.i64(0..16)));

        let mut writer = BlockPackedWriter::new(Vec::new(), 256).unwrap();
        for &v in &values {
            writer.add(v).unwrap();
        }
        writer.finish().unwrap();
        let bytes = writer.into_inner();

        let mut input = ByteSliceInput::new(&bytes);
        let reader = BlockPackedReader::read(&mut input, 256, values.len() as u64).unwrap();
        assert!(input.is_eof());
        assert_eq!(reader.size(), values.len() as u64);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(reader.get(i as u64), v, "{i}");
        }
        assert!(reader.ram_bytes_used() > 0);
    }

    #[test]
    fn test_truncated_input() {
        let mut writer = BlockPackedWriter::new(Vec::new(), 64).unwrap();
        for i in 0..100 {
            writer.add(i * 3).unwrap();
        }
        writer.finish().unwrap();
        let bytes = writer.into_inner();
        let mut input = ByteSliceInput::new(&bytes[..bytes.len() - 2]);
        assert!(BlockPackedReader::read(&mut input, 64, 100).is_err());
    }
}
