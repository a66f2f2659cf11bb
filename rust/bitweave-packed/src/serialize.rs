//! Self-describing serialization of packed arrays.
//!
//! A stream starts with the `PackedInts` codec header followed by `vint bits_per_value`,
//! `vint value_count` and `vint format_id`, then the values encoded in that format.
//! [`PackedWriter`] produces the body incrementally; [`get_reader`] materializes it as an
//! in-memory array and [`PackedReaderIterator`] decodes it sequentially.

use bitweave_bits::word::max_value;
use bitweave_common::{Error, Result, verify_arg, verify_data};
use bitweave_io::{DataInput, DataOutput, codec};

use crate::{
    MAX_VALUE_COUNT,
    bulk::{BulkOperation, bulk_operation},
    direct::{Direct8, Direct16, Direct32, Direct64},
    format::Format,
    packed64::Packed64,
    reader::{Mutable, Reader},
    single_block::Packed64SingleBlock,
    three_blocks::{Packed8ThreeBlocks, Packed16ThreeBlocks},
};

pub const CODEC_NAME: &str = "PackedInts";
pub const VERSION_START: i32 = 2;
pub const VERSION_CURRENT: i32 = 2;

/// Decoded stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedHeader {
    pub format: Format,
    pub value_count: usize,
    pub bits_per_value: u32,
    pub version: i32,
}

pub fn write_header<O>(
    out: &mut O,
    format: Format,
    value_count: usize,
    bits_per_value: u32,
) -> Result<()>
where
    O: DataOutput + ?Sized,
{
    verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
    verify_arg!(bits_per_value, format.is_supported(bits_per_value));
    codec::write_header(out, CODEC_NAME, VERSION_CURRENT)?;
    out.write_vint(bits_per_value as i32)?;
    out.write_vint(value_count as i32)?;
    out.write_vint(format.id())
}

pub fn read_header<I>(input: &mut I) -> Result<PackedHeader>
where
    I: DataInput + ?Sized,
{
    let version = codec::check_header(input, CODEC_NAME, VERSION_START, VERSION_CURRENT)?;
    let bits_per_value = input.read_vint()?;
    verify_data!(bits_per_value, (1..=64).contains(&bits_per_value));
    let value_count = input.read_vint()?;
    verify_data!(value_count, value_count >= 0);
    let format = Format::from_id(input.read_vint()?)?;
    verify_data!(bits_per_value, format.is_supported(bits_per_value as u32));
    Ok(PackedHeader {
        format,
        value_count: value_count as usize,
        bits_per_value: bits_per_value as u32,
        version,
    })
}

/// Streams a known number of values into their packed byte form.
///
/// Values are buffered, encoded a batch at a time, and `finish` pads the stream with
/// zeros up to the declared value count.
pub struct PackedWriter<O> {
    out: O,
    format: Format,
    value_count: usize,
    bits_per_value: u32,
    op: &'static dyn BulkOperation,
    iterations: usize,
    next_blocks: Vec<u8>,
    next_values: Vec<i64>,
    off: usize,
    written: usize,
    finished: bool,
}

impl<O: DataOutput> PackedWriter<O> {
    /// Creates a writer that emits only the body; the reader must learn the layout
    /// out of band. `mem` bounds the size of the internal buffers in bytes.
    pub fn new(
        out: O,
        format: Format,
        value_count: usize,
        bits_per_value: u32,
        mem: usize,
    ) -> Result<PackedWriter<O>> {
        verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
        verify_arg!(bits_per_value, format.is_supported(bits_per_value));
        let op = bulk_operation(format, bits_per_value);
        let iterations = op.compute_iterations(value_count, mem);
        Ok(PackedWriter {
            out,
            format,
            value_count,
            bits_per_value,
            op,
            iterations,
            next_blocks: vec![0; iterations * op.byte_block_count()],
            next_values: vec![0; iterations * op.byte_value_count()],
            off: 0,
            written: 0,
            finished: false,
        })
    }

    /// Writes the stream header, then returns a writer for the body.
    pub fn with_header(
        mut out: O,
        format: Format,
        value_count: usize,
        bits_per_value: u32,
        mem: usize,
    ) -> Result<PackedWriter<O>> {
        write_header(&mut out, format, value_count, bits_per_value)?;
        PackedWriter::new(out, format, value_count, bits_per_value, mem)
    }

    pub fn add(&mut self, value: i64) -> Result<()> {
        debug_assert!(
            self.bits_per_value == 64 || (0..=max_value(self.bits_per_value)).contains(&value)
        );
        if self.finished {
            return Err(Error::invalid_operation("PackedWriter::add after finish"));
        }
        if self.written >= self.value_count {
            return Err(Error::invalid_operation("PackedWriter::add past value count"));
        }
        self.next_values[self.off] = value;
        self.off += 1;
        if self.off == self.next_values.len() {
            self.flush()?;
        }
        self.written += 1;
        Ok(())
    }

    /// Pads the remaining values with zeros and flushes the buffered values.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_operation("PackedWriter::finish called twice"));
        }
        while self.written < self.value_count {
            self.add(0)?;
        }
        self.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Index of the last value added, or -1 before the first one.
    pub fn ord(&self) -> i64 {
        self.written as i64 - 1
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    pub fn into_inner(self) -> O {
        self.out
    }

    fn flush(&mut self) -> Result<()> {
        self.op
            .encode_longs_to_bytes(&self.next_values, &mut self.next_blocks, self.iterations);
        let byte_count = self.format.byte_count(self.off, self.bits_per_value) as usize;
        self.out.write_bytes(&self.next_blocks[..byte_count])?;
        self.next_values.fill(0);
        self.off = 0;
        Ok(())
    }
}

/// Reads a stream written with a header and materializes it in memory.
pub fn get_reader<I>(input: &mut I) -> Result<Box<dyn Reader>>
where
    I: DataInput + ?Sized,
{
    let header = read_header(input)?;
    get_reader_no_header(input, header.format, header.value_count, header.bits_per_value)
}

/// Reads a headerless body whose layout is known out of band.
pub fn get_reader_no_header<I>(
    input: &mut I,
    format: Format,
    value_count: usize,
    bits_per_value: u32,
) -> Result<Box<dyn Reader>>
where
    I: DataInput + ?Sized,
{
    let reader: Box<dyn Reader> =
        get_mutable_no_header(input, format, value_count, bits_per_value)?;
    Ok(reader)
}

/// Like [`get_reader`] but keeps the array writable.
pub fn get_mutable<I>(input: &mut I) -> Result<Box<dyn Mutable>>
where
    I: DataInput + ?Sized,
{
    let header = read_header(input)?;
    get_mutable_no_header(input, header.format, header.value_count, header.bits_per_value)
}

fn get_mutable_no_header<I>(
    input: &mut I,
    format: Format,
    value_count: usize,
    bits_per_value: u32,
) -> Result<Box<dyn Mutable>>
where
    I: DataInput + ?Sized,
{
    verify_arg!(bits_per_value, format.is_supported(bits_per_value));
    Ok(match format {
        Format::PackedSingleBlock => Box::new(Packed64SingleBlock::read_from(
            input,
            value_count,
            bits_per_value,
        )?),
        Format::Packed => match bits_per_value {
            8 => Box::new(Direct8::read_from(input, value_count)?),
            16 => Box::new(Direct16::read_from(input, value_count)?),
            32 => Box::new(Direct32::read_from(input, value_count)?),
            64 => Box::new(Direct64::read_from(input, value_count)?),
            24 if value_count <= Packed8ThreeBlocks::MAX_SIZE => {
                Box::new(Packed8ThreeBlocks::read_from(input, value_count)?)
            }
            48 if value_count <= Packed16ThreeBlocks::MAX_SIZE => {
                Box::new(Packed16ThreeBlocks::read_from(input, value_count)?)
            }
            _ => Box::new(Packed64::read_from(input, value_count, bits_per_value)?),
        },
    })
}

/// Sequential decoder over a packed body, one batch of blocks at a time.
pub struct PackedReaderIterator<I> {
    input: I,
    format: Format,
    value_count: usize,
    bits_per_value: u32,
    op: &'static dyn BulkOperation,
    iterations: usize,
    next_blocks: Vec<u8>,
    next_values: Vec<i64>,
    offset: usize,
    length: usize,
    position: i64,
}

impl<I: DataInput> PackedReaderIterator<I> {
    /// Creates an iterator over a headerless body. `mem` bounds the size of the internal
    /// buffers in bytes.
    pub fn new(
        input: I,
        format: Format,
        value_count: usize,
        bits_per_value: u32,
        mem: usize,
    ) -> Result<PackedReaderIterator<I>> {
        verify_arg!(bits_per_value, format.is_supported(bits_per_value));
        let op = bulk_operation(format, bits_per_value);
        let iterations = op.compute_iterations(value_count, mem);
        let next_values = vec![0; iterations * op.byte_value_count()];
        let offset = next_values.len();
        Ok(PackedReaderIterator {
            input,
            format,
            value_count,
            bits_per_value,
            op,
            iterations,
            next_blocks: vec![0; iterations * op.byte_block_count()],
            next_values,
            offset,
            length: 0,
            position: -1,
        })
    }

    /// Reads the stream header, then returns an iterator over the body.
    pub fn with_header(mut input: I, mem: usize) -> Result<PackedReaderIterator<I>> {
        let header = read_header(&mut input)?;
        PackedReaderIterator::new(
            input,
            header.format,
            header.value_count,
            header.bits_per_value,
            mem,
        )
    }

    /// Returns between 1 and `count` next values, fewer at the end of a batch or of the
    /// stream. Fails with an end-of-stream error once every value has been returned.
    pub fn next_slice(&mut self, count: usize) -> Result<&[i64]> {
        debug_assert!(count > 0);
        self.offset += self.length;
        let remaining = self.value_count as i64 - self.position - 1;
        if remaining <= 0 {
            self.length = 0;
            return Err(Error::end_of_stream("packed values exhausted"));
        }
        let count = count.min(remaining as usize);

        if self.offset == self.next_values.len() {
            let remaining_bytes = self.format.byte_count(remaining as usize, self.bits_per_value);
            let to_read = (remaining_bytes as usize).min(self.next_blocks.len());
            self.input.read_bytes(&mut self.next_blocks[..to_read])?;
            self.next_blocks[to_read..].fill(0);
            self.op
                .decode_bytes(&self.next_blocks, &mut self.next_values, self.iterations);
            self.offset = 0;
        }

        self.length = (self.next_values.len() - self.offset).min(count);
        self.position += self.length as i64;
        Ok(&self.next_values[self.offset..self.offset + self.length])
    }

    pub fn next_value(&mut self) -> Result<i64> {
        Ok(self.next_slice(1)?[0])
    }

    /// Index of the last value returned, or -1 before the first one.
    pub fn ord(&self) -> i64 {
        self.position
    }

    pub fn size(&self) -> usize {
        self.value_count
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }
}

impl<I: DataInput> Iterator for PackedReaderIterator<I> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Result<i64>> {
        if self.position + 1 >= self.value_count as i64 {
            return None;
        }
        Some(self.next_value())
    }
}

#[cfg(test)]
mod tests {
    use bitweave_common::ErrorKind;
    use bitweave_io::ByteSliceInput;

    use super::*;
    use crate::{factory::get_mutable_with_format, format::SINGLE_BLOCK_BITS};

    fn layouts() -> Vec<(Format, u32)> {
        let mut layouts: Vec<_> = (1..=64).map(|bpv| (Format::Packed, bpv)).collect();
        layouts.extend(SINGLE_BLOCK_BITS.map(|bpv| (Format::PackedSingleBlock, bpv)));
        layouts
    }

    #[test]
    fn test_save_and_read_back() {
        let mut rng = fastrand::Rng::with_seed(11);
        for (format, bits_per_value) in layouts() {
            let count = rng.usize(..300);
            let mut array = get_mutable_with_format(count, bits_per_value, format).unwrap();
            for i in 0..count {
                array.set(i, rng.i64(0..=max_value(bits_per_value)));
            }
            let mut out: Vec<u8> = Vec::new();
            array.save(&mut out).unwrap();
            let mut header: Vec<u8> = Vec::new();
            write_header(&mut header, format, count, bits_per_value).unwrap();
            assert!(header.len() > codec::header_length(CODEC_NAME));
            let expected_len = header.len() as u64 + format.byte_count(count, bits_per_value);
            assert_eq!(out.len() as u64, expected_len);

            let mut input = ByteSliceInput::new(&out);
            let reader = get_reader(&mut input).unwrap();
            assert!(input.is_eof(), "{format:?} {bits_per_value}");
            assert_eq!(reader.size(), count);
            for i in 0..count {
                assert_eq!(reader.get(i), array.get(i));
            }

            let mut iter =
                PackedReaderIterator::with_header(ByteSliceInput::new(&out), 64).unwrap();
            for i in 0..count {
                assert_eq!(iter.next_value().unwrap(), array.get(i));
                assert_eq!(iter.ord(), i as i64);
            }
            assert!(iter.next_value().unwrap_err().is_end_of_stream());
        }
    }

    #[test]
    fn test_writer_pads_and_rejects_overflow() {
        let mut out: Vec<u8> = Vec::new();
        let mut writer = PackedWriter::new(&mut out, Format::Packed, 5, 3, 0).unwrap();
        writer.add(7).unwrap();
        writer.add(1).unwrap();
        assert_eq!(writer.ord(), 1);
        writer.finish().unwrap();
        assert!(writer.add(1).is_err());
        assert!(writer.finish().is_err());
        // 111 001 000 000 000, padded to two bytes.
        assert_eq!(out, vec![0b1110_0100, 0]);

        let mut out: Vec<u8> = Vec::new();
        let mut writer = PackedWriter::new(&mut out, Format::Packed, 1, 3, 1024).unwrap();
        writer.add(1).unwrap();
        assert!(matches!(
            writer.add(2).unwrap_err().kind(),
            ErrorKind::InvalidOperation { .. }
        ));
    }

    #[test]
    fn test_iterator_slices() {
        let mut out: Vec<u8> = Vec::new();
        let mut writer = PackedWriter::new(&mut out, Format::Packed, 1000, 17, 1024).unwrap();
        for i in 0..1000 {
            writer.add(i * 100).unwrap();
        }
        writer.finish().unwrap();

        let mut iter =
            PackedReaderIterator::new(ByteSliceInput::new(&out), Format::Packed, 1000, 17, 256)
                .unwrap();
        let mut decoded = Vec::new();
        while decoded.len() < 1000 {
            let slice = iter.next_slice(77).unwrap();
            assert!(!slice.is_empty() && slice.len() <= 77);
            decoded.extend_from_slice(slice);
        }
        assert_eq!(decoded, (0..1000).map(|i| i * 100).collect::<Vec<_>>());
        assert_eq!(iter.ord(), 999);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_corrupt_header() {
        let mut out: Vec<u8> = Vec::new();
        codec::write_header(&mut out, CODEC_NAME, VERSION_CURRENT).unwrap();
        out.write_vint(65).unwrap();
        out.write_vint(10).unwrap();
        out.write_vint(0).unwrap();
        let err = read_header(&mut ByteSliceInput::new(&out)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));

        let mut out: Vec<u8> = Vec::new();
        codec::write_header(&mut out, CODEC_NAME, VERSION_CURRENT).unwrap();
        out.write_vint(5).unwrap();
        out.write_vint(10).unwrap();
        out.write_vint(7).unwrap();
        assert!(read_header(&mut ByteSliceInput::new(&out)).is_err());

        let mut out: Vec<u8> = Vec::new();
        codec::write_header(&mut out, "Other", VERSION_CURRENT).unwrap();
        assert!(read_header(&mut ByteSliceInput::new(&out)).is_err());
    }

    #[test]
    fn test_header_round_trip() {
        let mut out: Vec<u8> = Vec::new();
        write_header(&mut out, Format::PackedSingleBlock, 12345, 21).unwrap();
        let header = read_header(&mut ByteSliceInput::new(&out)).unwrap();
        assert_eq!(
            header,
            PackedHeader {
                format: Format::PackedSingleBlock,
                value_count: 12345,
                bits_per_value: 21,
                version: VERSION_CURRENT,
            }
        );
    }
}
