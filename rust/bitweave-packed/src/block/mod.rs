//! Block-packed streams: an unbounded sequence of `i64` values cut into blocks of a
//! fixed size, each packed independently.
//!
//! Delta layout of a block: a token byte `(bits_per_value << 1) | min_is_zero`, then
//! when the minimum is non-zero `zigzag(min) - 1` as a block vlong, then when
//! `bits_per_value > 0` the values minus the minimum, packed in the `Packed` format.
//! The monotonic layout replaces the token with `vlong min`, `int average_bits`,
//! `vint bits_per_value` and packs zigzag residuals against `min + average * i`.
//!
//! The block size is not recorded in the stream: both ends must agree on it.

use bitweave_common::{Error, Result};
use bitweave_io::{DataInput, DataOutput};

use crate::{
    bulk::{BulkOperation, bulk_operation},
    format::Format,
    util,
};

pub mod monotonic;
pub mod reader;
pub mod reader_iterator;
pub mod writer;

pub use monotonic::{MonotonicBlockPackedReader, MonotonicBlockPackedWriter};
pub use reader::BlockPackedReader;
pub use reader_iterator::BlockPackedReaderIterator;
pub use writer::BlockPackedWriter;

pub const MIN_BLOCK_SIZE: usize = 1 << 6;
pub const MAX_BLOCK_SIZE: usize = 1 << 27;

pub(crate) const MIN_VALUE_EQUALS_0: u8 = 1;
pub(crate) const BPV_SHIFT: u32 = 1;

/// Validates a block size and returns its base-2 logarithm.
pub fn check_block_size(block_size: usize) -> Result<u32> {
    util::check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)
}

/// Writes all 64 bits of `value`: up to eight 7-bit groups with a continuation bit,
/// and a ninth byte carrying the top 8 bits as-is.
pub(crate) fn write_block_vlong<O>(out: &mut O, value: u64) -> Result<()>
where
    O: DataOutput + ?Sized,
{
    let mut value = value;
    let mut k = 0;
    while value & !0x7F != 0 && k < 8 {
        out.write_byte(((value & 0x7F) | 0x80) as u8)?;
        value >>= 7;
        k += 1;
    }
    out.write_byte(value as u8)
}

pub(crate) fn read_block_vlong<I>(input: &mut I) -> Result<u64>
where
    I: DataInput + ?Sized,
{
    let mut value = 0u64;
    for shift in (0..56).step_by(7) {
        let b = input.read_byte()?;
        value |= ((b & 0x7F) as u64) << shift;
        if b & 0x80 == 0 {
            return Ok(value);
        }
    }
    let b = input.read_byte()?;
    Ok(value | ((b as u64) << 56))
}

#[cold]
pub(crate) fn corrupted_bits_per_value(bits_per_value: u32) -> Error {
    Error::invalid_format(
        "block_bits_per_value",
        format!("corrupted block: {bits_per_value} bits per value"),
    )
}

/// Value buffer and sealing state shared by the block writers.
pub(crate) struct BlockBuffer<O> {
    pub(crate) out: O,
    pub(crate) values: Vec<i64>,
    blocks: Vec<u8>,
    pub(crate) off: usize,
    pub(crate) ord: u64,
    finished: bool,
}

impl<O: DataOutput> BlockBuffer<O> {
    pub(crate) fn new(out: O, block_size: usize) -> Result<BlockBuffer<O>> {
        check_block_size(block_size)?;
        Ok(BlockBuffer {
            out,
            values: vec![0; block_size],
            blocks: Vec::new(),
            off: 0,
            ord: 0,
            finished: false,
        })
    }

    pub(crate) fn check_not_finished(&self) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_operation("block writer already finished"));
        }
        Ok(())
    }

    pub(crate) fn is_full(&self) -> bool {
        self.off == self.values.len()
    }

    pub(crate) fn push(&mut self, value: i64) {
        self.values[self.off] = value;
        self.off += 1;
        self.ord += 1;
    }

    pub(crate) fn set_finished(&mut self) {
        self.finished = true;
    }

    /// Packs the first `off` values at `bits_per_value` bits, zero-padding the rest of
    /// the block for the kernel but writing only the bytes the real values need.
    pub(crate) fn write_values(&mut self, bits_per_value: u32) -> Result<()> {
        let op = bulk_operation(Format::Packed, bits_per_value);
        let iterations = self.values.len() / op.byte_value_count();
        let byte_len = op.byte_block_count() * iterations;
        if self.blocks.len() < byte_len {
            self.blocks.resize(byte_len, 0);
        }
        let off = self.off;
        self.values[off..].fill(0);
        op.encode_longs_to_bytes(&self.values, &mut self.blocks, iterations);
        let byte_count = Format::Packed.byte_count(off, bits_per_value) as usize;
        self.out.write_bytes(&self.blocks[..byte_count])
    }
}

/// Reads `count` packed values of a block body into `values`, which holds a whole
/// block. `scratch` is grown as needed.
pub(crate) fn read_block_values<I>(
    input: &mut I,
    bits_per_value: u32,
    count: usize,
    values: &mut [i64],
    scratch: &mut Vec<u8>,
) -> Result<()>
where
    I: DataInput + ?Sized,
{
    let op: &dyn BulkOperation = bulk_operation(Format::Packed, bits_per_value);
    let iterations = values.len() / op.byte_value_count();
    let byte_len = iterations * op.byte_block_count();
    if scratch.len() < byte_len {
        scratch.resize(byte_len, 0);
    }
    let byte_count = Format::Packed.byte_count(count, bits_per_value) as usize;
    input.read_bytes(&mut scratch[..byte_count])?;
    scratch[byte_count..].fill(0);
    op.decode_bytes(scratch, values, iterations);
    Ok(())
}
