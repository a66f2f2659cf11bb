//! Mutable array that widens itself when a value does not fit.

use bitweave_bits::word::{low_mask, unsigned_bits_required};
use bitweave_common::{Result, verify_arg};
use bitweave_io::DataOutput;

use crate::{
    DEFAULT_BUFFER_SIZE, MAX_VALUE_COUNT,
    factory::{get_mutable, new_mutable},
    format::{Format, FormatAndBits},
    reader::{Mutable, Reader, copy_values},
};

const COPY_BUFFER_LEN: usize = DEFAULT_BUFFER_SIZE / 8;

/// Wraps a fixed-width array and swaps it for a wider one whenever a value needs more
/// bits than the current width. Negative values need all 64 bits.
///
/// Widening replaces the backing array; [`GrowableWriter::mutable`] must be called again
/// after any `set` that may have grown it.
pub struct GrowableWriter {
    current: Box<dyn Mutable>,
    current_mask: u64,
    acceptable_overhead_ratio: f32,
}

impl GrowableWriter {
    pub fn new(
        start_bits_per_value: u32,
        value_count: usize,
        acceptable_overhead_ratio: f32,
    ) -> Result<GrowableWriter> {
        verify_arg!(value_count, value_count <= MAX_VALUE_COUNT);
        let current = get_mutable(value_count, start_bits_per_value, acceptable_overhead_ratio)?;
        Ok(GrowableWriter::from_mutable(current, acceptable_overhead_ratio))
    }

    /// Infallible allocation for arguments already validated by the caller.
    pub(crate) fn alloc(
        start_bits_per_value: u32,
        value_count: usize,
        acceptable_overhead_ratio: f32,
    ) -> GrowableWriter {
        let choice = FormatAndBits::fastest(
            value_count,
            start_bits_per_value,
            acceptable_overhead_ratio,
        );
        let current = new_mutable(value_count, choice.bits_per_value, choice.format);
        GrowableWriter::from_mutable(current, acceptable_overhead_ratio)
    }

    fn from_mutable(current: Box<dyn Mutable>, acceptable_overhead_ratio: f32) -> GrowableWriter {
        GrowableWriter {
            current_mask: low_mask(current.bits_per_value()),
            current,
            acceptable_overhead_ratio,
        }
    }

    /// The array currently backing this writer.
    pub fn mutable(&self) -> &dyn Mutable {
        self.current.as_ref()
    }

    pub fn acceptable_overhead_ratio(&self) -> f32 {
        self.acceptable_overhead_ratio
    }

    fn ensure_capacity(&mut self, value: i64) {
        let value = value as u64;
        if value & self.current_mask == value {
            return;
        }
        let bits_required = unsigned_bits_required(value);
        let value_count = self.current.size();
        let choice =
            FormatAndBits::fastest(value_count, bits_required, self.acceptable_overhead_ratio);
        let mut next = new_mutable(value_count, choice.bits_per_value, choice.format);
        copy_values(
            self.current.as_ref(),
            0,
            next.as_mut(),
            0,
            value_count,
            COPY_BUFFER_LEN,
        );
        log::debug!(
            "GrowableWriter widened {} values from {} to {} bits",
            value_count,
            self.current.bits_per_value(),
            next.bits_per_value()
        );
        self.current_mask = low_mask(next.bits_per_value());
        self.current = next;
    }

    /// Returns a copy holding the first `min(size, new_size)` values, zero-extended to
    /// `new_size`, at the current width.
    pub fn resize(&self, new_size: usize) -> Result<GrowableWriter> {
        let mut next = GrowableWriter::new(
            self.bits_per_value(),
            new_size,
            self.acceptable_overhead_ratio,
        )?;
        let limit = self.size().min(new_size);
        copy_values(
            self.current.as_ref(),
            0,
            next.current.as_mut(),
            0,
            limit,
            COPY_BUFFER_LEN,
        );
        Ok(next)
    }
}

impl Reader for GrowableWriter {
    fn get(&self, index: usize) -> i64 {
        self.current.get(index)
    }

    fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
        self.current.get_bulk(index, buf)
    }

    fn size(&self) -> usize {
        self.current.size()
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + self.current.ram_bytes_used()
    }
}

impl Mutable for GrowableWriter {
    fn bits_per_value(&self) -> u32 {
        self.current.bits_per_value()
    }

    fn set(&mut self, index: usize, value: i64) {
        self.ensure_capacity(value);
        self.current.set(index, value);
    }

    fn set_bulk(&mut self, index: usize, values: &[i64]) -> usize {
        let max = values.iter().fold(0i64, |acc, &v| acc | v);
        self.ensure_capacity(max);
        self.current.set_bulk(index, values)
    }

    fn fill(&mut self, from: usize, to: usize, value: i64) {
        self.ensure_capacity(value);
        self.current.fill(from, to, value);
    }

    fn clear(&mut self) {
        self.current.clear();
    }

    fn format(&self) -> Format {
        self.current.format()
    }

    fn save(&self, out: &mut dyn DataOutput) -> Result<()> {
        self.current.save(out)
    }
}
