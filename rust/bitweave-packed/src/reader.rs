//! Random-access contracts shared by every fixed-width array.

use bitweave_common::Result;
use bitweave_io::DataOutput;

use crate::{DEFAULT_BUFFER_SIZE, format::Format, serialize::PackedWriter};

/// Read-only random access to a fixed number of integers.
///
/// Indexes must be below [`Reader::size`]; out-of-range access panics.
pub trait Reader: Send + Sync {
    fn get(&self, index: usize) -> i64;

    /// Reads up to `buf.len()` values starting at `index` and returns how many were read.
    ///
    /// At least one value is read when `buf` is non-empty and `index < size()`.
    fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
        debug_assert!(index < self.size());
        let count = buf.len().min(self.size() - index);
        for (i, slot) in buf[..count].iter_mut().enumerate() {
            *slot = self.get(index + i);
        }
        count
    }

    /// Number of values.
    fn size(&self) -> usize;

    /// Approximate heap and inline size in bytes.
    fn ram_bytes_used(&self) -> usize;
}

/// A [`Reader`] whose values can be overwritten.
///
/// Stored values must fit in `bits_per_value()` bits; wider values are silently
/// truncated in release builds.
pub trait Mutable: Reader {
    fn bits_per_value(&self) -> u32;

    fn set(&mut self, index: usize, value: i64);

    /// Writes up to `values.len()` values starting at `index` and returns how many were
    /// written.
    fn set_bulk(&mut self, index: usize, values: &[i64]) -> usize {
        debug_assert!(index < self.size());
        let count = values.len().min(self.size() - index);
        for (i, &value) in values[..count].iter().enumerate() {
            self.set(index + i, value);
        }
        count
    }

    /// Sets every value in `[from, to)` to `value`.
    fn fill(&mut self, from: usize, to: usize, value: i64) {
        debug_assert!(from <= to && to <= self.size());
        for i in from..to {
            self.set(i, value);
        }
    }

    fn clear(&mut self) {
        let size = self.size();
        self.fill(0, size, 0);
    }

    /// Layout the values are serialized with by [`Mutable::save`].
    fn format(&self) -> Format {
        Format::Packed
    }

    /// Writes a stream header followed by every value; `serialize::get_reader` reads it
    /// back.
    fn save(&self, out: &mut dyn DataOutput) -> Result<()> {
        let mut writer = PackedWriter::with_header(
            out,
            self.format(),
            self.size(),
            self.bits_per_value(),
            DEFAULT_BUFFER_SIZE,
        )?;
        for i in 0..self.size() {
            writer.add(self.get(i))?;
        }
        writer.finish()
    }
}

impl<T: Reader + ?Sized> Reader for Box<T> {
    fn get(&self, index: usize) -> i64 {
        (**self).get(index)
    }

    fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
        (**self).get_bulk(index, buf)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn ram_bytes_used(&self) -> usize {
        (**self).ram_bytes_used()
    }
}

impl<T: Mutable + ?Sized> Mutable for Box<T> {
    fn bits_per_value(&self) -> u32 {
        (**self).bits_per_value()
    }

    fn set(&mut self, index: usize, value: i64) {
        (**self).set(index, value)
    }

    fn set_bulk(&mut self, index: usize, values: &[i64]) -> usize {
        (**self).set_bulk(index, values)
    }

    fn fill(&mut self, from: usize, to: usize, value: i64) {
        (**self).fill(from, to, value)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn format(&self) -> Format {
        (**self).format()
    }

    fn save(&self, out: &mut dyn DataOutput) -> Result<()> {
        (**self).save(out)
    }
}

/// A reader of `value_count` zeros that takes no storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullReader {
    value_count: usize,
}

impl NullReader {
    pub fn new(value_count: usize) -> NullReader {
        NullReader { value_count }
    }
}

impl Reader for NullReader {
    fn get(&self, index: usize) -> i64 {
        debug_assert!(index < self.value_count);
        0
    }

    fn get_bulk(&self, index: usize, buf: &mut [i64]) -> usize {
        debug_assert!(index < self.value_count);
        let count = buf.len().min(self.value_count - index);
        buf[..count].fill(0);
        count
    }

    fn size(&self) -> usize {
        self.value_count
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Copies `len` values from `src[src_pos..]` to `dest[dest_pos..]` through a scratch
/// buffer of `buffer_len` values. A zero `buffer_len` copies one value at a time.
pub fn copy_values<R, M>(
    src: &R,
    src_pos: usize,
    dest: &mut M,
    dest_pos: usize,
    len: usize,
    buffer_len: usize,
) where
    R: Reader + ?Sized,
    M: Mutable + ?Sized,
{
    debug_assert!(src_pos + len <= src.size());
    debug_assert!(dest_pos + len <= dest.size());
    if buffer_len == 0 {
        for i in 0..len {
            dest.set(dest_pos + i, src.get(src_pos + i));
        }
        return;
    }
    if len == 0 {
        return;
    }

    let mut buf = vec![0i64; buffer_len.min(len)];
    let (mut src_pos, mut dest_pos, mut len) = (src_pos, dest_pos, len);
    let mut remaining = 0;
    while len > 0 {
        let limit = len.min(buf.len() - remaining);
        let read = src.get_bulk(src_pos, &mut buf[remaining..remaining + limit]);
        src_pos += read;
        len -= read;
        remaining += read;
        let written = dest.set_bulk(dest_pos, &buf[..remaining]);
        dest_pos += written;
        buf.copy_within(written..remaining, 0);
        remaining -= written;
    }
    while remaining > 0 {
        let written = dest.set_bulk(dest_pos, &buf[..remaining]);
        dest_pos += written;
        buf.copy_within(written..remaining, 0);
        remaining -= written;
    }
}
