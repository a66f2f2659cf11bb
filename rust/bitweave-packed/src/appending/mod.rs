//! Append-only buffers of `i64` values that compress themselves a page at a time.
//!
//! Values are staged in a pending page. When the page is full and another value
//! arrives, a [`PagePacker`] seals it into a compact [`Reader`] plus a little
//! per-page metadata, and a fresh pending page starts. [`AppendingBuffer::freeze`] seals
//! the last partial page and makes the buffer read-only.

use bitweave_common::{Error, Result};

use crate::{
    config::AppendingConfig,
    factory::new_mutable,
    format::FormatAndBits,
    reader::{Mutable, Reader},
};

pub mod delta;
pub mod monotonic;
pub mod packed;

pub use delta::{AppendingDeltaPackedLongBuffer, DeltaPacker};
pub use monotonic::{MonotonicAppendingLongBuffer, MonotonicPacker};
pub use packed::{AppendingPackedLongBuffer, PlainPacker};

/// Compression strategy for sealed pages.
pub trait PagePacker: Default + Send + Sync {
    type Meta: Copy + std::fmt::Debug + Send + Sync;

    /// Seals the values of a full or final page. `pending` may be overwritten.
    fn pack(&self, pending: &mut [i64], acceptable_overhead_ratio: f32)
    -> (Self::Meta, Box<dyn Reader>);

    /// Reconstructs the value at `element` of a sealed page from its stored form.
    fn decode(&self, meta: &Self::Meta, stored: i64, element: usize) -> i64;
}

struct SealedPage<M> {
    meta: M,
    values: Box<dyn Reader>,
}

/// Packs `values` into the fastest array of at least `bits_per_value` bits.
pub(crate) fn pack_values(
    values: &[i64],
    bits_per_value: u32,
    acceptable_overhead_ratio: f32,
) -> Box<dyn Reader> {
    let choice = FormatAndBits::fastest(values.len(), bits_per_value, acceptable_overhead_ratio);
    let mut mutable = new_mutable(values.len(), choice.bits_per_value, choice.format);
    let mut written = 0;
    while written < values.len() {
        written += mutable.set_bulk(written, &values[written..]);
    }
    mutable
}

/// The shared append/seal/read engine behind the appending buffers.
pub struct AppendingBuffer<P: PagePacker> {
    packer: P,
    acceptable_overhead_ratio: f32,
    page_shift: u32,
    page_mask: u64,
    pages: Vec<SealedPage<P::Meta>>,
    pending: Vec<i64>,
    pending_off: usize,
    sealed_count: u64,
    frozen: bool,
}

impl<P: PagePacker> AppendingBuffer<P> {
    pub fn new(config: AppendingConfig) -> Result<AppendingBuffer<P>> {
        let page_shift = config.validate()?;
        Ok(AppendingBuffer {
            packer: P::default(),
            acceptable_overhead_ratio: config.acceptable_overhead_ratio,
            page_shift,
            page_mask: config.page_size as u64 - 1,
            pages: Vec::with_capacity(config.initial_page_count),
            pending: vec![0; config.page_size],
            pending_off: 0,
            sealed_count: 0,
            frozen: false,
        })
    }

    pub fn page_size(&self) -> usize {
        1 << self.page_shift
    }

    /// Appends a value. Fails once the buffer is frozen.
    pub fn add(&mut self, value: i64) -> Result<()> {
        if self.frozen {
            return Err(Error::invalid_operation("AppendingBuffer::add after freeze"));
        }
        if self.pending_off == self.pending.len() {
            self.seal_pending();
        }
        self.pending[self.pending_off] = value;
        self.pending_off += 1;
        Ok(())
    }

    fn seal_pending(&mut self) {
        debug_assert!(self.pending_off > 0);
        let pending = &mut self.pending[..self.pending_off];
        let (meta, values) = self.packer.pack(pending, self.acceptable_overhead_ratio);
        self.sealed_count += self.pending_off as u64;
        self.pages.push(SealedPage { meta, values });
        self.pending_off = 0;
    }

    /// Seals the last page and releases the staging buffer; further `add`s fail.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        if self.pending_off > 0 {
            self.seal_pending();
        }
        self.pending = Vec::new();
        self.frozen = true;
        log::debug!(
            "AppendingBuffer frozen: {} values in {} pages, {} bytes",
            self.sealed_count,
            self.pages.len(),
            self.ram_bytes_used()
        );
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of values appended so far.
    pub fn size(&self) -> u64 {
        self.sealed_count + self.pending_off as u64
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of sealed pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn get(&self, index: u64) -> i64 {
        debug_assert!(index < self.size());
        let page = (index >> self.page_shift) as usize;
        let element = (index & self.page_mask) as usize;
        match self.pages.get(page) {
            Some(sealed) => self
                .packer
                .decode(&sealed.meta, sealed.values.get(element), element),
            None => self.pending[element],
        }
    }

    /// Reads consecutive values starting at `index`, without crossing a page boundary.
    /// Returns the number of values read.
    pub fn get_bulk(&self, index: u64, buf: &mut [i64]) -> usize {
        debug_assert!(index < self.size());
        let page = (index >> self.page_shift) as usize;
        let element = (index & self.page_mask) as usize;
        self.read_page(page, element, buf)
    }

    fn read_page(&self, page: usize, element: usize, buf: &mut [i64]) -> usize {
        match self.pages.get(page) {
            Some(sealed) => {
                let read = sealed.values.get_bulk(element, buf);
                for (i, slot) in buf[..read].iter_mut().enumerate() {
                    *slot = self.packer.decode(&sealed.meta, *slot, element + i);
                }
                read
            }
            None => {
                let count = buf.len().min(self.pending_off - element);
                buf[..count].copy_from_slice(&self.pending[element..element + count]);
                count
            }
        }
    }

    fn page_len(&self, page: usize) -> usize {
        match self.pages.get(page) {
            Some(sealed) => sealed.values.size(),
            None => self.pending_off,
        }
    }

    /// Iterates over every value in insertion order, decoding one page at a time.
    pub fn iter(&self) -> AppendingIter<'_, P> {
        let mut iter = AppendingIter {
            buffer: self,
            page: 0,
            offset: 0,
            count: 0,
            values: vec![0; self.page_size().min(self.size() as usize)],
            remaining: self.size(),
        };
        if iter.remaining > 0 {
            iter.load_page();
        }
        iter
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + 8 * self.pending.capacity()
            + self.pages.capacity() * std::mem::size_of::<SealedPage<P::Meta>>()
            + self
                .pages
                .iter()
                .map(|p| p.values.ram_bytes_used())
                .sum::<usize>()
    }
}

impl<'a, P: PagePacker> IntoIterator for &'a AppendingBuffer<P> {
    type Item = i64;
    type IntoIter = AppendingIter<'a, P>;

    fn into_iter(self) -> AppendingIter<'a, P> {
        self.iter()
    }
}

/// Single-pass iterator over an [`AppendingBuffer`].
pub struct AppendingIter<'a, P: PagePacker> {
    buffer: &'a AppendingBuffer<P>,
    page: usize,
    offset: usize,
    count: usize,
    values: Vec<i64>,
    remaining: u64,
}

impl<P: PagePacker> AppendingIter<'_, P> {
    fn load_page(&mut self) {
        self.count = self.buffer.page_len(self.page);
        let mut read = 0;
        while read < self.count {
            read += self
                .buffer
                .read_page(self.page, read, &mut self.values[read..self.count]);
        }
        self.offset = 0;
    }
}

impl<P: PagePacker> Iterator for AppendingIter<'_, P> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.values[self.offset];
        self.offset += 1;
        self.remaining -= 1;
        if self.offset == self.count && self.remaining > 0 {
            self.page += 1;
            self.load_page();
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl<P: PagePacker> ExactSizeIterator for AppendingIter<'_, P> {}
