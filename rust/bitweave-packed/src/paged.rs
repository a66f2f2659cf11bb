//! Arrays of up to 2^63 values split into independently allocated pages.

use bitweave_common::{Result, verify_arg};

use crate::{
    format::{Format, FormatAndBits},
    factory::new_mutable,
    growable::GrowableWriter,
    reader::{Mutable, Reader, copy_values},
    util::{check_block_size, num_blocks},
};

pub const MIN_PAGE_SIZE: usize = 1 << 6;
pub const MAX_PAGE_SIZE: usize = 1 << 30;

const COPY_BUFFER_LEN: usize = 1024;

/// Allocates the pages of a [`PagedArray`].
pub trait PageAllocator: Clone + Send + Sync {
    type Page: Mutable;

    fn allocate(&self, value_count: usize, bits_per_value: u32) -> Self::Page;
}

/// Pages with a fixed layout chosen once for the whole array.
#[derive(Debug, Clone, Copy)]
pub struct FixedPages {
    format: Format,
}

impl PageAllocator for FixedPages {
    type Page = Box<dyn Mutable>;

    fn allocate(&self, value_count: usize, bits_per_value: u32) -> Box<dyn Mutable> {
        new_mutable(value_count, bits_per_value, self.format)
    }
}

/// Pages that widen independently as larger values are stored.
#[derive(Debug, Clone, Copy)]
pub struct GrowablePages {
    acceptable_overhead_ratio: f32,
}

impl PageAllocator for GrowablePages {
    type Page = GrowableWriter;

    fn allocate(&self, value_count: usize, bits_per_value: u32) -> GrowableWriter {
        GrowableWriter::alloc(bits_per_value, value_count, self.acceptable_overhead_ratio)
    }
}

/// A logical array addressed by `u64` indexes. Value `i` lives in page
/// `i >> page_shift` at offset `i & page_mask`; only the last page may be shorter than
/// the page size.
pub struct PagedArray<A: PageAllocator> {
    size: u64,
    page_shift: u32,
    page_mask: u64,
    bits_per_value: u32,
    pages: Vec<A::Page>,
    allocator: A,
}

/// Paged array whose pages share one fixed width and layout.
pub type PagedMutable = PagedArray<FixedPages>;

/// Paged array whose pages grow their width on demand.
pub type PagedGrowableWriter = PagedArray<GrowablePages>;

impl PagedArray<FixedPages> {
    /// Creates a zeroed array of `size` values, picking the fastest page layout for
    /// `bits_per_value` within `acceptable_overhead_ratio`.
    pub fn new(
        size: u64,
        page_size: usize,
        bits_per_value: u32,
        acceptable_overhead_ratio: f32,
    ) -> Result<PagedMutable> {
        verify_arg!(bits_per_value, (1..=64).contains(&bits_per_value));
        let choice = FormatAndBits::fastest(page_size, bits_per_value, acceptable_overhead_ratio);
        PagedArray::with_allocator(
            size,
            page_size,
            choice.bits_per_value,
            FixedPages {
                format: choice.format,
            },
        )
    }

    pub fn format(&self) -> Format {
        self.allocator.format
    }
}

impl PagedArray<GrowablePages> {
    /// Creates a zeroed array of `size` values whose pages start at
    /// `start_bits_per_value` bits.
    pub fn new(
        size: u64,
        page_size: usize,
        start_bits_per_value: u32,
        acceptable_overhead_ratio: f32,
    ) -> Result<PagedGrowableWriter> {
        verify_arg!(
            start_bits_per_value,
            (1..=64).contains(&start_bits_per_value)
        );
        PagedArray::with_allocator(
            size,
            page_size,
            start_bits_per_value,
            GrowablePages {
                acceptable_overhead_ratio,
            },
        )
    }
}

impl<A: PageAllocator> PagedArray<A> {
    fn with_allocator(
        size: u64,
        page_size: usize,
        bits_per_value: u32,
        allocator: A,
    ) -> Result<PagedArray<A>> {
        let mut array = PagedArray::unfilled(size, page_size, bits_per_value, allocator)?;
        let page_count = num_blocks(size, page_size)?;
        for i in 0..page_count {
            let value_count = array.page_value_count(i, page_count);
            array.pages.push(array.allocator.allocate(value_count, bits_per_value));
        }
        Ok(array)
    }

    fn unfilled(
        size: u64,
        page_size: usize,
        bits_per_value: u32,
        allocator: A,
    ) -> Result<PagedArray<A>> {
        let page_shift = check_block_size(page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE)?;
        let page_count = num_blocks(size, page_size)?;
        Ok(PagedArray {
            size,
            page_shift,
            page_mask: page_size as u64 - 1,
            bits_per_value,
            pages: Vec::with_capacity(page_count),
            allocator,
        })
    }

    fn page_value_count(&self, page: usize, page_count: usize) -> usize {
        if page + 1 == page_count {
            let remainder = (self.size & self.page_mask) as usize;
            if remainder == 0 {
                self.page_size()
            } else {
                remainder
            }
        } else {
            self.page_size()
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn page_size(&self) -> usize {
        1 << self.page_shift
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Width new pages start with.
    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    pub fn page(&self, page: usize) -> &A::Page {
        &self.pages[page]
    }

    #[inline]
    pub fn get(&self, index: u64) -> i64 {
        debug_assert!(index < self.size);
        let page = (index >> self.page_shift) as usize;
        self.pages[page].get((index & self.page_mask) as usize)
    }

    #[inline]
    pub fn set(&mut self, index: u64, value: i64) {
        debug_assert!(index < self.size);
        let page = (index >> self.page_shift) as usize;
        self.pages[page].set((index & self.page_mask) as usize, value);
    }

    /// Sets every value in `[from, to)` to `value`.
    pub fn fill(&mut self, from: u64, to: u64, value: i64) {
        debug_assert!(from <= to && to <= self.size);
        let mut index = from;
        while index < to {
            let page = (index >> self.page_shift) as usize;
            let page_end = ((page as u64 + 1) << self.page_shift).min(to);
            let start = (index & self.page_mask) as usize;
            let end = start + (page_end - index) as usize;
            self.pages[page].fill(start, end, value);
            index = page_end;
        }
    }

    /// Returns a copy of `new_size` values: the common prefix is copied, each surviving
    /// page keeps its width, and new values are zero.
    pub fn resize(&self, new_size: u64) -> Result<PagedArray<A>> {
        let page_size = self.page_size();
        let mut copy = PagedArray::unfilled(
            new_size,
            page_size,
            self.bits_per_value,
            self.allocator.clone(),
        )?;
        let page_count = num_blocks(new_size, page_size)?;
        let common_pages = page_count.min(self.pages.len());
        for i in 0..page_count {
            let value_count = copy.page_value_count(i, page_count);
            let bits_per_value = if i < common_pages {
                self.pages[i].bits_per_value()
            } else {
                self.bits_per_value
            };
            let mut page = copy.allocator.allocate(value_count, bits_per_value);
            if i < common_pages {
                let len = value_count.min(self.pages[i].size());
                copy_values(&self.pages[i], 0, &mut page, 0, len, COPY_BUFFER_LEN);
            }
            copy.pages.push(page);
        }
        log::debug!(
            "PagedArray resized from {} to {} values ({} pages)",
            self.size,
            new_size,
            page_count
        );
        Ok(copy)
    }

    /// Grows to at least `min_size` values, with `max(3, min_size / 8)` extra slack.
    /// Does nothing when the array is already large enough.
    pub fn grow(&mut self, min_size: u64) -> Result<()> {
        if min_size <= self.size {
            return Ok(());
        }
        let extra = (min_size >> 3).max(3);
        *self = self.resize(min_size + extra)?;
        Ok(())
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.pages.capacity() * std::mem::size_of::<A::Page>()
            + self.pages.iter().map(|p| p.ram_bytes_used()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{COMPACT, DEFAULT, FASTEST};

    #[test]
    fn test_page_routing() {
        let mut array = PagedMutable::new(1000, 64, 20, COMPACT).unwrap();
        assert_eq!(array.page_count(), 16);
        assert_eq!(array.page(15).size(), 1000 - 15 * 64);
        for i in 0..1000u64 {
            array.set(i, (i * 1009) as i64 & 0xFFFFF);
        }
        for i in 0..1000u64 {
            assert_eq!(array.get(i), (i * 1009) as i64 & 0xFFFFF);
        }
    }

    #[test]
    fn test_resize_preserves_prefix() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut array = PagedMutable::new(5000, 256, 13, DEFAULT).unwrap();
        for i in 0..5000 {
            array.set(i, rng.i64(0..1 << 13));
        }
        for new_size in [0u64, 1, 255, 256, 3000, 5000, 9999] {
            let resized = array.resize(new_size).unwrap();
            assert_eq!(resized.size(), new_size);
            for i in 0..new_size.min(5000) {
                assert_eq!(resized.get(i), array.get(i));
            }
            for i in 5000..new_size {
                assert_eq!(resized.get(i), 0);
            }
        }
    }

    #[test]
    fn test_grow_slack() {
        let mut array = PagedMutable::new(10, 64, 8, FASTEST).unwrap();
        array.grow(5).unwrap();
        assert_eq!(array.size(), 10);
        array.grow(11).unwrap();
        assert_eq!(array.size(), 14);
        array.grow(800).unwrap();
        assert_eq!(array.size(), 900);
    }

    #[test]
    fn test_fill_across_pages() {
        let mut array = PagedMutable::new(500, 64, 7, COMPACT).unwrap();
        array.fill(30, 470, 99);
        for i in 0..500 {
            let expected = if (30..470).contains(&i) { 99 } else { 0 };
            assert_eq!(array.get(i), expected);
        }
    }

    #[test]
    fn test_growable_pages_widen_independently() {
        let mut array = PagedGrowableWriter::new(300, 128, 1, COMPACT).unwrap();
        array.set(5, 1);
        array.set(200, 1 << 30);
        assert_eq!(array.page(0).bits_per_value(), 1);
        assert!(array.page(1).bits_per_value() >= 31);

        let resized = array.resize(400).unwrap();
        assert_eq!(resized.page(1).bits_per_value(), array.page(1).bits_per_value());
        assert_eq!(resized.page(3).bits_per_value(), 1);
        assert_eq!(resized.get(200), 1 << 30);
        assert_eq!(resized.get(5), 1);
    }

    #[test]
    fn test_invalid_page_size() {
        assert!(PagedMutable::new(100, 32, 8, COMPACT).is_err());
        assert!(PagedMutable::new(100, 100, 8, COMPACT).is_err());
        assert!(PagedMutable::new(100, 1 << 31, 8, COMPACT).is_err());
        assert!(PagedMutable::new(u64::MAX, 64, 8, COMPACT).is_err());
        assert!(PagedGrowableWriter::new(100, 64, 0, COMPACT).is_err());
    }
}
