use bitweave_bits::word::bits_required;

use super::{AppendingBuffer, PagePacker, pack_values};
use crate::reader::{NullReader, Reader};

/// Stores each page as offsets from the page minimum.
///
/// A page whose values are all equal takes no storage. A page whose range overflows
/// `i64` is stored with 64 bits per value and wrapping offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaPacker;

impl PagePacker for DeltaPacker {
    /// Page minimum.
    type Meta = i64;

    fn pack(&self, pending: &mut [i64], acceptable_overhead_ratio: f32) -> (i64, Box<dyn Reader>) {
        let min = pending.iter().copied().min().unwrap_or(0);
        let max = pending.iter().copied().max().unwrap_or(0);
        let delta = max.wrapping_sub(min);
        if delta == 0 {
            log::trace!("sealed constant page of {} values at {}", pending.len(), min);
            return (min, Box::new(NullReader::new(pending.len())));
        }
        let bits_per_value = if delta < 0 { 64 } else { bits_required(delta) };
        for value in pending.iter_mut() {
            *value = value.wrapping_sub(min);
        }
        log::trace!(
            "sealed delta page of {} values: min {}, {} bits",
            pending.len(),
            min,
            bits_per_value
        );
        (
            min,
            pack_values(pending, bits_per_value, acceptable_overhead_ratio),
        )
    }

    #[inline]
    fn decode(&self, min: &i64, stored: i64, _element: usize) -> i64 {
        min.wrapping_add(stored)
    }
}

/// Appending buffer compressing each page as deltas from its minimum.
pub type AppendingDeltaPackedLongBuffer = AppendingBuffer<DeltaPacker>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppendingConfig;

    fn buffer(page_size: usize) -> AppendingDeltaPackedLongBuffer {
        AppendingDeltaPackedLongBuffer::new(AppendingConfig::default().with_page_size(page_size))
            .unwrap()
    }

    #[test]
    fn test_unsorted_values_across_pages() {
        let values = [5i64, -3, 1_000_000, 42, 42, -7_000_000_000, 0, 17, i64::MAX, 3];
        let mut buffer = buffer(4);
        for &v in &values {
            buffer.add(v).unwrap();
        }
        assert_eq!(buffer.size(), 10);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(buffer.get(i as u64), v, "before freeze {i}");
        }
        assert_eq!(buffer.iter().collect::<Vec<_>>(), values);

        buffer.freeze();
        assert!(buffer.is_frozen());
        assert_eq!(buffer.page_count(), 3);
        assert_eq!(buffer.size(), 10);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(buffer.get(i as u64), v, "after freeze {i}");
        }
    }

    #[test]
    fn test_add_after_freeze_fails() {
        let mut buffer = buffer(64);
        buffer.add(1).unwrap();
        buffer.freeze();
        assert!(buffer.add(2).is_err());
        assert_eq!(buffer.size(), 1);
    }

    #[test]
    fn test_extreme_range_uses_full_width() {
        let mut buffer = buffer(64);
        for i in 0..100 {
            buffer.add(if i % 2 == 0 { i64::MIN } else { i64::MAX }).unwrap();
        }
        buffer.freeze();
        for i in 0..100u64 {
            let expected = if i % 2 == 0 { i64::MIN } else { i64::MAX };
            assert_eq!(buffer.get(i), expected);
        }
    }

    #[test]
    fn test_constant_pages_are_free() {
        let mut constant = buffer(1024);
        let mut varying = buffer(1024);
        for i in 0..10_000 {
            constant.add(77).unwrap();
            varying.add(i * 1_000_003).unwrap();
        }
        constant.freeze();
        varying.freeze();
        assert!(constant.ram_bytes_used() < varying.ram_bytes_used());
        assert!(constant.iter().all(|v| v == 77));
    }

    #[test]
    fn test_get_bulk_stops_at_page_boundary() {
        let mut buffer = buffer(64);
        for i in 0..200 {
            buffer.add(i * 3).unwrap();
        }
        let mut buf = vec![0i64; 100];
        assert_eq!(buffer.get_bulk(60, &mut buf), 4);
        assert_eq!(&buf[..4], &[180, 183, 186, 189]);
        // The pending page is served from the staging buffer.
        assert_eq!(buffer.get_bulk(192, &mut buf), 8);
        assert_eq!(buf[0], 576);
    }
}
