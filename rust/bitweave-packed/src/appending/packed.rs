use bitweave_bits::word::bits_required;

use super::{AppendingBuffer, PagePacker, pack_values};
use crate::reader::Reader;

/// Stores each page as-is at the width of its largest value; pages holding a
/// negative value use 64 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPacker;

impl PagePacker for PlainPacker {
    type Meta = ();

    fn pack(&self, pending: &mut [i64], acceptable_overhead_ratio: f32) -> ((), Box<dyn Reader>) {
        let min = pending.iter().copied().min().unwrap_or(0);
        let max = pending.iter().copied().max().unwrap_or(0);
        let bits_per_value = if min < 0 { 64 } else { bits_required(max) };
        log::trace!("sealed plain page of {} values: {} bits", pending.len(), bits_per_value);
        ((), pack_values(pending, bits_per_value, acceptable_overhead_ratio))
    }

    #[inline]
    fn decode(&self, _meta: &(), stored: i64, _element: usize) -> i64 {
        stored
    }
}

/// Appending buffer packing each page without any delta modeling.
pub type AppendingPackedLongBuffer = AppendingBuffer<PlainPacker>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppendingConfig;

    #[test]
    fn test_round_trip() {
        let mut rng = fastrand::Rng::with_seed(1);
        let values: Vec<i64> = (0..3000)
            .map(|i| if i % 500 == 7 { -rng.i64(1..100) } else { rng.i64(0..1 << 20) })
            .collect();
        let mut buffer =
            AppendingPackedLongBuffer::new(AppendingConfig::default().with_page_size(512)).unwrap();
        for &v in &values {
            buffer.add(v).unwrap();
        }
        buffer.freeze();
        assert_eq!(buffer.size(), 3000);
        assert_eq!(buffer.iter().len(), 3000);
        assert!(buffer.iter().eq(values.iter().copied()));
    }

    #[test]
    fn test_empty_buffer() {
        let mut buffer = AppendingPackedLongBuffer::new(AppendingConfig::default()).unwrap();
        assert!(buffer.is_empty());
        buffer.freeze();
        assert_eq!(buffer.page_count(), 0);
        assert_eq!(buffer.iter().next(), None);
    }
}
