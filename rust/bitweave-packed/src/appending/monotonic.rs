use bitweave_bits::{word::bits_required, zigzag};

use super::{AppendingBuffer, PagePacker, pack_values};
use crate::{
    reader::{NullReader, Reader},
    util::linear_expected,
};

/// Page model for [`MonotonicPacker`]: value `i` is predicted as
/// `min + (average * i) as i64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub min: i64,
    pub average: f32,
}

/// Models each page as a line through its first and last value and stores the
/// zigzag-encoded residuals.
///
/// Any sequence round-trips exactly; sequences close to linear (such as
/// monotonically increasing offsets) compress best.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicPacker;

impl PagePacker for MonotonicPacker {
    type Meta = LinearModel;

    fn pack(
        &self,
        pending: &mut [i64],
        acceptable_overhead_ratio: f32,
    ) -> (LinearModel, Box<dyn Reader>) {
        let count = pending.len();
        let min = pending[0];
        let average = if count == 1 {
            0.0
        } else {
            pending[count - 1].wrapping_sub(min) as f32 / (count - 1) as f32
        };
        let model = LinearModel { min, average };

        let mut max_residual = 0i64;
        for (i, value) in pending.iter_mut().enumerate() {
            let expected = min.wrapping_add(linear_expected(average, i));
            *value = zigzag::encode(value.wrapping_sub(expected));
            // A negative zigzag code means the residual wrapped around.
            max_residual = if *value < 0 || max_residual < 0 {
                -1
            } else {
                max_residual.max(*value)
            };
        }

        if max_residual == 0 {
            log::trace!("sealed linear page of {count} values: min {min}, average {average}");
            return (model, Box::new(NullReader::new(count)));
        }
        let bits_per_value = if max_residual < 0 {
            64
        } else {
            bits_required(max_residual)
        };
        log::trace!(
            "sealed monotonic page of {count} values: min {min}, average {average}, {bits_per_value} bits"
        );
        (
            model,
            pack_values(pending, bits_per_value, acceptable_overhead_ratio),
        )
    }

    #[inline]
    fn decode(&self, model: &LinearModel, stored: i64, element: usize) -> i64 {
        model
            .min
            .wrapping_add(linear_expected(model.average, element))
            .wrapping_add(zigzag::decode(stored))
    }
}

/// Appending buffer tuned for monotonically increasing sequences.
pub type MonotonicAppendingLongBuffer = AppendingBuffer<MonotonicPacker>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppendingConfig;

    fn buffer(page_size: usize) -> MonotonicAppendingLongBuffer {
        MonotonicAppendingLongBuffer::new(AppendingConfig::default().with_page_size(page_size))
            .unwrap()
    }

    #[test]
    fn test_arithmetic_sequence_is_exact() {
        let mut buffer = buffer(1024);
        for i in 0..10 {
            buffer.add(i * 100).unwrap();
        }
        buffer.freeze();
        let decoded: Vec<i64> = buffer.iter().collect();
        assert_eq!(decoded, (0..10).map(|i| i * 100).collect::<Vec<_>>());
    }

    #[test]
    fn test_irregular_increasing_sequence() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut values = Vec::new();
        let mut current = 1_000_000_000i64;
        for _ in 0..5000 {
            current += rng.i64(0..1000);
            values.push(current);
        }
        let mut buffer = buffer(256);
        for &v in &values {
            buffer.add(v).unwrap();
        }
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(buffer.get(i as u64), v);
        }
        buffer.freeze();
        assert_eq!(buffer.iter().collect::<Vec<_>>(), values);
    }

    #[test]
    fn test_non_monotonic_and_extreme_values() {
        let values = [0i64, i64::MAX, i64::MIN, 5, -5, 3, 3, 3, i64::MIN, 0];
        let mut buffer = buffer(4);
        for &v in &values {
            buffer.add(v).unwrap();
        }
        buffer.freeze();
        assert_eq!(buffer.iter().collect::<Vec<_>>(), values);
    }

    #[test]
    fn test_exact_line_takes_no_page_storage() {
        let (model, reader) = MonotonicPacker.pack(&mut [10, 20, 30, 40], 0.0);
        assert_eq!(model, LinearModel { min: 10, average: 10.0 });
        assert_eq!(reader.ram_bytes_used(), std::mem::size_of::<NullReader>());
        assert_eq!(MonotonicPacker.decode(&model, reader.get(3), 3), 40);
    }
}
