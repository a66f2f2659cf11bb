//! Bulk conversion between arrays of values and packed blocks.
//!
//! A kernel processes data in *iterations*: each iteration consumes or produces exactly
//! `long_block_count()` words (or `byte_block_count()` bytes) holding
//! `long_value_count()` (or `byte_value_count()`) values, the smallest unit with no
//! wasted bits. Callers size their slices as `iterations * count`.
//!
//! Encoders assume every value fits in `bits_per_value` bits; this is only checked in
//! debug builds.

use bitweave_common::{Error, Result};
use seq_macro::seq;

use crate::format::Format;

pub mod packed;
pub mod single_block;

pub use packed::{FixedWidth, PackedBulkOperation, PackedLayout, SpecializedBulkOperation};
pub use single_block::SingleBlockBulkOperation;

pub trait BulkOperation: Send + Sync {
    fn bits_per_value(&self) -> u32;

    /// Number of 64-bit blocks consumed or produced per iteration.
    fn long_block_count(&self) -> usize;

    /// Number of values consumed or produced per iteration over 64-bit blocks.
    fn long_value_count(&self) -> usize;

    /// Number of bytes consumed or produced per iteration.
    fn byte_block_count(&self) -> usize;

    /// Number of values consumed or produced per iteration over bytes.
    fn byte_value_count(&self) -> usize;

    fn decode_longs(&self, blocks: &[u64], values: &mut [i64], iterations: usize);

    fn decode_bytes(&self, blocks: &[u8], values: &mut [i64], iterations: usize);

    /// Fails with an unsupported-operation error when values are wider than 32 bits.
    fn decode_longs_to_ints(
        &self,
        blocks: &[u64],
        values: &mut [i32],
        iterations: usize,
    ) -> Result<()>;

    /// Fails with an unsupported-operation error when values are wider than 32 bits.
    fn decode_bytes_to_ints(
        &self,
        blocks: &[u8],
        values: &mut [i32],
        iterations: usize,
    ) -> Result<()>;

    fn encode_longs(&self, values: &[i64], blocks: &mut [u64], iterations: usize);

    fn encode_longs_to_bytes(&self, values: &[i64], blocks: &mut [u8], iterations: usize);

    fn encode_ints(&self, values: &[i32], blocks: &mut [u64], iterations: usize);

    fn encode_ints_to_bytes(&self, values: &[i32], blocks: &mut [u8], iterations: usize);

    /// Number of iterations to run at once so that the byte blocks plus the decoded
    /// values of one batch fit in `ram_budget` bytes, without exceeding what
    /// `value_count` values need.
    fn compute_iterations(&self, value_count: usize, ram_budget: usize) -> usize {
        let byte_value_count = self.byte_value_count();
        let iterations = ram_budget / (self.byte_block_count() + 8 * byte_value_count);
        if iterations == 0 {
            1
        } else if (iterations - 1) * byte_value_count >= value_count {
            value_count.div_ceil(byte_value_count)
        } else {
            iterations
        }
    }
}

#[cold]
pub(crate) fn too_wide_for_ints(bits_per_value: u32) -> Result<()> {
    Err(Error::unsupported(format!(
        "cannot decode {bits_per_value}-bit values into 32-bit integers"
    )))
}

seq!(N in 1..=24 {
    static SPECIALIZED: [&'static dyn BulkOperation; 24] = [
        #( &PackedBulkOperation(FixedWidth::<N>), )*
    ];
});

seq!(N in 25..=64 {
    static GENERIC: [PackedBulkOperation; 40] = [
        #( PackedBulkOperation(PackedLayout::new(N)), )*
    ];
});

static SINGLE_BLOCK: [SingleBlockBulkOperation; 14] = [
    SingleBlockBulkOperation::new(1),
    SingleBlockBulkOperation::new(2),
    SingleBlockBulkOperation::new(3),
    SingleBlockBulkOperation::new(4),
    SingleBlockBulkOperation::new(5),
    SingleBlockBulkOperation::new(6),
    SingleBlockBulkOperation::new(7),
    SingleBlockBulkOperation::new(8),
    SingleBlockBulkOperation::new(9),
    SingleBlockBulkOperation::new(10),
    SingleBlockBulkOperation::new(12),
    SingleBlockBulkOperation::new(16),
    SingleBlockBulkOperation::new(21),
    SingleBlockBulkOperation::new(32),
];

/// Returns the kernel for `format` and `bits_per_value`.
///
/// The combination must be supported (see [`Format::is_supported`]).
pub fn bulk_operation(format: Format, bits_per_value: u32) -> &'static dyn BulkOperation {
    match format {
        Format::Packed => match bits_per_value {
            1..=24 => SPECIALIZED[bits_per_value as usize - 1],
            25..=64 => &GENERIC[bits_per_value as usize - 25],
            _ => unreachable!("Unsupported width: {bits_per_value}"),
        },
        Format::PackedSingleBlock => {
            let slot = match bits_per_value {
                1..=10 => bits_per_value as usize - 1,
                12 => 10,
                16 => 11,
                21 => 12,
                32 => 13,
                _ => unreachable!("Unsupported single-block width: {bits_per_value}"),
            };
            &SINGLE_BLOCK[slot]
        }
    }
}

/// Checked variant of [`bulk_operation`].
pub fn encoder(format: Format, bits_per_value: u32) -> Result<&'static dyn BulkOperation> {
    if !format.is_supported(bits_per_value) {
        return Err(Error::invalid_arg(
            "bits_per_value",
            format!("{bits_per_value} is not supported by {format:?}"),
        ));
    }
    Ok(bulk_operation(format, bits_per_value))
}

/// Checked variant of [`bulk_operation`]; encoders and decoders are the same kernels.
pub fn decoder(format: Format, bits_per_value: u32) -> Result<&'static dyn BulkOperation> {
    encoder(format, bits_per_value)
}

#[cfg(test)]
mod tests {
    use bitweave_bits::word::max_value;
    use paste::paste;

    use super::*;

    fn random_values(rng: &mut fastrand::Rng, count: usize, bits_per_value: u32) -> Vec<i64> {
        (0..count)
            .map(|_| {
                if bits_per_value == 64 {
                    rng.i64(..)
                } else {
                    rng.i64(0..=max_value(bits_per_value))
                }
            })
            .collect()
    }

    fn check_round_trip(format: Format, bits_per_value: u32) {
        let op = bulk_operation(format, bits_per_value);
        assert_eq!(op.bits_per_value(), bits_per_value);
        if format == Format::Packed {
            assert_eq!(
                op.long_value_count() * bits_per_value as usize,
                64 * op.long_block_count()
            );
        }
        assert!(op.byte_value_count() * bits_per_value as usize <= 8 * op.byte_block_count());

        let mut rng = fastrand::Rng::with_seed(bits_per_value as u64);
        let iterations = 1 + rng.usize(..5);

        let values = random_values(&mut rng, iterations * op.long_value_count(), bits_per_value);
        let mut blocks = vec![0u64; iterations * op.long_block_count()];
        op.encode_longs(&values, &mut blocks, iterations);
        let mut decoded = vec![0i64; values.len()];
        op.decode_longs(&blocks, &mut decoded, iterations);
        assert_eq!(decoded, values, "{format:?} {bits_per_value} longs");

        let values = random_values(&mut rng, iterations * op.byte_value_count(), bits_per_value);
        let mut bytes = vec![0u8; iterations * op.byte_block_count()];
        op.encode_longs_to_bytes(&values, &mut bytes, iterations);
        let mut decoded = vec![0i64; values.len()];
        op.decode_bytes(&bytes, &mut decoded, iterations);
        assert_eq!(decoded, values, "{format:?} {bits_per_value} bytes");

        if bits_per_value <= 32 {
            let ints: Vec<i32> = values.iter().map(|&v| v as i32).collect();
            let mut bytes = vec![0u8; iterations * op.byte_block_count()];
            op.encode_ints_to_bytes(&ints, &mut bytes, iterations);
            let mut decoded = vec![0i32; ints.len()];
            op.decode_bytes_to_ints(&bytes, &mut decoded, iterations).unwrap();
            assert_eq!(decoded, ints);

            let ints: Vec<i32> = (0..iterations * op.long_value_count())
                .map(|i| values[i % values.len()] as i32)
                .collect();
            let mut blocks = vec![0u64; iterations * op.long_block_count()];
            op.encode_ints(&ints, &mut blocks, iterations);
            let mut decoded = vec![0i32; ints.len()];
            op.decode_longs_to_ints(&blocks, &mut decoded, iterations).unwrap();
            assert_eq!(decoded, ints);
        } else {
            let mut decoded = vec![0i32; op.long_value_count()];
            assert!(op.decode_longs_to_ints(&blocks, &mut decoded, 1).is_err());
            let mut decoded = vec![0i32; op.byte_value_count()];
            assert!(op.decode_bytes_to_ints(&bytes, &mut decoded, 1).is_err());
        }
    }

    macro_rules! impl_round_trip {
        ($W:expr) => {
            paste! {
                #[test]
                fn [<test_packed_round_trip_ $W>]() {
                    check_round_trip(Format::Packed, $W);
                }
            }
        };
    }

    seq!(W in 1..=64 { impl_round_trip!(W); });

    #[test]
    fn test_single_block_round_trip() {
        for bits_per_value in crate::format::SINGLE_BLOCK_BITS {
            check_round_trip(Format::PackedSingleBlock, bits_per_value);
        }
    }

    #[test]
    fn test_specialized_matches_generic() {
        let mut rng = fastrand::Rng::with_seed(7);
        for bits_per_value in 1..=24 {
            let generic = PackedBulkOperation(PackedLayout::new(bits_per_value));
            let specialized = bulk_operation(Format::Packed, bits_per_value);
            assert_eq!(generic.long_block_count(), specialized.long_block_count());
            assert_eq!(generic.byte_value_count(), specialized.byte_value_count());

            let values = random_values(&mut rng, 3 * generic.long_value_count(), bits_per_value);
            let mut a = vec![0u64; 3 * generic.long_block_count()];
            let mut b = a.clone();
            generic.encode_longs(&values, &mut a, 3);
            specialized.encode_longs(&values, &mut b, 3);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_msb_first_layout() {
        let op = bulk_operation(Format::Packed, 4);
        let values: Vec<i64> = (0..16).collect();
        let mut blocks = [0u64; 1];
        op.encode_longs(&values, &mut blocks, 1);
        assert_eq!(blocks[0], 0x0123_4567_89AB_CDEF);

        let mut bytes = vec![0u8; op.byte_block_count()];
        op.encode_longs_to_bytes(&values[..op.byte_value_count()], &mut bytes, 1);
        assert_eq!(bytes[0], 0x01);
    }

    #[test]
    fn test_compute_iterations() {
        let op = bulk_operation(Format::Packed, 7);
        // 8 values per 7 bytes.
        assert_eq!(op.byte_value_count(), 8);
        assert_eq!(op.byte_block_count(), 7);
        assert_eq!(op.compute_iterations(100, 0), 1);
        assert_eq!(op.compute_iterations(100, 1024), 13);
        assert_eq!(op.compute_iterations(1_000_000, 1024), 1024 / (7 + 64));
    }

    #[test]
    fn test_checked_lookup() {
        assert!(encoder(Format::Packed, 0).is_err());
        assert!(encoder(Format::Packed, 65).is_err());
        assert!(decoder(Format::PackedSingleBlock, 11).is_err());
        assert_eq!(decoder(Format::PackedSingleBlock, 21).unwrap().long_value_count(), 3);
    }
}
