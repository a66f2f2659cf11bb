use bitweave_bits::word::{WORD_BITS, low_mask, words_for_bits};
use bitweave_common::{Error, Result, verify_arg, verify_data};

use crate::decoder::EliasFanoDecoder;

/// Index entries are added every `DEFAULT_INDEX_INTERVAL` high values by default.
pub const DEFAULT_INDEX_INTERVAL: u64 = 256;

const MAX_WORDS: u64 = i32::MAX as u64;

/// Encodes a non-decreasing sequence of non-negative values bounded by `upper_bound`
/// in close to `2 + log2(upper_bound / num_values)` bits per value.
///
/// Every value is split into `num_low_bits` low bits, stored packed, and a high part,
/// stored as a unary gap in the upper bit vector: value `i` with high part `h` sets
/// bit `i + h`. A sparse index records, every `index_interval` high values, the
/// position just after the corresponding zero bit of the upper bit vector.
///
/// The three word arrays are exposed for persistence; see [`restore`](Self::restore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliasFanoEncoder {
    pub(crate) num_values: u64,
    pub(crate) upper_bound: i64,
    pub(crate) num_low_bits: u32,
    pub(crate) lower_bits_mask: u64,
    pub(crate) upper_longs: Vec<u64>,
    pub(crate) lower_longs: Vec<u64>,
    pub(crate) index_interval: u64,
    pub(crate) num_index_entries: u64,
    pub(crate) index_entry_bits: u32,
    pub(crate) index_longs: Vec<u64>,
    pub(crate) current_entry_index: u64,
    pub(crate) num_encoded: u64,
    pub(crate) last_encoded: i64,
}

fn word_count(num_bits: Option<u64>, what: &str) -> Result<usize> {
    match num_bits.map(words_for_bits) {
        Some(words) if words <= MAX_WORDS => Ok(words as usize),
        _ => Err(Error::invalid_arg(
            what,
            "too many bits to index with a signed 32-bit word offset",
        )),
    }
}

impl EliasFanoEncoder {
    /// Prepares an encoder for exactly `num_values` values in `0..=upper_bound`.
    ///
    /// Fails when `upper_bound` is negative while values are expected, when
    /// `index_interval < 2`, or when one of the word arrays would be too large.
    pub fn new(num_values: u64, upper_bound: i64, index_interval: u64) -> Result<EliasFanoEncoder> {
        verify_arg!(num_values, num_values <= i64::MAX as u64);
        verify_arg!(upper_bound, num_values == 0 || upper_bound >= 0);
        verify_arg!(index_interval, index_interval >= 2);

        if num_values == 0 {
            return Ok(EliasFanoEncoder {
                num_values,
                upper_bound: -1,
                num_low_bits: 0,
                lower_bits_mask: 0,
                upper_longs: Vec::new(),
                lower_longs: Vec::new(),
                index_interval,
                num_index_entries: 0,
                index_entry_bits: 0,
                index_longs: Vec::new(),
                current_entry_index: 0,
                num_encoded: 0,
                last_encoded: 0,
            });
        }

        // floor(log2(upper_bound / num_values)), or 0 when the quotient is 0.
        let low_bits_factor = upper_bound as u64 / num_values;
        let num_low_bits = if low_bits_factor > 0 {
            WORD_BITS - 1 - low_bits_factor.leading_zeros()
        } else {
            0
        };

        let lower_words = word_count(num_values.checked_mul(num_low_bits as u64), "num_low_bits")?;
        let num_high_bits_clear = upper_bound as u64 >> num_low_bits;
        let upper_words = word_count(num_high_bits_clear.checked_add(num_values), "upper_bound")?;

        let max_high_value = upper_bound as u64 >> num_low_bits;
        let num_index_entries = max_high_value / index_interval;
        let max_index_entry = max_high_value + num_values - 1;
        let index_entry_bits = if max_index_entry == 0 {
            0
        } else {
            WORD_BITS - max_index_entry.leading_zeros()
        };
        let index_words = word_count(
            num_index_entries.checked_mul(index_entry_bits as u64),
            "index_interval",
        )?;

        log::trace!(
            "elias-fano encoder: {num_values} values up to {upper_bound}, {num_low_bits} low bits, \
             {num_index_entries} index entries"
        );
        Ok(EliasFanoEncoder {
            num_values,
            upper_bound,
            num_low_bits,
            lower_bits_mask: low_mask(num_low_bits),
            upper_longs: vec![0; upper_words],
            lower_longs: vec![0; lower_words],
            index_interval,
            num_index_entries,
            index_entry_bits,
            index_longs: vec![0; index_words],
            current_entry_index: 0,
            num_encoded: 0,
            last_encoded: 0,
        })
    }

    /// Like [`new`](Self::new) with [`DEFAULT_INDEX_INTERVAL`].
    pub fn with_default_interval(num_values: u64, upper_bound: i64) -> Result<EliasFanoEncoder> {
        EliasFanoEncoder::new(num_values, upper_bound, DEFAULT_INDEX_INTERVAL)
    }

    /// Appends the next value.
    ///
    /// Fails with an invalid operation once `num_values` values were encoded, and with
    /// an invalid argument when `value` is smaller than the previous value (or negative)
    /// or larger than the upper bound.
    pub fn encode_next(&mut self, value: i64) -> Result<()> {
        if self.num_encoded >= self.num_values {
            return Err(Error::invalid_operation(format!(
                "encode_next called more than {} times",
                self.num_values
            )));
        }
        if value < self.last_encoded {
            return Err(Error::invalid_arg(
                "value",
                format!("{value} smaller than previous {}", self.last_encoded),
            ));
        }
        if value > self.upper_bound {
            return Err(Error::invalid_arg(
                "value",
                format!("{value} larger than upper bound {}", self.upper_bound),
            ));
        }

        let high_value = value as u64 >> self.num_low_bits;
        let high_bit = self.num_encoded + high_value;
        self.upper_longs[(high_bit >> 6) as usize] |= 1 << (high_bit & 63);
        pack_value(
            value as u64 & self.lower_bits_mask,
            &mut self.lower_longs,
            self.num_low_bits,
            self.num_encoded,
        );
        self.last_encoded = value;

        let mut index_value = (self.current_entry_index + 1) * self.index_interval;
        while index_value <= high_value {
            let after_zero_bit_position = index_value + self.num_encoded;
            pack_value(
                after_zero_bit_position,
                &mut self.index_longs,
                self.index_entry_bits,
                self.current_entry_index,
            );
            self.current_entry_index += 1;
            index_value += self.index_interval;
        }
        self.num_encoded += 1;
        Ok(())
    }

    /// Rebuilds a fully encoded sequence from persisted word arrays, as returned by
    /// [`upper_bits`](Self::upper_bits), [`lower_bits`](Self::lower_bits) and
    /// [`index_bits`](Self::index_bits) of an encoder created with the same
    /// parameters.
    pub fn restore(
        num_values: u64,
        upper_bound: i64,
        index_interval: u64,
        upper_bits: Vec<u64>,
        lower_bits: Vec<u64>,
        index_bits: Vec<u64>,
    ) -> Result<EliasFanoEncoder> {
        let mut encoder = EliasFanoEncoder::new(num_values, upper_bound, index_interval)?;
        verify_data!(upper_bits, upper_bits.len() == encoder.upper_longs.len());
        verify_data!(lower_bits, lower_bits.len() == encoder.lower_longs.len());
        verify_data!(index_bits, index_bits.len() == encoder.index_longs.len());
        let set_bits: u64 = upper_bits.iter().map(|w| w.count_ones() as u64).sum();
        verify_data!(upper_bits, set_bits == num_values);

        encoder.upper_longs = upper_bits;
        encoder.lower_longs = lower_bits;
        encoder.index_longs = index_bits;
        encoder.num_encoded = num_values;
        if num_values > 0 {
            let mut decoder = encoder.decoder();
            decoder.to_after_sequence_unchecked();
            let last = decoder.previous_value();
            verify_data!(upper_bits, (0..=upper_bound).contains(&last));
            encoder.last_encoded = last;
            let last_high = last as u64 >> encoder.num_low_bits;
            encoder.current_entry_index = (last_high / index_interval).min(encoder.num_index_entries);
        }
        Ok(encoder)
    }

    /// Whether Elias-Fano is expected to be clearly smaller than a bit set of
    /// `upper_bound` bits: only for bounds above 256 and densities below 1/7.
    pub fn sufficiently_smaller_than_bit_set(num_values: u64, upper_bound: i64) -> bool {
        upper_bound > 4 * WORD_BITS as i64 && (upper_bound / 7) as u64 > num_values
    }

    /// Returns a new cursor over the values encoded so far.
    pub fn decoder(&self) -> EliasFanoDecoder<'_> {
        EliasFanoDecoder::new(self)
    }

    pub fn num_values(&self) -> u64 {
        self.num_values
    }

    pub fn num_encoded(&self) -> u64 {
        self.num_encoded
    }

    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    pub fn num_low_bits(&self) -> u32 {
        self.num_low_bits
    }

    pub fn index_interval(&self) -> u64 {
        self.index_interval
    }

    pub fn lower_bits(&self) -> &[u64] {
        &self.lower_longs
    }

    pub fn upper_bits(&self) -> &[u64] {
        &self.upper_longs
    }

    pub fn index_bits(&self) -> &[u64] {
        &self.index_longs
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + 8 * (self.upper_longs.capacity()
                + self.lower_longs.capacity()
                + self.index_longs.capacity())
    }
}

/// Stores the low `num_bits` bits of `value` as entry `pack_index` of an LSB-first
/// bit vector.
fn pack_value(value: u64, words: &mut [u64], num_bits: u32, pack_index: u64) {
    if num_bits == 0 {
        return;
    }
    let bit_pos = num_bits as u64 * pack_index;
    let index = (bit_pos >> 6) as usize;
    let shift = (bit_pos & 63) as u32;
    words[index] |= value << shift;
    if shift + num_bits > WORD_BITS {
        words[index + 1] = value >> (WORD_BITS - shift);
    }
}

/// Reads entry `pack_index` of `num_bits` bits, masked by `mask`.
pub(crate) fn unpack_value(words: &[u64], num_bits: u32, pack_index: u64, mask: u64) -> u64 {
    if num_bits == 0 {
        return 0;
    }
    let bit_pos = pack_index * num_bits as u64;
    let index = (bit_pos >> 6) as usize;
    let shift = (bit_pos & 63) as u32;
    let mut value = words[index] >> shift;
    if shift + num_bits > WORD_BITS {
        value |= words[index + 1] << (WORD_BITS - shift);
    }
    value & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_parameters() {
        let encoder = EliasFanoEncoder::new(8, 100, DEFAULT_INDEX_INTERVAL).unwrap();
        // floor(log2(100 / 8)) = 3
        assert_eq!(encoder.num_low_bits(), 3);
        assert_eq!(encoder.lower_bits().len(), 1);
        assert_eq!(encoder.upper_bits().len(), 1);
        assert!(encoder.index_bits().is_empty());

        let dense = EliasFanoEncoder::new(100, 50, 2).unwrap();
        assert_eq!(dense.num_low_bits(), 0);
        assert!(dense.lower_bits().is_empty());
    }

    #[test]
    fn test_encoded_bits() {
        let mut encoder = EliasFanoEncoder::new(4, 15, DEFAULT_INDEX_INTERVAL).unwrap();
        assert_eq!(encoder.num_low_bits(), 1);
        for v in [1, 4, 5, 15] {
            encoder.encode_next(v).unwrap();
        }
        // High parts 0, 2, 2, 7 set bits 0, 3, 4, 10.
        assert_eq!(encoder.upper_bits()[0], 0b100_0001_1001);
        // Low bits 1, 0, 1, 1.
        assert_eq!(encoder.lower_bits()[0], 0b1101);
    }

    #[test]
    fn test_order_and_bounds_enforced() {
        let mut encoder = EliasFanoEncoder::new(4, 10, 2).unwrap();
        encoder.encode_next(5).unwrap();
        let err = encoder.encode_next(3).unwrap_err();
        assert!(matches!(err.kind(), bitweave_common::ErrorKind::InvalidArgument { .. }));
        assert!(encoder.encode_next(11).is_err());
        encoder.encode_next(5).unwrap();
        encoder.encode_next(10).unwrap();
        encoder.encode_next(10).unwrap();
        let err = encoder.encode_next(10).unwrap_err();
        assert!(matches!(err.kind(), bitweave_common::ErrorKind::InvalidOperation { .. }));
        assert_eq!(encoder.num_encoded(), 4);
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut encoder = EliasFanoEncoder::new(2, 10, 2).unwrap();
        assert!(encoder.encode_next(-1).is_err());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(EliasFanoEncoder::new(1, -1, 256).is_err());
        assert!(EliasFanoEncoder::new(1, 10, 1).is_err());
        assert!(EliasFanoEncoder::new(1 << 40, i64::MAX, 256).is_err());
        let empty = EliasFanoEncoder::new(0, -5, 256).unwrap();
        assert_eq!(empty.upper_bound(), -1);
    }

    #[test]
    fn test_bit_set_heuristic() {
        assert!(!EliasFanoEncoder::sufficiently_smaller_than_bit_set(1, 256));
        assert!(EliasFanoEncoder::sufficiently_smaller_than_bit_set(10, 1000));
        assert!(!EliasFanoEncoder::sufficiently_smaller_than_bit_set(200, 1000));
    }

    #[test]
    fn test_restore_matches_original() {
        let values = [3i64, 3, 17, 200, 201, 999, 4000, 4000, 65_000];
        let mut encoder = EliasFanoEncoder::new(values.len() as u64, 65_000, 4).unwrap();
        for &v in &values {
            encoder.encode_next(v).unwrap();
        }
        let restored = EliasFanoEncoder::restore(
            values.len() as u64,
            65_000,
            4,
            encoder.upper_bits().to_vec(),
            encoder.lower_bits().to_vec(),
            encoder.index_bits().to_vec(),
        )
        .unwrap();
        assert_eq!(restored, encoder);

        let truncated = EliasFanoEncoder::restore(
            values.len() as u64,
            65_000,
            4,
            encoder.upper_bits()[1..].to_vec(),
            encoder.lower_bits().to_vec(),
            encoder.index_bits().to_vec(),
        );
        assert!(truncated.is_err());
    }

    #[test]
    fn test_ram_bytes_used_grows_with_values() {
        let small = EliasFanoEncoder::new(10, 1000, 256).unwrap();
        let large = EliasFanoEncoder::new(10_000, 1_000_000, 256).unwrap();
        assert!(small.ram_bytes_used() < large.ram_bytes_used());
    }
}
