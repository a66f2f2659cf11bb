//! Helpers operating on single 64-bit words.
//!
//! Values handled by the packed codecs are conceptually unsigned: an `i64` with the sign
//! bit set is treated as a 64-bit quantity, so every width computation here works on the
//! raw two's complement bits.

/// Number of bits in a storage word.
pub const WORD_BITS: u32 = 64;

/// `log2(WORD_BITS)`.
pub const LOG2_WORD_BITS: u32 = 6;

/// Returns the number of bits needed to represent `value` (at least 1).
///
/// Negative values need all 64 bits.
#[inline]
pub fn bits_required(value: i64) -> u32 {
    unsigned_bits_required(value as u64)
}

/// Returns the number of bits needed to represent `value` interpreted as unsigned
/// (at least 1).
#[inline]
pub fn unsigned_bits_required(value: u64) -> u32 {
    (WORD_BITS - value.leading_zeros()).max(1)
}

/// Largest value storable with `bits_per_value` bits.
///
/// For 64 bits this is `i64::MAX`: callers relying on the full 64-bit range store
/// negative values as well.
#[inline]
pub fn max_value(bits_per_value: u32) -> i64 {
    debug_assert!((1..=64).contains(&bits_per_value));
    if bits_per_value == 64 {
        i64::MAX
    } else {
        !(-1i64 << bits_per_value)
    }
}

/// Mask of the `n` lowest bits; `n` may be anything in `0..=64`.
#[inline]
pub fn low_mask(n: u32) -> u64 {
    if n >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Number of 64-bit words needed to hold `num_bits` bits.
#[inline]
pub fn words_for_bits(num_bits: u64) -> u64 {
    num_bits.div_ceil(WORD_BITS as u64)
}

/// Position (0..64) of the set bit of the given 0-based `rank` inside `word`.
///
/// The word must contain more than `rank` set bits. Whole bytes are skipped with
/// population counts before the final bit-by-bit step.
#[inline]
pub fn select_in_word(word: u64, rank: u32) -> u32 {
    debug_assert!(rank < word.count_ones(), "rank {rank} in {word:#x}");
    let mut w = word;
    let mut rank = rank;
    let mut base = 0;
    loop {
        let ones = (w & 0xFF).count_ones();
        if rank < ones {
            break;
        }
        rank -= ones;
        w >>= 8;
        base += 8;
    }
    for _ in 0..rank {
        w &= w - 1;
    }
    base + w.trailing_zeros()
}

/// Greatest common divisor.
#[inline]
pub fn gcd(a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 9);
        assert_eq!(bits_required(i64::MAX), 63);
        assert_eq!(bits_required(-1), 64);
        assert_eq!(bits_required(i64::MIN), 64);
        assert_eq!(unsigned_bits_required(u64::MAX), 64);
    }

    #[test]
    fn test_max_value() {
        assert_eq!(max_value(1), 1);
        assert_eq!(max_value(8), 255);
        assert_eq!(max_value(63), i64::MAX);
        assert_eq!(max_value(64), i64::MAX);
        for bpv in 1..64 {
            assert_eq!(bits_required(max_value(bpv)), bpv);
        }
    }

    #[test]
    fn test_low_mask() {
        assert_eq!(low_mask(0), 0);
        assert_eq!(low_mask(3), 0b111);
        assert_eq!(low_mask(63), u64::MAX >> 1);
        assert_eq!(low_mask(64), u64::MAX);
    }

    #[test]
    fn test_select_in_word() {
        assert_eq!(select_in_word(1, 0), 0);
        assert_eq!(select_in_word(1 << 63, 0), 63);
        assert_eq!(select_in_word(0b1011_0000, 2), 7);
        assert_eq!(select_in_word(u64::MAX, 40), 40);

        let mut rng = fastrand::Rng::with_seed(17);
        for _ in 0..1000 {
            let word = rng.u64(1..);
            let positions: Vec<u32> = (0..64).filter(|i| word & (1 << i) != 0).collect();
            for (rank, &pos) in positions.iter().enumerate() {
                assert_eq!(select_in_word(word, rank as u32), pos);
            }
        }
    }

    #[test]
    fn test_gcd_and_words() {
        assert_eq!(gcd(64, 24), 8);
        assert_eq!(gcd(64, 7), 1);
        assert_eq!(words_for_bits(0), 0);
        assert_eq!(words_for_bits(1), 1);
        assert_eq!(words_for_bits(64), 1);
        assert_eq!(words_for_bits(65), 2);
    }
}
