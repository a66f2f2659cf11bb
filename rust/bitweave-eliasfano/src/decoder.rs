use bitweave_bits::word::{WORD_BITS, low_mask, select_in_word};
use bitweave_common::{Error, Result};

use crate::encoder::{EliasFanoEncoder, unpack_value};

/// Returned by the decoding methods when no value is left in the direction of travel.
/// Encoded values are never negative.
pub const NO_MORE_VALUES: i64 = -1;

const WORD_MASK: i64 = 63;

/// A cursor over the values of an [`EliasFanoEncoder`].
///
/// The cursor only holds a position, so any number of cursors may read one encoder
/// concurrently. It sees the values encoded when it was created.
///
/// The position is a value index plus the position of that value's bit in the upper
/// bit vector. `cur_high_long` caches the word holding that bit, shifted so that the
/// bit sits at the low end (forward moves) or the high end (backward moves).
pub struct EliasFanoDecoder<'a> {
    encoder: &'a EliasFanoEncoder,
    num_encoded: i64,
    num_index_entries: i64,
    index_mask: u64,
    ef_index: i64,
    set_bit_for_index: i64,
    cur_high_long: u64,
}

impl<'a> EliasFanoDecoder<'a> {
    pub(crate) fn new(encoder: &'a EliasFanoEncoder) -> EliasFanoDecoder<'a> {
        EliasFanoDecoder {
            encoder,
            num_encoded: encoder.num_encoded as i64,
            num_index_entries: encoder.current_entry_index as i64,
            index_mask: low_mask(encoder.index_entry_bits),
            ef_index: -1,
            set_bit_for_index: -1,
            cur_high_long: 0,
        }
    }

    pub fn encoder(&self) -> &'a EliasFanoEncoder {
        self.encoder
    }

    pub fn num_encoded(&self) -> u64 {
        self.num_encoded as u64
    }

    /// Index of the current value. Fails before the first and after the last value.
    pub fn current_index(&self) -> Result<u64> {
        if self.ef_index < 0 {
            return Err(Error::invalid_operation("current_index before sequence"));
        }
        if self.ef_index >= self.num_encoded {
            return Err(Error::invalid_operation("current_index after sequence"));
        }
        Ok(self.ef_index as u64)
    }

    /// The value at [`current_index`](Self::current_index).
    pub fn current_value(&self) -> Result<i64> {
        self.current_index()?;
        Ok(self.combine(self.current_high_value(), self.current_low_value()))
    }

    fn current_high_value(&self) -> i64 {
        self.set_bit_for_index - self.ef_index
    }

    fn current_low_value(&self) -> u64 {
        debug_assert!(self.ef_index >= 0 && self.ef_index < self.num_encoded);
        unpack_value(
            &self.encoder.lower_longs,
            self.encoder.num_low_bits,
            self.ef_index as u64,
            self.encoder.lower_bits_mask,
        )
    }

    fn combine(&self, high_value: i64, low_value: u64) -> i64 {
        (high_value << self.encoder.num_low_bits) | low_value as i64
    }

    #[inline]
    fn upper_word(&self, bit: i64) -> u64 {
        self.encoder.upper_longs[(bit >> 6) as usize]
    }

    /// Positions the cursor before the first value.
    pub fn to_before_sequence(&mut self) {
        self.ef_index = -1;
        self.set_bit_for_index = -1;
    }

    /// Positions the cursor after the last value.
    pub fn to_after_sequence(&mut self) {
        self.ef_index = self.num_encoded;
        self.set_bit_for_index =
            (self.encoder.last_encoded as u64 >> self.encoder.num_low_bits) as i64 + self.num_encoded;
    }

    /// Like [`to_after_sequence`](Self::to_after_sequence) without relying on the last
    /// encoded value: the bit position is the end of the upper bit vector.
    pub(crate) fn to_after_sequence_unchecked(&mut self) {
        self.ef_index = self.num_encoded;
        self.set_bit_for_index = (self.encoder.upper_longs.len() as i64) * WORD_BITS as i64;
    }

    fn exhausted_forward(&mut self) -> i64 {
        self.to_after_sequence();
        NO_MORE_VALUES
    }

    fn exhausted_backward(&mut self) -> i64 {
        self.to_before_sequence();
        NO_MORE_VALUES
    }

    fn to_after_current_high_bit(&mut self) -> bool {
        self.ef_index += 1;
        if self.ef_index >= self.num_encoded {
            self.to_after_sequence();
            return false;
        }
        self.set_bit_for_index += 1;
        self.cur_high_long =
            self.upper_word(self.set_bit_for_index) >> (self.set_bit_for_index & WORD_MASK);
        true
    }

    fn to_next_high_long(&mut self) {
        self.set_bit_for_index += WORD_BITS as i64 - (self.set_bit_for_index & WORD_MASK);
        self.cur_high_long = self.upper_word(self.set_bit_for_index);
    }

    fn next_high_value(&mut self) -> i64 {
        while self.cur_high_long == 0 {
            self.to_next_high_long();
        }
        self.set_bit_for_index += self.cur_high_long.trailing_zeros() as i64;
        self.current_high_value()
    }

    /// Moves to the next value and returns it, or [`NO_MORE_VALUES`].
    pub fn next_value(&mut self) -> i64 {
        if !self.to_after_current_high_bit() {
            return NO_MORE_VALUES;
        }
        let high_value = self.next_high_value();
        self.combine(high_value, self.current_low_value())
    }

    /// Moves to the value at `index`, which must be beyond the current index. Returns
    /// `false`, leaving the cursor after the sequence, when there is no such value.
    pub fn advance_to_index(&mut self, index: u64) -> bool {
        let index = index as i64;
        debug_assert!(index > self.ef_index);
        if index >= self.num_encoded {
            self.to_after_sequence();
            return false;
        }
        if !self.to_after_current_high_bit() {
            return false;
        }
        let mut set_bits = self.cur_high_long.count_ones() as i64;
        while set_bits <= index - self.ef_index {
            self.ef_index += set_bits;
            self.to_next_high_long();
            set_bits = self.cur_high_long.count_ones() as i64;
        }
        let rank = (index - self.ef_index) as u32;
        self.set_bit_for_index += select_in_word(self.cur_high_long, rank) as i64;
        self.ef_index = index;
        true
    }

    /// Moves forward to the first value at or above `target` and returns it, or
    /// [`NO_MORE_VALUES`]. The search starts after the current value.
    pub fn advance_to_value(&mut self, target: i64) -> i64 {
        self.ef_index += 1;
        if self.ef_index >= self.num_encoded {
            return self.exhausted_forward();
        }
        self.set_bit_for_index += 1;
        let mut upper_long = self.upper_word(self.set_bit_for_index);
        self.cur_high_long = upper_long >> (self.set_bit_for_index & WORD_MASK);

        let high_target = (target.max(0) as u64 >> self.encoder.num_low_bits) as i64;

        // Jump to the last index entry not beyond the target, when it is ahead.
        let entries = (high_target / self.encoder.index_interval as i64).min(self.num_index_entries);
        if entries > 0 {
            let entry = entries - 1;
            let index_high_value = entries * self.encoder.index_interval as i64;
            if index_high_value > self.current_high_value() {
                self.set_bit_for_index = unpack_value(
                    &self.encoder.index_longs,
                    self.encoder.index_entry_bits,
                    entry as u64,
                    self.index_mask,
                ) as i64;
                self.ef_index = self.set_bit_for_index - index_high_value;
                upper_long = self.upper_word(self.set_bit_for_index);
                self.cur_high_long = upper_long >> (self.set_bit_for_index & WORD_MASK);
            }
            debug_assert!(self.ef_index < self.num_encoded);
        }

        // Skip whole words while they hold too few zero bits to reach the target.
        let mut set_bits = self.cur_high_long.count_ones() as i64;
        let mut clear_bits = WORD_BITS as i64 - set_bits - (self.set_bit_for_index & WORD_MASK);
        if self.current_high_value() + clear_bits < high_target {
            loop {
                self.ef_index += set_bits;
                if self.ef_index >= self.num_encoded {
                    return self.exhausted_forward();
                }
                self.set_bit_for_index += WORD_BITS as i64 - (self.set_bit_for_index & WORD_MASK);
                upper_long = self.upper_word(self.set_bit_for_index);
                self.cur_high_long = upper_long;
                set_bits = self.cur_high_long.count_ones() as i64;
                clear_bits = WORD_BITS as i64 - set_bits;
                if self.current_high_value() + clear_bits >= high_target {
                    break;
                }
            }
            while self.cur_high_long == 0 {
                self.set_bit_for_index += WORD_BITS as i64;
                upper_long = self.upper_word(self.set_bit_for_index);
                self.cur_high_long = upper_long;
            }
        }

        // Select the zero bit that ends the gap below the target's high part.
        let rank = high_target - self.current_high_value();
        debug_assert!(rank <= WORD_BITS as i64);
        if rank >= 1 {
            let clear_bit = select_in_word(!self.cur_high_long, (rank - 1) as u32) as i64;
            self.set_bit_for_index += clear_bit + 1;
            self.ef_index += clear_bit - rank + 1;
            if self.ef_index >= self.num_encoded {
                return self.exhausted_forward();
            }
            if self.set_bit_for_index & WORD_MASK == 0 {
                upper_long = self.upper_word(self.set_bit_for_index);
                self.cur_high_long = upper_long;
            } else {
                self.cur_high_long = upper_long >> (self.set_bit_for_index & WORD_MASK);
            }
            while self.cur_high_long == 0 {
                self.set_bit_for_index += WORD_BITS as i64 - (self.set_bit_for_index & WORD_MASK);
                upper_long = self.upper_word(self.set_bit_for_index);
                self.cur_high_long = upper_long;
            }
        }
        self.set_bit_for_index += self.cur_high_long.trailing_zeros() as i64;
        debug_assert!(self.current_high_value() >= high_target);

        // The index only bounds the high part: finish on full values.
        let mut value = self.combine(self.current_high_value(), self.current_low_value());
        while value < target {
            value = self.next_value();
            if value == NO_MORE_VALUES {
                return NO_MORE_VALUES;
            }
        }
        value
    }

    fn to_before_current_high_bit(&mut self) -> bool {
        self.ef_index -= 1;
        if self.ef_index < 0 {
            self.to_before_sequence();
            return false;
        }
        self.set_bit_for_index -= 1;
        let left_shift = WORD_MASK - (self.set_bit_for_index & WORD_MASK);
        self.cur_high_long = self.upper_word(self.set_bit_for_index) << left_shift;
        true
    }

    fn to_previous_high_long(&mut self) {
        self.set_bit_for_index -= (self.set_bit_for_index & WORD_MASK) + 1;
        self.cur_high_long = self.upper_word(self.set_bit_for_index);
    }

    fn previous_high_value(&mut self) -> i64 {
        while self.cur_high_long == 0 {
            self.to_previous_high_long();
        }
        self.set_bit_for_index -= self.cur_high_long.leading_zeros() as i64;
        self.current_high_value()
    }

    /// Moves to the previous value and returns it, or [`NO_MORE_VALUES`].
    pub fn previous_value(&mut self) -> i64 {
        if !self.to_before_current_high_bit() {
            return NO_MORE_VALUES;
        }
        let high_value = self.previous_high_value();
        self.combine(high_value, self.current_low_value())
    }

    fn back_to_high_value(&mut self, high_target: i64) -> i64 {
        let left_shift = WORD_MASK - (self.set_bit_for_index & WORD_MASK);
        let mut set_bits = self.cur_high_long.count_ones() as i64;
        let mut clear_bits = WORD_BITS as i64 - set_bits - left_shift;
        while self.current_high_value() - clear_bits > high_target {
            self.ef_index -= set_bits;
            if self.ef_index < 0 {
                return self.exhausted_backward();
            }
            self.to_previous_high_long();
            set_bits = self.cur_high_long.count_ones() as i64;
            clear_bits = WORD_BITS as i64 - set_bits;
        }
        let mut high_value = self.previous_high_value();
        while high_value > high_target {
            if !self.to_before_current_high_bit() {
                return NO_MORE_VALUES;
            }
            high_value = self.previous_high_value();
        }
        high_value
    }

    /// Moves backward to the last value at or below `target` and returns it, or
    /// [`NO_MORE_VALUES`]. The search starts before the current value.
    pub fn back_to_value(&mut self, target: i64) -> i64 {
        if target < 0 || !self.to_before_current_high_bit() {
            return self.exhausted_backward();
        }
        let high_target = (target as u64 >> self.encoder.num_low_bits) as i64;
        let high_value = self.back_to_high_value(high_target);
        if high_value == NO_MORE_VALUES {
            return NO_MORE_VALUES;
        }
        let mut value = self.combine(high_value, self.current_low_value());
        while value > target {
            value = self.previous_value();
            if value == NO_MORE_VALUES {
                return NO_MORE_VALUES;
            }
        }
        value
    }
}
