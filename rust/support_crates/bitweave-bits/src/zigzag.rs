//! ZigZag mapping of signed integers onto unsigned ones so that small magnitudes of
//! either sign get small codes: `0, -1, 1, -2, 2, ...` map to `0, 1, 2, 3, 4, ...`.

#[inline]
pub fn encode(value: i64) -> i64 {
    (value << 1) ^ (value >> 63)
}

#[inline]
pub fn decode(value: i64) -> i64 {
    ((value as u64) >> 1) as i64 ^ -(value & 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        let expected = [(0, 0), (-1, 1), (1, 2), (-2, 3), (2, 4)];
        for (v, z) in expected {
            assert_eq!(encode(v), z);
            assert_eq!(decode(z), v);
        }
    }

    #[test]
    fn test_extremes() {
        assert_eq!(encode(i64::MAX), -2);
        assert_eq!(encode(i64::MIN), -1);
        for v in [i64::MIN, i64::MIN + 1, -7, 0, 7, i64::MAX - 1, i64::MAX] {
            assert_eq!(decode(encode(v)), v);
        }
    }
}
