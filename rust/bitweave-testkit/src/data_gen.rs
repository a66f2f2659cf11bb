//! Data generation utilities for testing.
//!
//! All generators take an explicit [`fastrand::Rng`] so that failures can be replayed
//! from the seed printed by [`seeded_rng`].

/// Environment variable overriding the seed returned by [`seeded_rng`].
pub const SEED_ENV_VAR: &str = "BITWEAVE_TEST_SEED";

const DEFAULT_SEED: u64 = 0x5EED_B175;

/// Returns a generator seeded from `BITWEAVE_TEST_SEED`, or a fixed seed when the
/// variable is unset or not a number. The seed is printed so that a failing run can
/// be reproduced.
pub fn seeded_rng() -> fastrand::Rng {
    let seed = std::env::var(SEED_ENV_VAR)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SEED);
    eprintln!("{SEED_ENV_VAR}={seed}");
    fastrand::Rng::with_seed(seed)
}

/// Largest unsigned value representable in `bits_per_value` bits, as the bit pattern
/// of an `i64` (so 64 bits yields `-1`).
pub fn max_unsigned(bits_per_value: u32) -> i64 {
    assert!((1..=64).contains(&bits_per_value));
    (u64::MAX >> (64 - bits_per_value)) as i64
}

/// Generates `count` values uniformly distributed over the full range of
/// `bits_per_value` unsigned bits. For 64 bits every `i64` is possible.
pub fn random_values(rng: &mut fastrand::Rng, count: usize, bits_per_value: u32) -> Vec<i64> {
    let max = max_unsigned(bits_per_value) as u64;
    (0..count).map(|_| rng.u64(0..=max) as i64).collect()
}

/// Like [`random_values`], but roughly one value in eight is exactly the maximum so
/// that the top bit of every slot gets exercised.
pub fn random_values_with_extremes(
    rng: &mut fastrand::Rng,
    count: usize,
    bits_per_value: u32,
) -> Vec<i64> {
    let max = max_unsigned(bits_per_value);
    let mut values = random_values(rng, count, bits_per_value);
    for value in values.iter_mut() {
        match rng.u8(0..16) {
            0 | 1 => *value = max,
            2 => *value = 0,
            _ => {}
        }
    }
    values
}

/// Generates a strictly increasing sequence starting at `start` with steps drawn
/// from `1..=max_step`.
pub fn increasing_values(
    rng: &mut fastrand::Rng,
    count: usize,
    start: i64,
    max_step: i64,
) -> Vec<i64> {
    assert!(max_step >= 1);
    let mut current = start;
    (0..count)
        .map(|_| {
            current += rng.i64(1..=max_step);
            current
        })
        .collect()
}

/// Generates a non-decreasing sequence of `count` values in `0..=upper_bound`,
/// with runs of duplicates.
pub fn sorted_values(rng: &mut fastrand::Rng, count: usize, upper_bound: i64) -> Vec<i64> {
    assert!(upper_bound >= 0);
    let mut values: Vec<i64> = (0..count)
        .map(|_| {
            if rng.u8(0..4) == 0 && upper_bound > 0 {
                // Clustered near zero to produce duplicates.
                rng.i64(0..=upper_bound.min(16))
            } else {
                rng.i64(0..=upper_bound)
            }
        })
        .collect();
    values.sort_unstable();
    values
}

/// Values sitting on the boundaries that tend to break bit manipulation code.
pub fn edge_values() -> Vec<i64> {
    let mut values = vec![0, 1, -1, i64::MIN, i64::MAX, i64::MIN + 1, i64::MAX - 1];
    for shift in [7, 8, 15, 16, 31, 32, 47, 48, 63] {
        values.push(1i64 << shift);
        values.push((1i64 << shift).wrapping_sub(1));
        values.push((1i64 << shift).wrapping_neg());
    }
    values
}
