use bitweave_eliasfano::{EliasFanoEncoder, NO_MORE_VALUES};
use bitweave_testkit::data_gen;
use itertools::Itertools;

fn encode(values: &[i64], upper_bound: i64, index_interval: u64) -> EliasFanoEncoder {
    let mut encoder =
        EliasFanoEncoder::new(values.len() as u64, upper_bound, index_interval).unwrap();
    for &v in values {
        encoder.encode_next(v).unwrap();
    }
    encoder
}

fn cases() -> Vec<(Vec<i64>, i64, u64)> {
    let mut rng = data_gen::seeded_rng();
    let mut cases = Vec::new();
    for (count, upper_bound) in [(1, 0), (50, 50), (300, 100_000), (1000, 1 << 40), (2000, 3000)] {
        for interval in [2, 7, 256] {
            let values = data_gen::sorted_values(&mut rng, count, upper_bound);
            cases.push((values, upper_bound, interval));
        }
    }
    cases
}

#[test]
fn test_forward_and_backward_decoding() {
    for (values, upper_bound, interval) in cases() {
        let encoder = encode(&values, upper_bound, interval);
        let mut decoder = encoder.decoder();
        for &v in &values {
            assert_eq!(decoder.next_value(), v);
        }
        assert_eq!(decoder.next_value(), NO_MORE_VALUES);

        decoder.to_after_sequence();
        for &v in values.iter().rev() {
            assert_eq!(decoder.previous_value(), v);
        }
        assert_eq!(decoder.previous_value(), NO_MORE_VALUES);
    }
}

#[test]
fn test_advance_to_value_from_start() {
    let mut rng = fastrand::Rng::with_seed(77);
    for (values, upper_bound, interval) in cases() {
        let encoder = encode(&values, upper_bound, interval);
        for _ in 0..100 {
            let target = rng.i64(0..=upper_bound + 1);
            let mut decoder = encoder.decoder();
            let found = decoder.advance_to_value(target);
            match values.iter().position(|&v| v >= target) {
                Some(i) => {
                    assert_eq!(found, values[i], "target {target} interval {interval}");
                    assert_eq!(decoder.current_index().unwrap(), i as u64);
                }
                None => assert_eq!(found, NO_MORE_VALUES),
            }
        }
    }
}

#[test]
fn test_successive_advances() {
    let mut rng = fastrand::Rng::with_seed(78);
    for (values, upper_bound, interval) in cases() {
        let encoder = encode(&values, upper_bound, interval);
        let mut decoder = encoder.decoder();
        let mut targets: Vec<i64> = (0..40).map(|_| rng.i64(0..=upper_bound)).collect();
        targets.sort_unstable();
        let mut position: i64 = -1;
        for target in targets {
            let expected = values
                .iter()
                .enumerate()
                .skip((position + 1) as usize)
                .find(|&(_, &v)| v >= target);
            let found = decoder.advance_to_value(target);
            match expected {
                Some((i, &v)) => {
                    assert_eq!(found, v);
                    position = i as i64;
                }
                None => {
                    assert_eq!(found, NO_MORE_VALUES);
                    break;
                }
            }
        }
    }
}

#[test]
fn test_back_to_value_from_end() {
    let mut rng = fastrand::Rng::with_seed(79);
    for (values, upper_bound, interval) in cases() {
        let encoder = encode(&values, upper_bound, interval);
        for _ in 0..100 {
            let target = rng.i64(0..=upper_bound);
            let mut decoder = encoder.decoder();
            decoder.to_after_sequence();
            let found = decoder.back_to_value(target);
            match values.iter().rposition(|&v| v <= target) {
                Some(i) => {
                    assert_eq!(found, values[i], "target {target}");
                    assert_eq!(decoder.current_index().unwrap(), i as u64);
                }
                None => assert_eq!(found, NO_MORE_VALUES),
            }
        }
    }
}

#[test]
fn test_advance_to_index() {
    let mut rng = fastrand::Rng::with_seed(80);
    for (values, upper_bound, interval) in cases() {
        let encoder = encode(&values, upper_bound, interval);
        let mut decoder = encoder.decoder();
        let indexes = (0..values.len() as u64)
            .filter(|_| rng.u8(0..5) == 0)
            .collect_vec();
        for &index in &indexes {
            assert!(decoder.advance_to_index(index));
            assert_eq!(decoder.current_value().unwrap(), values[index as usize]);
        }
        assert!(!decoder.advance_to_index(values.len() as u64));
    }
}

#[test]
fn test_duplicates_straddling_index_entries() {
    let mut values = vec![0i64; 10];
    values.extend(vec![64; 200]);
    values.extend(vec![4096; 5]);
    let encoder = encode(&values, 4096, 2);
    let mut decoder = encoder.decoder();
    assert_eq!(decoder.advance_to_value(1), 64);
    assert_eq!(decoder.current_index().unwrap(), 10);
    assert_eq!(decoder.advance_to_value(65), 4096);
    assert_eq!(decoder.current_index().unwrap(), 210);

    decoder.to_after_sequence();
    assert_eq!(decoder.back_to_value(4095), 64);
    assert_eq!(decoder.current_index().unwrap(), 209);
}

#[test]
fn test_restored_encoder_decodes_identically() {
    for (values, upper_bound, interval) in cases() {
        let encoder = encode(&values, upper_bound, interval);
        let restored = EliasFanoEncoder::restore(
            values.len() as u64,
            upper_bound,
            interval,
            encoder.upper_bits().to_vec(),
            encoder.lower_bits().to_vec(),
            encoder.index_bits().to_vec(),
        )
        .unwrap();
        assert_eq!(restored, encoder);
        let mut decoder = restored.decoder();
        assert!(values.iter().all(|&v| decoder.next_value() == v));
    }
}
