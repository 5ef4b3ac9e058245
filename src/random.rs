//! Randomized batch parameters: amounts, precisions, delays and picks.
//! Every wallet should look hand-operated rather than mechanically
//! generated, so amounts are rounded to a randomly chosen precision.

use rand::Rng;
use rand::seq::SliceRandom;

/// Uniform integer in the inclusive range, used for delays in seconds.
pub fn rand_int(min: u64, max: u64) -> u64 {
    rand::thread_rng().gen_range(min..=max)
}

/// Uniform float in the inclusive range.
pub fn rand_float(min: f64, max: f64) -> f64 {
    rand::thread_rng().gen_range(min..=max)
}

/// Uniform float rounded to a decimal count itself drawn uniformly from
/// the inclusive precision bounds.
pub fn rand_float_with_dec(min: f64, max: f64, min_dec: u32, max_dec: u32) -> f64 {
    let base = rand_float(min, max);
    let decimals = rand_int(u64::from(min_dec), u64::from(max_dec)) as u32;
    round_to(base, decimals)
}

/// Rounds to a precision proportional to the magnitude of `value`: the
/// decimal count is the number of leading zeros after the point plus a
/// random offset from the inclusive bounds.
pub fn round_to_appropriate_decimals(value: f64, min_dec: u32, max_dec: u32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let offset = rand_int(u64::from(min_dec), u64::from(max_dec)) as i32;
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (-magnitude + offset).max(0) as u32;
    round_to(value, decimals)
}

pub fn random_choice<T: Copy>(items: &[T]) -> T {
    *items
        .choose(&mut rand::thread_rng())
        .expect("choice set must not be empty")
}

pub fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut rand::thread_rng());
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal_digits_at_most(value: f64, decimals: u32) -> bool {
        let scaled = value * 10f64.powi(decimals as i32);
        (scaled.round() - scaled).abs() < 1e-6
    }

    #[test]
    fn amounts_stay_in_range_with_bounded_precision() {
        for _ in 0..10_000 {
            let v = rand_float_with_dec(0.005, 0.01, 4, 7);
            assert!((0.005..=0.01).contains(&v), "out of range: {v}");
            assert!(decimal_digits_at_most(v, 7), "too many decimals: {v}");
        }
    }

    #[test]
    fn rand_int_covers_both_bounds() {
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..1_000 {
            match rand_int(1, 3) {
                1 => seen_min = true,
                3 => seen_max = true,
                2 => {}
                other => panic!("out of range: {other}"),
            }
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn proportional_rounding_tracks_magnitude() {
        // 0.00465...: magnitude 1e-3, so with offset bounds [2, 5] the
        // result keeps between 5 and 8 decimals.
        for _ in 0..1_000 {
            let v = round_to_appropriate_decimals(0.004_653_219_9, 2, 5);
            assert!(v > 0.004 && v < 0.005, "rounded away from value: {v}");
            assert!(decimal_digits_at_most(v, 8));
            assert!(!decimal_digits_at_most(v, 2), "over-truncated: {v}");
        }
    }

    #[test]
    fn proportional_rounding_handles_zero() {
        assert_eq!(round_to_appropriate_decimals(0.0, 2, 5), 0.0);
    }

    #[test]
    fn single_item_choice_is_identity() {
        assert_eq!(random_choice(&[42]), 42);
    }

    #[test]
    fn shuffle_keeps_the_same_items() {
        let mut items = vec![1, 2, 3, 4, 5];
        shuffle(&mut items);
        items.sort_unstable();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }
}
