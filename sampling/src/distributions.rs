use rand_core::RngCore;
use rand_distr::{Distribution, Normal};

use crate::source::Source;

/// Standard deviation of the error distribution.
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Fills a with ternary values in {-1, 0, 1}, where each coefficient is
/// non-zero with probability 1-prob and signs are balanced.
pub fn fill_ternary_prob(a: &mut [i64], prob: f64, source: &mut Source) {
    a.iter_mut().for_each(|x| {
        let u: f64 = source.next_f64(0.0, 1.0);
        if u < prob {
            *x = 0;
        } else if u < prob + (1.0 - prob) * 0.5 {
            *x = 1;
        } else {
            *x = -1;
        }
    });
}

/// Fills a with a ternary vector of exactly hw non-zero coefficients
/// with balanced signs, at uniform positions.
pub fn fill_ternary_hw(a: &mut [i64], hw: usize, source: &mut Source) {
    assert!(
        hw <= a.len(),
        "invalid hw: hw={} > a.len()={}",
        hw,
        a.len()
    );
    a.fill(0);
    let n: u64 = a.len() as u64;
    let mask: u64 = n.next_power_of_two() - 1;
    let mut placed: usize = 0;
    while placed < hw {
        let i: usize = source.next_u64n(n, mask) as usize;
        if a[i] == 0 {
            a[i] = if source.next_u64() & 1 == 1 { 1 } else { -1 };
            placed += 1;
        }
    }
}

/// Fills a with rounded samples from a centered normal of standard
/// deviation sigma, rejecting samples beyond the given bound.
pub fn fill_normal(a: &mut [i64], sigma: f64, bound: f64, source: &mut Source) {
    assert!(sigma > 0.0, "invalid sigma: {}", sigma);
    assert!(bound > 0.0, "invalid bound: {}", bound);
    let normal: Normal<f64> = Normal::new(0.0, sigma).unwrap();
    a.iter_mut().for_each(|x| {
        let mut v: f64 = normal.sample(&mut *source);
        while v.abs() > bound {
            v = normal.sample(&mut *source);
        }
        *x = v.round() as i64;
    });
}
