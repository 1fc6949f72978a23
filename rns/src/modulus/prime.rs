use crate::modulus::barrett::BarrettPrecomp;
use crate::modulus::montgomery::{Montgomery, MontgomeryPrecomp};
use crate::modulus::{ReduceOnce, ONCE};

use primality_test::is_prime;
use prime_factorization::Factorization;

/// A prime modulus q with its arithmetic precomputations and the
/// distinct prime factors of q-1 (used to find primitive roots).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prime<O> {
    pub q: O,
    pub two_q: O,
    pub four_q: O,
    /// distinct prime factors of q-1
    pub factors: Vec<O>,
    pub montgomery: MontgomeryPrecomp<O>,
    pub barrett: BarrettPrecomp<O>,
    pub phi: O,
}

impl Prime<u64> {
    /// Panics if q is not an odd prime or exceeds 61 bits.
    pub fn new(q: u64) -> Self {
        assert!(is_prime(q) && q > 2, "invalid q: {} is not an odd prime", q);
        Self::new_unchecked(q)
    }

    /// Does not check primality of q.
    pub fn new_unchecked(q: u64) -> Self {
        assert!(
            q.next_power_of_two().ilog2() <= 61,
            "invalid q: {} exceeds 61 bits",
            q
        );

        let factors_repr: Vec<(u64, u32)> = Factorization::run(q - 1).prime_factor_repr();
        let factors: Vec<u64> = factors_repr.iter().map(|f| f.0).collect();

        Self {
            q,
            two_q: q << 1,
            four_q: q << 2,
            factors,
            montgomery: MontgomeryPrecomp::new(q),
            barrett: BarrettPrecomp::new(q),
            phi: q - 1,
        }
    }

    #[inline(always)]
    pub fn q(&self) -> u64 {
        self.q
    }

    /// Returns x^exponent mod q.
    #[inline(always)]
    pub fn pow(&self, x: u64, exponent: u64) -> u64 {
        let x_mont: Montgomery<u64> = self.montgomery.prepare::<ONCE>(x);
        self.montgomery.unprepare(self.montgomery.pow(x_mont, exponent))
    }

    /// Returns x^-1 mod q. User must ensure x != 0 mod q.
    #[inline(always)]
    pub fn inv(&self, x: u64) -> u64 {
        self.pow(x, self.phi - 1)
    }

    #[inline(always)]
    pub fn add_mod(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.q && b < self.q);
        (a + b).reduce_once(self.q)
    }

    #[inline(always)]
    pub fn sub_mod(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.q && b < self.q);
        (a + self.q - b).reduce_once(self.q)
    }

    #[inline(always)]
    pub fn neg_mod(&self, a: u64) -> u64 {
        debug_assert!(a < self.q);
        if a == 0 {
            0
        } else {
            self.q - a
        }
    }

    #[inline(always)]
    pub fn mul_mod(&self, a: u64, b: u64) -> u64 {
        self.barrett.mul_mod(a, b)
    }

    /// Returns the smallest generator of the multiplicative group mod q.
    pub fn primitive_root(&self) -> u64 {
        let mut candidate: u64 = 1u64;
        'candidates: loop {
            candidate += 1;
            assert!(candidate < self.q, "no primitive root found for q={}", self.q);
            for &factor in &self.factors {
                if self.pow(candidate, self.phi / factor) == 1 {
                    continue 'candidates;
                }
            }
            return candidate;
        }
    }

    /// Returns a primitive nth root of unity mod q.
    /// Panics if nth_root does not divide q-1.
    pub fn primitive_nth_root(&self, nth_root: u64) -> u64 {
        assert!(
            nth_root & (nth_root - 1) == 0,
            "invalid nth_root: {} is not a power of two",
            nth_root
        );
        assert!(
            self.phi % nth_root == 0,
            "invalid prime: q-1 = {} not divisible by nth_root = {}",
            self.phi,
            nth_root
        );

        let psi: u64 = self.pow(self.primitive_root(), self.phi / nth_root);

        debug_assert!(self.pow(psi, nth_root) == 1);
        debug_assert!(self.pow(psi, nth_root >> 1) == self.q - 1);

        psi
    }
}

/// Streams primes of a fixed bit size congruent to 1 mod nth_root,
/// scanning away from 2^bit_size in both directions.
pub struct NTTFriendlyPrimesGenerator {
    size: f64,
    nth_root: u64,
    next_prime: u64,
    prev_prime: u64,
    check_next_prime: bool,
    check_prev_prime: bool,
}

impl NTTFriendlyPrimesGenerator {
    pub fn new(bit_size: u64, nth_root: u64) -> Self {
        assert!(
            nth_root & (nth_root - 1) == 0,
            "invalid nth_root: {} is not a power of two",
            nth_root
        );
        assert!(bit_size >= nth_root.ilog2() as u64 + 2 && bit_size <= 61);

        let next_prime: u64 = (1u64 << bit_size) + 1;
        let prev_prime: u64 = next_prime - nth_root;

        Self {
            size: bit_size as f64,
            nth_root,
            next_prime,
            prev_prime,
            check_next_prime: true,
            check_prev_prime: true,
        }
    }

    /// Returns the next prime above 2^bit_size, or None once the scan
    /// would leave the requested bit size.
    pub fn next_upstream_prime(&mut self) -> Option<u64> {
        while self.check_next_prime {
            if (self.next_prime as f64).log2() - self.size >= 0.5
                || self.next_prime > u64::MAX - self.nth_root
            {
                self.check_next_prime = false;
                break;
            }
            let candidate: u64 = self.next_prime;
            self.next_prime += self.nth_root;
            if is_prime(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Returns the next prime below 2^bit_size, or None once the scan
    /// would leave the requested bit size.
    pub fn next_downstream_prime(&mut self) -> Option<u64> {
        while self.check_prev_prime {
            if self.size - (self.prev_prime as f64).log2() >= 0.5 || self.prev_prime < self.nth_root
            {
                self.check_prev_prime = false;
                break;
            }
            let candidate: u64 = self.prev_prime;
            self.prev_prime -= self.nth_root;
            if is_prime(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    pub fn next_downstream_primes(&mut self, k: usize) -> Option<Vec<u64>> {
        (0..k).map(|_| self.next_downstream_prime()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::montgomery::Pow;

    #[test]
    fn primitive_nth_root_has_exact_order() {
        let prime: Prime<u64> = Prime::new(0x1fffffffffe00001);
        let nth_root: u64 = 1 << 17;
        let psi: u64 = prime.primitive_nth_root(nth_root);
        assert_eq!(prime.pow(psi, nth_root), 1);
        assert_eq!(prime.pow(psi, nth_root >> 1), prime.q - 1);
    }

    #[test]
    fn generator_yields_ntt_friendly_primes() {
        let nth_root: u64 = 1 << 14;
        let mut generator: NTTFriendlyPrimesGenerator =
            NTTFriendlyPrimesGenerator::new(40, nth_root);
        let primes: Vec<u64> = generator.next_downstream_primes(4).unwrap();
        assert_eq!(primes.len(), 4);
        for &q in primes.iter() {
            assert!(is_prime(q));
            assert_eq!(q % nth_root, 1);
            assert_eq!(q.next_power_of_two().ilog2(), 40);
        }
        let mut sorted: Vec<u64> = primes.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), primes.len());
    }

    #[test]
    fn pow_and_inv_are_consistent() {
        let prime: Prime<u64> = Prime::new(1032193);
        for &x in [2u64, 3, 65537, 1032192].iter() {
            let x_inv: u64 = prime.inv(x);
            assert_eq!(prime.mul_mod(x, x_inv), 1);
        }
        let _ = Pow(3, 17, 1032193);
    }
}
