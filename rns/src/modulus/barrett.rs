use crate::modulus::ReduceOnce;
use crate::modulus::{BARRETT, BARRETTLAZY, FOURTIMES, NONE, ONCE, REDUCEMOD, TWICE};

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// A scalar prepared for Shoup multiplication:
/// (value, floor(value * 2^64 / q)).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrett<O>(pub O, pub O);

impl<O> Barrett<O> {
    #[inline(always)]
    pub fn value(&self) -> &O {
        &self.0
    }

    #[inline(always)]
    pub fn quotient(&self) -> &O {
        &self.1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrettPrecomp<O> {
    pub q: O,
    pub two_q: O,
    pub four_q: O,
    /// low word of floor(2^128 / q)
    pub lo: O,
    /// high word of floor(2^128 / q)
    pub hi: O,
    pub one: Barrett<O>,
}

impl BarrettPrecomp<u64> {
    pub fn new(q: u64) -> BarrettPrecomp<u64> {
        let big_r: BigUint = (BigUint::from(1u64) << (u64::BITS << 1)) / BigUint::from(q);
        let lo: u64 = (&big_r & BigUint::from(u64::MAX)).to_u64().unwrap();
        let hi: u64 = (big_r >> u64::BITS).to_u64().unwrap();
        let mut precomp: BarrettPrecomp<u64> = Self {
            q,
            two_q: q << 1,
            four_q: q << 2,
            lo,
            hi,
            one: Barrett(0, 0),
        };
        precomp.one = precomp.prepare(1);
        precomp
    }

    #[inline(always)]
    pub fn one(&self) -> Barrett<u64> {
        self.one
    }

    #[inline(always)]
    pub fn reduce_assign<const REDUCE: REDUCEMOD>(&self, x: &mut u64) {
        match REDUCE {
            NONE => {}
            ONCE => x.reduce_once_assign(self.q),
            TWICE => x.reduce_once_assign(self.two_q),
            FOURTIMES => x.reduce_once_assign(self.four_q),
            BARRETT => {
                let mhi: u64 = ((*x as u128 * self.hi as u128) >> 64) as u64;
                *x = x.wrapping_sub(mhi.wrapping_mul(self.q));
                x.reduce_once_assign(self.q);
                x.reduce_once_assign(self.q);
            }
            BARRETTLAZY => {
                let mhi: u64 = ((*x as u128 * self.hi as u128) >> 64) as u64;
                *x = x.wrapping_sub(mhi.wrapping_mul(self.q));
            }
            _ => unreachable!("invalid REDUCE argument"),
        }
    }

    #[inline(always)]
    pub fn reduce<const REDUCE: REDUCEMOD>(&self, x: &u64) -> u64 {
        let mut r = *x;
        self.reduce_assign::<REDUCE>(&mut r);
        r
    }

    #[inline(always)]
    pub fn prepare(&self, v: u64) -> Barrett<u64> {
        debug_assert!(v < self.q, "invalid v: v={} >= q={}", v, self.q);
        let quotient: u64 = (((v as u128) << 64) / self.q as u128) as _;
        Barrett(v, quotient)
    }

    #[inline(always)]
    pub fn mul_external<const REDUCE: REDUCEMOD>(&self, lhs: &Barrett<u64>, rhs: &u64) -> u64 {
        let mut r: u64 = *rhs;
        self.mul_external_assign::<REDUCE>(lhs, &mut r);
        r
    }

    /// rhs <- lhs * rhs mod q, with rhs in [0, 2q) before the optional
    /// final reduction.
    #[inline(always)]
    pub fn mul_external_assign<const REDUCE: REDUCEMOD>(&self, lhs: &Barrett<u64>, rhs: &mut u64) {
        let t: u64 = ((*lhs.quotient() as u128 * *rhs as u128) >> 64) as _;
        *rhs = (rhs.wrapping_mul(*lhs.value())).wrapping_sub(self.q.wrapping_mul(t));
        self.reduce_assign::<REDUCE>(rhs);
    }

    /// Reduces a full 128-bit product to [0, q).
    #[inline(always)]
    pub fn reduce_u128(&self, x: u128) -> u64 {
        let x0: u128 = x & (u64::MAX as u128);
        let x1: u128 = x >> 64;
        let carry: u128 = ((x0 * self.lo as u128) >> 64) + ((x0 * self.hi as u128) & u64::MAX as u128) + ((x1 * self.lo as u128) & u64::MAX as u128);
        let t: u128 = x1 * self.hi as u128 + ((x0 * self.hi as u128) >> 64) + ((x1 * self.lo as u128) >> 64) + (carry >> 64);
        let mut r: u64 = (x.wrapping_sub(t.wrapping_mul(self.q as u128))) as u64;
        r.reduce_once_assign(self.q);
        r.reduce_once_assign(self.q);
        r
    }

    /// Returns a * b mod q for unprepared operands in [0, 2^64).
    #[inline(always)]
    pub fn mul_mod(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128(a as u128 * b as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 0x1fffffffffe00001;

    #[test]
    fn reduce_u128_matches_naive() {
        let precomp: BarrettPrecomp<u64> = BarrettPrecomp::new(Q);
        let samples: [u64; 6] = [0, 1, Q - 1, Q + 1, u64::MAX, 0xdeadbeefcafebabe];
        for &a in samples.iter() {
            for &b in samples.iter() {
                let x: u128 = a as u128 * b as u128;
                assert_eq!(precomp.reduce_u128(x), (x % Q as u128) as u64);
            }
        }
    }

    #[test]
    fn mul_external_is_shoup_mul() {
        let precomp: BarrettPrecomp<u64> = BarrettPrecomp::new(Q);
        let v: u64 = 0x123456789abcdef % Q;
        let prepared: Barrett<u64> = precomp.prepare(v);
        for &b in [1u64, 2, Q - 1, 0xffffffff].iter() {
            let got: u64 = precomp.mul_external::<ONCE>(&prepared, &b);
            assert_eq!(got, (v as u128 * b as u128 % Q as u128) as u64);
        }
    }

    #[test]
    fn barrett_reduce_full_range() {
        let precomp: BarrettPrecomp<u64> = BarrettPrecomp::new(Q);
        for &x in [0u64, Q, 2 * Q, 4 * Q - 1, u64::MAX].iter() {
            assert_eq!(precomp.reduce::<BARRETT>(&x), x % Q);
        }
    }
}
