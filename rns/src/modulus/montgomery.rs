use crate::modulus::barrett::BarrettPrecomp;
use crate::modulus::ReduceOnce;
use crate::modulus::{BARRETT, FOURTIMES, NONE, ONCE, REDUCEMOD, TWICE};

/// An element in the Montgomery domain (x * 2^64 mod q).
pub type Montgomery<O> = O;

/// Precomputations for Montgomery arithmetic modulo an odd q < 2^62.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MontgomeryPrecomp<O> {
    pub q: O,
    pub two_q: O,
    pub four_q: O,
    pub barrett: BarrettPrecomp<O>,
    /// -q^-1 mod 2^64
    pub q_inv_neg: O,
    pub one: Montgomery<O>,
}

impl MontgomeryPrecomp<u64> {
    pub fn new(q: u64) -> MontgomeryPrecomp<u64> {
        assert!(q & 1 == 1, "invalid q: q={} is even", q);
        // Newton iteration doubles the number of valid low bits each round.
        let mut q_inv: u64 = q;
        for _ in 0..5 {
            q_inv = q_inv.wrapping_mul(2u64.wrapping_sub(q.wrapping_mul(q_inv)));
        }
        debug_assert!(q.wrapping_mul(q_inv) == 1);
        let mut precomp: MontgomeryPrecomp<u64> = Self {
            q,
            two_q: q << 1,
            four_q: q << 2,
            barrett: BarrettPrecomp::new(q),
            q_inv_neg: q_inv.wrapping_neg(),
            one: 0,
        };
        precomp.one = precomp.prepare::<ONCE>(1);
        precomp
    }

    #[inline(always)]
    pub fn one(&self) -> Montgomery<u64> {
        self.one
    }

    #[inline(always)]
    pub fn reduce_assign<const REDUCE: REDUCEMOD>(&self, x: &mut u64) {
        match REDUCE {
            NONE => {}
            ONCE => x.reduce_once_assign(self.q),
            TWICE => x.reduce_once_assign(self.two_q),
            FOURTIMES => x.reduce_once_assign(self.four_q),
            BARRETT => *x = self.barrett.reduce::<BARRETT>(x),
            _ => unreachable!("invalid REDUCE argument"),
        }
    }

    /// Maps x to the Montgomery domain: x * 2^64 mod q.
    #[inline(always)]
    pub fn prepare<const REDUCE: REDUCEMOD>(&self, x: u64) -> Montgomery<u64> {
        let mut r: u64 = (((x as u128) << 64) % self.q as u128) as u64;
        self.reduce_assign::<REDUCE>(&mut r);
        r
    }

    /// Montgomery reduction: t * 2^-64 mod q, for t < q * 2^64.
    #[inline(always)]
    pub fn redc(&self, t: u128) -> u64 {
        let m: u64 = (t as u64).wrapping_mul(self.q_inv_neg);
        let mut r: u64 = ((t.wrapping_add(m as u128 * self.q as u128)) >> 64) as u64;
        r.reduce_once_assign(self.q);
        r
    }

    /// Maps x out of the Montgomery domain.
    #[inline(always)]
    pub fn unprepare(&self, x: Montgomery<u64>) -> u64 {
        self.redc(x as u128)
    }

    /// Returns a * b * 2^-64 mod q with both operands in the Montgomery
    /// domain; the result stays in the Montgomery domain.
    #[inline(always)]
    pub fn mul_internal(&self, a: Montgomery<u64>, b: Montgomery<u64>) -> Montgomery<u64> {
        self.redc(a as u128 * b as u128)
    }

    /// Returns a * b mod q for a in the Montgomery domain and b a plain
    /// residue; the result is a plain residue.
    #[inline(always)]
    pub fn mul_external(&self, a: Montgomery<u64>, b: u64) -> u64 {
        self.redc(a as u128 * b as u128)
    }

    #[inline(always)]
    pub fn mul_external_assign(&self, a: Montgomery<u64>, b: &mut u64) {
        *b = self.redc(a as u128 * *b as u128);
    }

    /// Returns x^exponent in the Montgomery domain.
    pub fn pow(&self, x: Montgomery<u64>, exponent: u64) -> Montgomery<u64> {
        let mut y: Montgomery<u64> = self.one;
        let mut x_pow: Montgomery<u64> = x;
        let mut i: u64 = exponent;
        while i > 0 {
            if i & 1 == 1 {
                y = self.mul_internal(x_pow, y);
            }
            x_pow = self.mul_internal(x_pow, x_pow);
            i >>= 1;
        }
        y
    }
}

/// Returns x^exponent mod q. Instantiates a fresh precomputation; to be
/// used when called only a few times without a live [MontgomeryPrecomp].
#[allow(non_snake_case)]
pub fn Pow(x: u64, exponent: u64, q: u64) -> u64 {
    let montgomery: MontgomeryPrecomp<u64> = MontgomeryPrecomp::new(q);
    let x_mont: Montgomery<u64> = montgomery.prepare::<ONCE>(x);
    montgomery.unprepare(montgomery.pow(x_mont, exponent))
}
