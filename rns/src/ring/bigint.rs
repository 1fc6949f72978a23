use crate::poly::{Poly, PolyRNS};
use crate::ring::{Ring, RingRNS};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive};

impl Ring<u64> {
    /// a <- coeffs mod q, accepting negative representatives.
    pub fn from_bigint(&self, coeffs: &[BigInt], a: &mut Poly<u64>) {
        assert!(
            coeffs.len() == a.n(),
            "invalid coeffs: coeffs.len()={} != a.n()={}",
            coeffs.len(),
            a.n()
        );
        let q_big: BigInt = BigInt::from(self.modulus.q);
        a.0.iter_mut()
            .zip(coeffs.iter())
            .for_each(|(v, c)| *v = c.mod_floor(&q_big).to_u64().unwrap());
    }
}

impl RingRNS<'_, u64> {
    /// The product of the chain's primes.
    pub fn modulus(&self) -> BigInt {
        let mut modulus: BigInt = BigInt::from(1);
        self.0.iter().for_each(|r| modulus *= BigInt::from(r.modulus.q));
        modulus
    }

    /// coeffs <- the centered representatives of a mod the full chain
    /// product, reconstructed by CRT.
    pub fn to_bigint_inplace(&self, a: &PolyRNS<u64>, coeffs: &mut [BigInt]) {
        assert!(
            coeffs.len() == a.n(),
            "invalid coeffs: coeffs.len()={} != a.n()={}",
            coeffs.len(),
            a.n()
        );
        debug_assert!(a.level() >= self.level());

        let level: usize = self.level();
        let q_big: BigInt = self.modulus();
        let q_big_half: BigInt = &q_big >> 1;

        // inv_crt[i] = (Q/q_i) * ((Q/q_i)^-1 mod q_i)
        let mut inv_crt: Vec<BigInt> = vec![BigInt::default(); level + 1];
        inv_crt.iter_mut().enumerate().for_each(|(i, v)| {
            let qi_big: BigInt = BigInt::from(self.0[i].modulus.q);
            *v = &q_big / &qi_big;
            let inv: BigInt = v.modinv(&qi_big).unwrap();
            *v *= inv;
        });

        coeffs.iter_mut().enumerate().for_each(|(j, c)| {
            *c = BigInt::from(a.at(0).0[j]) * &inv_crt[0];
            (1..level + 1).for_each(|k| {
                *c += BigInt::from(a.at(k).0[j]) * &inv_crt[k];
            });
            *c = c.mod_floor(&q_big);
            if c.abs() > q_big_half {
                *c -= &q_big;
            }
        });
    }

    /// a <- coeffs mod q_i for every limb, accepting negative values.
    pub fn from_bigint_inplace(&self, coeffs: &[BigInt], a: &mut PolyRNS<u64>) {
        debug_assert!(a.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.from_bigint(coeffs, a.at_mut(i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sampling::source::Source;

    #[test]
    fn bigint_roundtrip_is_exact() {
        let rings: Vec<Ring<u64>> = vec![
            Ring::new(32, 0x1fffffffffe00001),
            Ring::new(32, 0x1fffffffffc80001),
            Ring::new(32, 0x1fffffffffb40001),
        ];
        let ring_rns: RingRNS<u64> = RingRNS::new(&rings);
        let mut source: Source = Source::new([11u8; 32]);

        let mut a: PolyRNS<u64> = ring_rns.new_polyrns();
        ring_rns.fill_uniform(&mut source, &mut a);

        let mut coeffs: Vec<BigInt> = vec![BigInt::default(); a.n()];
        ring_rns.to_bigint_inplace(&a, &mut coeffs);

        let q_half: BigInt = ring_rns.modulus() >> 1;
        assert!(coeffs.iter().all(|c| c.abs() <= q_half));

        let mut b: PolyRNS<u64> = ring_rns.new_polyrns();
        ring_rns.from_bigint_inplace(&coeffs, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn from_bigint_accepts_negatives() {
        let rings: Vec<Ring<u64>> = vec![Ring::new(4, 1073479681)];
        let ring = &rings[0];
        let coeffs: Vec<BigInt> = vec![
            BigInt::from(-1),
            BigInt::from(5),
            BigInt::from(-1073479681i64 - 3),
            BigInt::from(0),
        ];
        let mut a: Poly<u64> = ring.new_poly();
        ring.from_bigint(&coeffs, &mut a);
        assert_eq!(a.0, vec![1073479680, 5, 1073479678, 0]);
    }
}
