use crate::modulus::WordOps;
use crate::poly::{Poly, PolyRNS};
use crate::ring::{Ring, RingRNS};

/// Returns a lookup table for the coefficient-domain automorphism
/// X^i -> X^{i * gal_el mod 2n}. Each entry packs the target index in
/// the low bits and the sign flip in the most significant bit.
/// Panics if n is not a power of two or gal_el is even.
pub fn automorphism_index(n: usize, gal_el: usize) -> Vec<usize> {
    assert!(
        n != 0 && n & (n - 1) == 0,
        "invalid n={}: not a power-of-two",
        n
    );
    assert!(
        gal_el & 1 == 1,
        "invalid gal_el={}: not coprime with 2n",
        gal_el
    );

    let log_n: usize = n.log2();
    let mask: usize = n - 1;
    let mut index: Vec<usize> = Vec::with_capacity(n);
    for i in 0..n {
        let gal_el_i: usize = i * gal_el;
        let sign: usize = (gal_el_i >> log_n) & 1;
        index.push((gal_el_i & mask) | (sign << (usize::BITS - 1)));
    }
    index
}

impl Ring<u64> {
    /// b <- a(X^gal_el), operating on coefficient-domain polynomials.
    pub fn automorphism_from_index(&self, a: &Poly<u64>, idx: &[usize], b: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n() && b.n() == self.n() && idx.len() == self.n());
        let mask: usize = self.n() - 1;
        let q: u64 = self.q();
        a.0.iter().enumerate().for_each(|(i, &ai)| {
            let sign: bool = idx[i] >> (usize::BITS - 1) == 1;
            b.0[idx[i] & mask] = if sign && ai != 0 { q - ai } else { ai };
        });
    }

    pub fn automorphism(&self, a: &Poly<u64>, gal_el: usize, b: &mut Poly<u64>) {
        self.automorphism_from_index(a, &automorphism_index(self.n(), gal_el), b)
    }
}

impl RingRNS<'_, u64> {
    /// b <- a(X^gal_el) limbwise, for coefficient-domain polynomials.
    pub fn automorphism_from_index(&self, a: &PolyRNS<u64>, idx: &[usize], b: &mut PolyRNS<u64>) {
        debug_assert!(a.level() >= self.level() && b.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.automorphism_from_index(a.at(i), idx, b.at_mut(i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automorphism_maps_monomials_with_sign() {
        let ring: Ring<u64> = Ring::new(8, 1073479681);
        let q: u64 = ring.q();
        // a = X, gal_el = 3: X -> X^3.
        let mut a: Poly<u64> = ring.new_poly();
        a.0[1] = 1;
        let mut b: Poly<u64> = ring.new_poly();
        ring.automorphism(&a, 3, &mut b);
        assert_eq!(b.0[3], 1);
        assert_eq!(b.0.iter().sum::<u64>(), 1);

        // a = X^3, gal_el = 3: X^9 = -X mod X^8 + 1.
        a.zero();
        a.0[3] = 1;
        ring.automorphism(&a, 3, &mut b);
        assert_eq!(b.0[1], q - 1);
    }

    #[test]
    fn automorphism_is_inverted_by_inverse_element() {
        let ring: Ring<u64> = Ring::new(16, 1073479681);
        let nth_root: usize = 32;
        let gal_el: usize = 5;
        // 5 * 13 = 65 = 1 mod 32
        let gal_el_inv: usize = 13;
        assert_eq!(gal_el * gal_el_inv % nth_root, 1);

        let mut source = sampling::source::Source::new([4u8; 32]);
        let mut a: Poly<u64> = ring.new_poly();
        ring.fill_uniform(&mut source, &mut a);

        let mut b: Poly<u64> = ring.new_poly();
        let mut c: Poly<u64> = ring.new_poly();
        ring.automorphism(&a, gal_el, &mut b);
        ring.automorphism(&b, gal_el_inv, &mut c);
        assert_eq!(a, c);
    }
}
