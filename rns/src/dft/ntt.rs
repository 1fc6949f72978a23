use crate::dft::DFT;
use crate::modulus::barrett::Barrett;
use crate::modulus::montgomery::Montgomery;
use crate::modulus::prime::Prime;
use crate::modulus::ReduceOnce;
use crate::modulus::WordOps;
use crate::modulus::{BARRETT, NONE, ONCE};
use itertools::izip;

/// Negacyclic NTT tables for a single prime. Roots are stored in
/// bit-reversed order, Shoup-prepared.
pub struct Table<O> {
    prime: Prime<O>,
    psi: O,
    psi_forward_rev: Vec<Barrett<u64>>,
    psi_backward_rev: Vec<Barrett<u64>>,
    q: O,
    two_q: O,
    four_q: O,
}

impl Table<u64> {
    pub fn new(prime: Prime<u64>, nth_root: u64) -> Table<u64> {
        assert!(
            nth_root & (nth_root - 1) == 0,
            "invalid argument: nth_root = {} is not a power of two",
            nth_root
        );

        let psi: u64 = prime.primitive_nth_root(nth_root);

        let psi_mont: Montgomery<u64> = prime.montgomery.prepare::<ONCE>(psi);
        let psi_inv_mont: Montgomery<u64> = prime.montgomery.pow(psi_mont, prime.phi - 1);

        let mut psi_forward_rev: Vec<Barrett<u64>> = vec![Barrett(0, 0); (nth_root >> 1) as usize];
        let mut psi_backward_rev: Vec<Barrett<u64>> = vec![Barrett(0, 0); (nth_root >> 1) as usize];

        psi_forward_rev[0] = prime.barrett.prepare(1);
        psi_backward_rev[0] = prime.barrett.prepare(1);

        let log_nth_root_half: u32 = (nth_root >> 1).log2() as _;

        let mut powers_forward: u64 = 1u64;
        let mut powers_backward: u64 = 1u64;

        for i in 1..(nth_root >> 1) as usize {
            let i_rev: usize = i.reverse_bits_msb(log_nth_root_half);

            prime
                .montgomery
                .mul_external_assign(psi_mont, &mut powers_forward);
            prime
                .montgomery
                .mul_external_assign(psi_inv_mont, &mut powers_backward);

            psi_forward_rev[i_rev] = prime.barrett.prepare(powers_forward);
            psi_backward_rev[i_rev] = prime.barrett.prepare(powers_backward);
        }

        let q: u64 = prime.q();

        Self {
            prime,
            psi,
            psi_forward_rev,
            psi_backward_rev,
            q,
            two_q: q << 1,
            four_q: q << 2,
        }
    }

    pub fn psi(&self) -> u64 {
        self.psi
    }
}

impl DFT<u64> for Table<u64> {
    fn forward_inplace(&self, a: &mut [u64]) {
        self.forward_inplace::<false>(a)
    }

    fn forward_inplace_lazy(&self, a: &mut [u64]) {
        self.forward_inplace::<true>(a)
    }

    fn backward_inplace(&self, a: &mut [u64]) {
        self.backward_inplace::<false>(a)
    }

    fn backward_inplace_lazy(&self, a: &mut [u64]) {
        self.backward_inplace::<true>(a)
    }
}

impl Table<u64> {
    /// In-place forward negacyclic NTT. Output is in [0, q) when
    /// LAZY=false and [0, 2q) when LAZY=true.
    pub fn forward_inplace<const LAZY: bool>(&self, a: &mut [u64]) {
        let n: usize = a.len();
        assert!(
            n & (n - 1) == 0,
            "invalid a.len() = {}: must be a power of two",
            n
        );
        let log_n: u32 = usize::BITS - (n - 1).leading_zeros();

        for layer in 0..log_n {
            let (m, size) = (1 << layer, 1 << (log_n - layer - 1));
            let t: usize = 2 * size;
            if layer == log_n - 1 {
                if LAZY {
                    izip!(a.chunks_exact_mut(t), &self.psi_forward_rev[m..]).for_each(
                        |(a, psi)| {
                            let (a, b) = a.split_at_mut(size);
                            self.dit_inplace::<false>(&mut a[0], &mut b[0], *psi);
                            debug_assert!(a[0] < self.two_q);
                            debug_assert!(b[0] < self.two_q);
                        },
                    );
                } else {
                    izip!(a.chunks_exact_mut(t), &self.psi_forward_rev[m..]).for_each(
                        |(a, psi)| {
                            let (a, b) = a.split_at_mut(size);
                            self.dit_inplace::<true>(&mut a[0], &mut b[0], *psi);
                            self.prime.barrett.reduce_assign::<BARRETT>(&mut a[0]);
                            self.prime.barrett.reduce_assign::<BARRETT>(&mut b[0]);
                            debug_assert!(a[0] < self.q);
                            debug_assert!(b[0] < self.q);
                        },
                    );
                }
            } else {
                izip!(a.chunks_exact_mut(t), &self.psi_forward_rev[m..]).for_each(|(a, psi)| {
                    let (a, b) = a.split_at_mut(size);
                    izip!(a, b).for_each(|(a, b)| self.dit_inplace::<true>(a, b, *psi));
                });
            }
        }
    }

    #[inline(always)]
    fn dit_inplace<const LAZY: bool>(&self, a: &mut u64, b: &mut u64, t: Barrett<u64>) {
        debug_assert!(*a < self.four_q, "a:{} 4q:{}", a, self.four_q);
        debug_assert!(*b < self.four_q, "b:{} 4q:{}", b, self.four_q);
        a.reduce_once_assign(self.two_q);
        let bt: u64 = self.prime.barrett.mul_external::<NONE>(&t, b);
        *b = *a + self.two_q - bt;
        *a += bt;
        if !LAZY {
            a.reduce_once_assign(self.two_q);
            b.reduce_once_assign(self.two_q);
        }
    }

    /// In-place backward negacyclic NTT, including the n^-1 scaling.
    /// Input must be in [0, q); output is in [0, q) when LAZY=false.
    pub fn backward_inplace<const LAZY: bool>(&self, a: &mut [u64]) {
        let n: usize = a.len();
        assert!(
            n & (n - 1) == 0,
            "invalid a.len() = {}: must be a power of two",
            n
        );
        let log_n: u32 = usize::BITS - (n - 1).leading_zeros();

        for layer in (0..log_n).rev() {
            let (m, size) = (1 << layer, 1 << (log_n - layer - 1));
            let t: usize = 2 * size;
            if layer == 0 {
                let n_inv: Barrett<u64> = self.prime.barrett.prepare(self.prime.inv(n as u64));
                let psi: Barrett<u64> = self.prime.barrett.prepare(
                    self.prime
                        .barrett
                        .mul_external::<ONCE>(&n_inv, &self.psi_backward_rev[1].0),
                );

                let (a, b) = a.split_at_mut(size);
                izip!(a, b).for_each(|(a, b)| self.dif_last_inplace::<LAZY>(a, b, psi, n_inv));
            } else {
                izip!(a.chunks_exact_mut(t), &self.psi_backward_rev[m..]).for_each(|(a, psi)| {
                    let (a, b) = a.split_at_mut(size);
                    izip!(a, b).for_each(|(a, b)| self.dif_inplace::<true>(a, b, *psi));
                });
            }
        }
    }

    #[inline(always)]
    fn dif_inplace<const LAZY: bool>(&self, a: &mut u64, b: &mut u64, t: Barrett<u64>) {
        debug_assert!(*a < self.two_q, "a:{} 2q:{}", a, self.two_q);
        debug_assert!(*b < self.two_q, "b:{} 2q:{}", b, self.two_q);
        let d: u64 = self
            .prime
            .barrett
            .mul_external::<NONE>(&t, &(*a + self.two_q - *b));
        *a += *b;
        a.reduce_once_assign(self.two_q);
        *b = d;
        if !LAZY {
            a.reduce_once_assign(self.q);
            b.reduce_once_assign(self.q);
        }
    }

    #[inline(always)]
    fn dif_last_inplace<const LAZY: bool>(
        &self,
        a: &mut u64,
        b: &mut u64,
        psi: Barrett<u64>,
        n_inv: Barrett<u64>,
    ) {
        debug_assert!(*a < self.two_q);
        debug_assert!(*b < self.two_q);
        if LAZY {
            let d: u64 = self
                .prime
                .barrett
                .mul_external::<NONE>(&psi, &(*a + self.two_q - *b));
            *a = self.prime.barrett.mul_external::<NONE>(&n_inv, &(*a + *b));
            *b = d;
        } else {
            let d: u64 = self
                .prime
                .barrett
                .mul_external::<ONCE>(&psi, &(*a + self.two_q - *b));
            *a = self.prime.barrett.mul_external::<ONCE>(&n_inv, &(*a + *b));
            *b = d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_backward_is_identity() {
        let prime: Prime<u64> = Prime::new(0x800000000004001);
        let n: u64 = 32;
        let table: Table<u64> = Table::new(prime, n << 1);
        let mut a: Vec<u64> = (0..n).collect();
        let b: Vec<u64> = a.clone();
        table.forward_inplace::<false>(&mut a);
        table.backward_inplace::<false>(&mut a);
        assert_eq!(a, b);
    }

    #[test]
    fn pointwise_product_is_negacyclic_convolution() {
        // X * X = X^2 and X^(n-1) * X = -1 in Z_q[X]/(X^n + 1).
        let prime: Prime<u64> = Prime::new(0x1fffffffffe00001);
        let q: u64 = prime.q();
        let n: usize = 16;
        let table: Table<u64> = Table::new(prime, (n as u64) << 1);

        let mut x: Vec<u64> = vec![0; n];
        x[1] = 1;
        let mut x_n_minus_1: Vec<u64> = vec![0; n];
        x_n_minus_1[n - 1] = 1;

        table.forward_inplace::<false>(&mut x);
        table.forward_inplace::<false>(&mut x_n_minus_1);

        let barrett = |a: u64, b: u64| ((a as u128 * b as u128) % q as u128) as u64;

        let mut sq: Vec<u64> = x.iter().map(|&v| barrett(v, v)).collect();
        table.backward_inplace::<false>(&mut sq);
        let mut expected_sq: Vec<u64> = vec![0; n];
        expected_sq[2] = 1;
        assert_eq!(sq, expected_sq);

        let mut wrap: Vec<u64> = izip!(x.iter(), x_n_minus_1.iter())
            .map(|(&a, &b)| barrett(a, b))
            .collect();
        table.backward_inplace::<false>(&mut wrap);
        let mut expected_wrap: Vec<u64> = vec![0; n];
        expected_wrap[0] = q - 1;
        assert_eq!(wrap, expected_wrap);
    }

    #[test]
    fn lazy_forward_stays_below_two_q() {
        let prime: Prime<u64> = Prime::new(0x1fffffffffc80001);
        let two_q: u64 = prime.q() << 1;
        let n: usize = 64;
        let table: Table<u64> = Table::new(prime, (n as u64) << 1);
        let mut a: Vec<u64> = (0..n as u64).map(|i| i * 12345).collect();
        table.forward_inplace::<true>(&mut a);
        assert!(a.iter().all(|&x| x < two_q));
    }
}
