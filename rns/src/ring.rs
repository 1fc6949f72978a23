mod automorphism;
mod bigint;
mod rescaling;
mod sampling;

pub use automorphism::automorphism_index;

use crate::dft::ntt::Table;
use crate::modulus::barrett::Barrett;
use crate::modulus::prime::Prime;
use crate::modulus::{BARRETT, ONCE};
use crate::poly::{Poly, PolyRNS};

use itertools::izip;

/// The ring Z_q[X]/(X^n + 1) for a single NTT-friendly prime q.
pub struct Ring<O> {
    n: usize,
    nth_root: u64,
    pub modulus: Prime<O>,
    dft: Table<O>,
}

impl Ring<u64> {
    /// Panics if n is not a power of two or q is not an odd prime
    /// congruent to 1 mod 2n.
    pub fn new(n: usize, q: u64) -> Self {
        assert!(
            n != 0 && n & (n - 1) == 0,
            "invalid n: {} is not a power of two",
            n
        );
        let nth_root: u64 = (n as u64) << 1;
        assert!(
            q % nth_root == 1,
            "invalid q: q={} != 1 mod 2n={}",
            q,
            nth_root
        );
        let prime: Prime<u64> = Prime::new(q);
        Self {
            n,
            nth_root,
            dft: Table::new(prime.clone(), nth_root),
            modulus: prime,
        }
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn nth_root(&self) -> u64 {
        self.nth_root
    }

    #[inline(always)]
    pub fn q(&self) -> u64 {
        self.modulus.q
    }

    pub fn new_poly(&self) -> Poly<u64> {
        Poly::new(self.n)
    }

    pub fn psi(&self) -> u64 {
        self.dft.psi()
    }
}

impl Ring<u64> {
    pub fn ntt_inplace<const LAZY: bool>(&self, poly: &mut Poly<u64>) {
        self.dft.forward_inplace::<LAZY>(&mut poly.0);
    }

    pub fn intt_inplace<const LAZY: bool>(&self, poly: &mut Poly<u64>) {
        self.dft.backward_inplace::<LAZY>(&mut poly.0);
    }

    pub fn ntt<const LAZY: bool>(&self, poly_in: &Poly<u64>, poly_out: &mut Poly<u64>) {
        poly_out.0.copy_from_slice(&poly_in.0);
        self.dft.forward_inplace::<LAZY>(&mut poly_out.0);
    }

    pub fn intt<const LAZY: bool>(&self, poly_in: &Poly<u64>, poly_out: &mut Poly<u64>) {
        poly_out.0.copy_from_slice(&poly_in.0);
        self.dft.backward_inplace::<LAZY>(&mut poly_out.0);
    }
}

impl Ring<u64> {
    #[inline(always)]
    pub fn add(&self, a: &Poly<u64>, b: &Poly<u64>, c: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n && c.n() == self.n);
        izip!(a.0.iter(), b.0.iter(), c.0.iter_mut())
            .for_each(|(&a, &b, c)| *c = self.modulus.add_mod(a, b));
    }

    /// b <- a + b
    #[inline(always)]
    pub fn add_inplace(&self, a: &Poly<u64>, b: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n);
        izip!(a.0.iter(), b.0.iter_mut()).for_each(|(&a, b)| *b = self.modulus.add_mod(a, *b));
    }

    #[inline(always)]
    pub fn sub(&self, a: &Poly<u64>, b: &Poly<u64>, c: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n && c.n() == self.n);
        izip!(a.0.iter(), b.0.iter(), c.0.iter_mut())
            .for_each(|(&a, &b, c)| *c = self.modulus.sub_mod(a, b));
    }

    /// b <- b - a
    #[inline(always)]
    pub fn sub_inplace(&self, a: &Poly<u64>, b: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n);
        izip!(a.0.iter(), b.0.iter_mut()).for_each(|(&a, b)| *b = self.modulus.sub_mod(*b, a));
    }

    #[inline(always)]
    pub fn neg(&self, a: &Poly<u64>, b: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n);
        izip!(a.0.iter(), b.0.iter_mut()).for_each(|(&a, b)| *b = self.modulus.neg_mod(a));
    }

    #[inline(always)]
    pub fn neg_inplace(&self, a: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n);
        a.0.iter_mut().for_each(|a| *a = self.modulus.neg_mod(*a));
    }

    /// c <- a + s
    #[inline(always)]
    pub fn add_scalar(&self, a: &Poly<u64>, s: u64, c: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && c.n() == self.n && s < self.q());
        izip!(a.0.iter(), c.0.iter_mut()).for_each(|(&a, c)| *c = self.modulus.add_mod(a, s));
    }

    /// c <- a * s
    #[inline(always)]
    pub fn mul_scalar(&self, a: &Poly<u64>, s: u64, c: &mut Poly<u64>) {
        let s_prepared: Barrett<u64> = self
            .modulus
            .barrett
            .prepare(self.modulus.barrett.reduce::<BARRETT>(&s));
        self.mul_scalar_barrett(a, &s_prepared, c);
    }

    #[inline(always)]
    pub fn mul_scalar_inplace(&self, s: u64, a: &mut Poly<u64>) {
        let s_prepared: Barrett<u64> = self
            .modulus
            .barrett
            .prepare(self.modulus.barrett.reduce::<BARRETT>(&s));
        self.mul_scalar_barrett_inplace(&s_prepared, a);
    }

    #[inline(always)]
    pub fn mul_scalar_barrett(&self, a: &Poly<u64>, s: &Barrett<u64>, c: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && c.n() == self.n);
        izip!(a.0.iter(), c.0.iter_mut()).for_each(|(&a, c)| {
            *c = self.modulus.barrett.mul_external::<ONCE>(s, &a)
        });
    }

    #[inline(always)]
    pub fn mul_scalar_barrett_inplace(&self, s: &Barrett<u64>, a: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n);
        a.0.iter_mut().for_each(|a| {
            self.modulus.barrett.mul_external_assign::<ONCE>(s, a)
        });
    }

    /// c <- a * b (pointwise; both operands in the same domain)
    #[inline(always)]
    pub fn mul(&self, a: &Poly<u64>, b: &Poly<u64>, c: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n && c.n() == self.n);
        izip!(a.0.iter(), b.0.iter(), c.0.iter_mut())
            .for_each(|(&a, &b, c)| *c = self.modulus.barrett.mul_mod(a, b));
    }

    /// b <- a * b
    #[inline(always)]
    pub fn mul_inplace(&self, a: &Poly<u64>, b: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n);
        izip!(a.0.iter(), b.0.iter_mut())
            .for_each(|(&a, b)| *b = self.modulus.barrett.mul_mod(a, *b));
    }

    /// c <- c + a * b
    #[inline(always)]
    pub fn mul_then_add_inplace(&self, a: &Poly<u64>, b: &Poly<u64>, c: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n && b.n() == self.n && c.n() == self.n);
        izip!(a.0.iter(), b.0.iter(), c.0.iter_mut())
            .for_each(|(&a, &b, c)| *c = self.modulus.add_mod(*c, self.modulus.barrett.mul_mod(a, b)));
    }

    /// out <- src mod q, mapping negative values to their residues.
    pub fn from_i64(&self, src: &[i64], out: &mut Poly<u64>) {
        debug_assert!(src.len() == self.n && out.n() == self.n);
        let q: u64 = self.q();
        izip!(src.iter(), out.0.iter_mut()).for_each(|(&v, out)| {
            *out = v.rem_euclid(q as i64) as u64;
        });
    }

    /// out <- centered representative of a, in (-q/2, q/2].
    pub fn to_i64_centered(&self, a: &Poly<u64>, out: &mut [i64]) {
        debug_assert!(a.n() == self.n && out.len() == self.n);
        let q: u64 = self.q();
        let half: u64 = q >> 1;
        izip!(a.0.iter(), out.iter_mut()).for_each(|(&v, out)| {
            *out = if v > half {
                v as i64 - q as i64
            } else {
                v as i64
            };
        });
    }
}

/// A chain of rings sharing the degree n, one per prime of an RNS basis.
/// Borrowing allows cheap level views: at_level(l) operates on the
/// sub-chain q_0..q_l.
pub struct RingRNS<'a, O>(pub Vec<&'a Ring<O>>);

impl<'a> RingRNS<'a, u64> {
    pub fn new(rings: &'a [Ring<u64>]) -> Self {
        assert!(!rings.is_empty(), "rings cannot be empty");
        RingRNS(rings.iter().collect())
    }

    pub fn from_refs(rings: Vec<&'a Ring<u64>>) -> Self {
        assert!(!rings.is_empty(), "rings cannot be empty");
        RingRNS(rings)
    }

    pub fn at_level(&self, level: usize) -> RingRNS<'a, u64> {
        assert!(
            level <= self.level(),
            "invalid level: level={} > self.level()={}",
            level,
            self.level()
        );
        RingRNS(self.0[..level + 1].to_vec())
    }

    #[inline(always)]
    pub fn level(&self) -> usize {
        self.0.len() - 1
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.0[0].n()
    }

    pub fn new_polyrns(&self) -> PolyRNS<u64> {
        PolyRNS::new(self.n(), self.level())
    }
}

macro_rules! limbwise_binary {
    ($fn_name:ident) => {
        #[inline(always)]
        pub fn $fn_name(&self, a: &PolyRNS<u64>, b: &PolyRNS<u64>, c: &mut PolyRNS<u64>) {
            debug_assert!(a.level() >= self.level());
            debug_assert!(b.level() >= self.level());
            debug_assert!(c.level() >= self.level());
            self.0
                .iter()
                .enumerate()
                .for_each(|(i, ring)| ring.$fn_name(a.at(i), b.at(i), c.at_mut(i)));
        }
    };
}

macro_rules! limbwise_binary_inplace {
    ($fn_name:ident) => {
        #[inline(always)]
        pub fn $fn_name(&self, a: &PolyRNS<u64>, b: &mut PolyRNS<u64>) {
            debug_assert!(a.level() >= self.level());
            debug_assert!(b.level() >= self.level());
            self.0
                .iter()
                .enumerate()
                .for_each(|(i, ring)| ring.$fn_name(a.at(i), b.at_mut(i)));
        }
    };
}

impl RingRNS<'_, u64> {
    limbwise_binary!(add);
    limbwise_binary!(sub);
    limbwise_binary!(mul);
    limbwise_binary_inplace!(add_inplace);
    limbwise_binary_inplace!(sub_inplace);
    limbwise_binary_inplace!(mul_inplace);

    #[inline(always)]
    pub fn neg(&self, a: &PolyRNS<u64>, b: &mut PolyRNS<u64>) {
        debug_assert!(a.level() >= self.level() && b.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.neg(a.at(i), b.at_mut(i)));
    }

    #[inline(always)]
    pub fn neg_inplace(&self, a: &mut PolyRNS<u64>) {
        debug_assert!(a.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.neg_inplace(a.at_mut(i)));
    }

    #[inline(always)]
    pub fn mul_then_add_inplace(&self, a: &PolyRNS<u64>, b: &PolyRNS<u64>, c: &mut PolyRNS<u64>) {
        debug_assert!(a.level() >= self.level());
        debug_assert!(b.level() >= self.level());
        debug_assert!(c.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.mul_then_add_inplace(a.at(i), b.at(i), c.at_mut(i)));
    }

    pub fn ntt_inplace<const LAZY: bool>(&self, a: &mut PolyRNS<u64>) {
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.ntt_inplace::<LAZY>(a.at_mut(i)));
    }

    pub fn intt_inplace<const LAZY: bool>(&self, a: &mut PolyRNS<u64>) {
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.intt_inplace::<LAZY>(a.at_mut(i)));
    }

    pub fn ntt<const LAZY: bool>(&self, a: &PolyRNS<u64>, b: &mut PolyRNS<u64>) {
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.ntt::<LAZY>(a.at(i), b.at_mut(i)));
    }

    /// out <- src mod q_i for every limb, mapping negative values to
    /// their residues.
    pub fn from_i64(&self, src: &[i64], out: &mut PolyRNS<u64>) {
        debug_assert!(out.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.from_i64(src, out.at_mut(i)));
    }
}
