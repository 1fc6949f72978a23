use crate::poly::{Poly, PolyRNS};
use crate::ring::{Ring, RingRNS};

use sampling::source::Source;

impl Ring<u64> {
    /// Fills a with coefficients uniform in [0, q) by masked rejection.
    pub fn fill_uniform(&self, source: &mut Source, a: &mut Poly<u64>) {
        debug_assert!(a.n() == self.n());
        let q: u64 = self.q();
        let mask: u64 = q.next_power_of_two() - 1;
        a.0.iter_mut().for_each(|c| *c = source.next_u64n(q, mask));
    }
}

impl RingRNS<'_, u64> {
    /// Fills a with a uniform element of the full RNS basis; limbwise
    /// independent uniform residues are uniform mod the product by CRT.
    pub fn fill_uniform(&self, source: &mut Source, a: &mut PolyRNS<u64>) {
        debug_assert!(a.level() >= self.level());
        self.0
            .iter()
            .enumerate()
            .for_each(|(i, ring)| ring.fill_uniform(source, a.at_mut(i)));
    }
}
