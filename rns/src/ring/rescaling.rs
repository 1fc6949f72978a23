use crate::modulus::barrett::Barrett;
use crate::modulus::{BARRETT, ONCE};
use crate::poly::{Poly, PolyRNS};
use crate::ring::RingRNS;

use itertools::izip;

impl RingRNS<'_, u64> {
    /// b <- round(a / q[level]), defined over the chain minus its last
    /// modulus. Operands are in the coefficient domain.
    pub fn div_round_by_last_modulus(&self, a: &PolyRNS<u64>, b: &mut PolyRNS<u64>) {
        let level: usize = self.level();
        assert!(level >= 1, "invalid chain: cannot drop the last modulus");
        assert!(
            a.level() >= level,
            "invalid a: a.level()={} < level={}",
            a.level(),
            level
        );
        assert!(
            b.level() >= level - 1,
            "invalid b: b.level()={} < level-1={}",
            b.level(),
            level - 1
        );

        let q_last: u64 = self.0[level].q();
        let half: u64 = q_last >> 1;

        // tmp = (a_last + floor(q_last/2)) mod q_last, so that the floor
        // division below realizes round-to-nearest.
        let mut tmp: Poly<u64> = self.0[level].new_poly();
        self.0[level].add_scalar(a.at(level), half, &mut tmp);

        for (i, ring) in self.0[..level].iter().enumerate() {
            let prime = &ring.modulus;
            let q_last_inv: Barrett<u64> =
                prime.barrett.prepare(prime.inv(prime.barrett.reduce::<BARRETT>(&q_last)));
            let half_i: u64 = prime.barrett.reduce::<BARRETT>(&half);
            let q_i: u64 = prime.q;
            izip!(a.at(i).0.iter(), tmp.0.iter(), b.at_mut(i).0.iter_mut()).for_each(
                |(&ai, &t, bi)| {
                    // (a_i + half - tmp) * q_last^-1 mod q_i
                    let t_i: u64 = prime.barrett.reduce::<BARRETT>(&t);
                    let num: u64 = ai + half_i + q_i - t_i;
                    *bi = prime.barrett.mul_external::<ONCE>(&q_last_inv, &num);
                },
            );
        }
    }

    /// a <- round(a / q[level]), dropping the last limb.
    pub fn div_round_by_last_modulus_inplace(&self, a: &mut PolyRNS<u64>) {
        let level: usize = self.level();
        assert!(level >= 1, "invalid chain: cannot drop the last modulus");
        assert!(
            a.level() >= level,
            "invalid a: a.level()={} < level={}",
            a.level(),
            level
        );

        let q_last: u64 = self.0[level].q();
        let half: u64 = q_last >> 1;

        let (low, high) = a.split_at_mut(level);
        let a_last: &mut Poly<u64> = &mut high[0];
        a_last
            .0
            .iter_mut()
            .for_each(|c| *c = self.0[level].modulus.add_mod(*c, half));

        for (i, ring) in self.0[..level].iter().enumerate() {
            let prime = &ring.modulus;
            let q_last_inv: Barrett<u64> =
                prime.barrett.prepare(prime.inv(prime.barrett.reduce::<BARRETT>(&q_last)));
            let half_i: u64 = prime.barrett.reduce::<BARRETT>(&half);
            let q_i: u64 = prime.q;
            izip!(low[i].0.iter_mut(), a_last.0.iter()).for_each(|(ai, &t)| {
                let t_i: u64 = prime.barrett.reduce::<BARRETT>(&t);
                let num: u64 = *ai + half_i + q_i - t_i;
                *ai = prime.barrett.mul_external::<ONCE>(&q_last_inv, &num);
            });
        }

        a.truncate_level(level - 1);
    }
}
