use crate::error::{Error, Result};
use crate::keys::KeySwitchKey;
use crate::parameters::{Context, SchemeType};

use itertools::izip;
use rns::modulus::{BARRETT, ONCE};
use rns::poly::{Poly, PolyRNS};
use rns::ring::RingRNS;

/// Switches `target` (a polynomial currently decryptable under the key
/// the gadget was generated for) back under the secret key, and adds
/// the resulting pair into (c0, c1).
///
/// The decomposition is limbwise: each data limb of `target` is lifted
/// into the mixed basis (live data limbs + key modulus), multiplied
/// against the matching gadget row in the NTT domain, and the
/// accumulated pair is divided by the key modulus.
pub(crate) fn switch_key_inplace(
    ctx: &Context,
    level: usize,
    target: &PolyRNS<u64>,
    ksk: &KeySwitchKey,
    c0: &mut PolyRNS<u64>,
    c1: &mut PolyRNS<u64>,
) -> Result<()> {
    if !ctx.using_keyswitching() {
        return Err(Error::InvalidParameters(
            "key switching requires at least two coefficient moduli".to_string(),
        ));
    }

    let limbs: usize = ctx.limbs(level);
    let data_count: usize = ctx.data_count();
    let ext: RingRNS<u64> = ctx.keyswitch_ring_rns(level);

    let mut acc0: PolyRNS<u64> = ext.new_polyrns();
    let mut acc1: PolyRNS<u64> = ext.new_polyrns();
    let mut d_ext: PolyRNS<u64> = ext.new_polyrns();

    for i in 0..limbs {
        let d: &Poly<u64> = target.at(i);
        // Lift the i-th limb into every modulus of the mixed basis.
        for j in 0..=limbs {
            let ring_j = ext.0[j];
            let dst: &mut Poly<u64> = d_ext.at_mut(j);
            if j == i {
                dst.copy_from(d);
            } else {
                izip!(d.0.iter(), dst.0.iter_mut())
                    .for_each(|(&v, o)| *o = ring_j.modulus.barrett.reduce::<BARRETT>(&v));
            }
            ring_j.ntt_inplace::<false>(dst);
        }

        let (b, a) = &ksk.rows[i];
        for j in 0..=limbs {
            let key_limb: usize = if j == limbs { data_count } else { j };
            let ring_j = ext.0[j];
            ring_j.mul_then_add_inplace(d_ext.at(j), b.at(key_limb), acc0.at_mut(j));
            ring_j.mul_then_add_inplace(d_ext.at(j), a.at(key_limb), acc1.at_mut(j));
        }
    }

    ext.intt_inplace::<false>(&mut acc0);
    ext.intt_inplace::<false>(&mut acc1);

    // Divide the accumulators by the key modulus. BGV needs the exact
    // variant that preserves the residue mod t.
    match ctx.scheme() {
        SchemeType::Bgv => {
            div_by_last_modulus_bgv_inplace(&ext, ctx.plain_modulus(), &mut acc0);
            div_by_last_modulus_bgv_inplace(&ext, ctx.plain_modulus(), &mut acc1);
        }
        _ => {
            ext.div_round_by_last_modulus_inplace(&mut acc0);
            ext.div_round_by_last_modulus_inplace(&mut acc1);
        }
    }

    let rr: RingRNS<u64> = ctx.ring_rns(level);
    rr.add_inplace(&acc0, c0);
    rr.add_inplace(&acc1, c1);
    Ok(())
}

/// a <- (a - v) / q[level] with v = t * [[a]_q * t^-1]_q centered, so
/// that the result is an exact integer congruent to a * q^-1 mod t.
/// This is the modulus drop the BGV scheme needs: plain rounding would
/// perturb the residue mod t.
pub(crate) fn div_by_last_modulus_bgv_inplace(rr: &RingRNS<u64>, t: u64, a: &mut PolyRNS<u64>) {
    let level: usize = rr.level();
    assert!(level >= 1, "invalid chain: cannot drop the last modulus");

    let last = &rr.0[level].modulus;
    let q_last: u64 = last.q;
    let half: u64 = q_last >> 1;
    let t_inv: u64 = last.inv(last.barrett.reduce::<BARRETT>(&t));

    // w = [a_last * t^-1]_{q_last}
    let (low, high) = a.split_at_mut(level);
    let w: &mut Poly<u64> = &mut high[0];
    w.0.iter_mut()
        .for_each(|c| *c = last.barrett.mul_mod(*c, t_inv));

    for (i, ring) in rr.0[..level].iter().enumerate() {
        let prime = &ring.modulus;
        let q_i: u64 = prime.q;
        let q_last_inv = prime
            .barrett
            .prepare(prime.inv(prime.barrett.reduce::<BARRETT>(&q_last)));
        let q_last_mod_qi: u64 = prime.barrett.reduce::<BARRETT>(&q_last);
        let t_mod_qi: u64 = prime.barrett.reduce::<BARRETT>(&t);
        izip!(low[i].0.iter_mut(), w.0.iter()).for_each(|(ai, &wj)| {
            // centered lift of w mod q_i
            let w_i: u64 = prime.barrett.reduce::<BARRETT>(&wj);
            let w_centered: u64 = if wj > half {
                prime.sub_mod(w_i, q_last_mod_qi)
            } else {
                w_i
            };
            let tw: u64 = prime.mul_mod(t_mod_qi, w_centered);
            let num: u64 = prime.sub_mod(*ai, tw);
            *ai = prime.barrett.mul_external::<ONCE>(&q_last_inv, &num);
        });
    }

    a.truncate_level(level - 1);
}
