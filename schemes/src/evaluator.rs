use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::key_switching::{div_by_last_modulus_bgv_inplace, switch_key_inplace};
use crate::keys::{GaloisKeys, RelinKeys};
use crate::parameters::{inv_mod_u64, mul_mod_u64, Context, SchemeType};
use crate::plaintext::{Plaintext, PlaintextRepr};

use num_bigint::BigInt;
use rns::num_bigint::Div;
use rns::poly::{Poly, PolyRNS};
use rns::ring::{automorphism_index, RingRNS};

use std::sync::Arc;

/// Relative tolerance when comparing approximate-scheme scales.
const SCALE_TOLERANCE: f64 = 1.0 / (1u64 << 40) as f64;

/// Homomorphic arithmetic on ciphertexts. The evaluator holds no
/// mutable state beyond the shared read-only context, so concurrent
/// calls on disjoint ciphertexts are safe; aliasing one ciphertext
/// across threads is the caller's responsibility.
pub struct Evaluator {
    ctx: Arc<Context>,
}

impl Evaluator {
    pub fn new(ctx: &Arc<Context>) -> Self {
        Self { ctx: ctx.clone() }
    }

    // ---- unary -------------------------------------------------------

    pub fn negate_inplace(&self, a: &mut Ciphertext) -> Result<()> {
        self.check_ct(a)?;
        let rr: RingRNS<u64> = self.ctx.ring_rns(a.level);
        a.polys.iter_mut().for_each(|p| rr.neg_inplace(p));
        Ok(())
    }

    pub fn negate(&self, a: &Ciphertext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.negate_inplace(&mut out)?;
        Ok(out)
    }

    // ---- addition / subtraction -------------------------------------

    pub fn add_inplace(&self, a: &mut Ciphertext, b: &Ciphertext) -> Result<()> {
        self.check_binary(a, b)?;
        let rr: RingRNS<u64> = self.ctx.ring_rns(a.level);
        for k in 0..a.polys.len() {
            rr.add_inplace(&b.polys[k], &mut a.polys[k]);
        }
        Ok(())
    }

    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.add_inplace(&mut out, b)?;
        Ok(out)
    }

    pub fn add_many(&self, cts: &[Ciphertext]) -> Result<Ciphertext> {
        let (first, rest) = cts.split_first().ok_or_else(|| {
            Error::InvalidParameters("add_many needs at least one operand".to_string())
        })?;
        let mut out: Ciphertext = first.clone();
        for ct in rest {
            self.add_inplace(&mut out, ct)?;
        }
        Ok(out)
    }

    pub fn sub_inplace(&self, a: &mut Ciphertext, b: &Ciphertext) -> Result<()> {
        self.check_binary(a, b)?;
        let rr: RingRNS<u64> = self.ctx.ring_rns(a.level);
        for k in 0..a.polys.len() {
            rr.sub_inplace(&b.polys[k], &mut a.polys[k]);
        }
        Ok(())
    }

    pub fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.sub_inplace(&mut out, b)?;
        Ok(out)
    }

    // ---- plaintext operands -----------------------------------------

    pub fn add_plain_inplace(&self, a: &mut Ciphertext, pt: &Plaintext) -> Result<()> {
        self.plain_linear_inplace::<false>(a, pt)
    }

    pub fn add_plain(&self, a: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.add_plain_inplace(&mut out, pt)?;
        Ok(out)
    }

    pub fn sub_plain_inplace(&self, a: &mut Ciphertext, pt: &Plaintext) -> Result<()> {
        self.plain_linear_inplace::<true>(a, pt)
    }

    pub fn sub_plain(&self, a: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.sub_plain_inplace(&mut out, pt)?;
        Ok(out)
    }

    fn plain_linear_inplace<const SUB: bool>(
        &self,
        a: &mut Ciphertext,
        pt: &Plaintext,
    ) -> Result<()> {
        self.check_ct(a)?;
        self.check_pt(pt)?;
        let ctx = &self.ctx;
        let rr: RingRNS<u64> = ctx.ring_rns(a.level);

        let contribution: PolyRNS<u64> = match (ctx.scheme(), &pt.repr) {
            (SchemeType::Bfv, PlaintextRepr::Coeffs(m)) => {
                // Delta_level * m, limbwise.
                let m_centered: Vec<i64> = center_mod(m, ctx.plain_modulus());
                let delta: &[u64] = ctx.delta_mod_qi(a.level);
                let mut out: PolyRNS<u64> = rr.new_polyrns();
                for (i, ring) in rr.0.iter().enumerate() {
                    ring.from_i64(&m_centered, out.at_mut(i));
                    ring.mul_scalar_inplace(delta[i], out.at_mut(i));
                }
                out
            }
            (SchemeType::Bgv, PlaintextRepr::Coeffs(m)) => {
                // The plaintext joins a ciphertext whose payload is
                // scaled by the inverse correction factor.
                let t: u64 = ctx.plain_modulus();
                let m_scaled: Poly<u64> = if a.correction_factor == 1 {
                    m.clone()
                } else {
                    let cf_inv: u64 = inv_mod_u64(a.correction_factor, t)
                        .expect("correction factor is a unit mod t");
                    let mut scaled: Poly<u64> = m.clone();
                    scaled
                        .0
                        .iter_mut()
                        .for_each(|v| *v = mul_mod_u64(*v, cf_inv, t));
                    scaled
                };
                let m_centered: Vec<i64> = center_mod(&m_scaled, t);
                let mut out: PolyRNS<u64> = rr.new_polyrns();
                rr.from_i64(&m_centered, &mut out);
                out
            }
            (SchemeType::Ckks, PlaintextRepr::Rns { polys, level }) => {
                if *level != a.level {
                    return Err(Error::LevelMismatch {
                        lhs: *level,
                        rhs: a.level,
                    });
                }
                if !scales_close(pt.scale, a.scale) {
                    return Err(Error::ScaleMismatch {
                        lhs: pt.scale,
                        rhs: a.scale,
                    });
                }
                polys.clone()
            }
            _ => {
                return Err(Error::InvalidParameters(
                    "plaintext representation does not match the scheme".to_string(),
                ))
            }
        };

        if SUB {
            rr.sub_inplace(&contribution, &mut a.polys[0]);
        } else {
            rr.add_inplace(&contribution, &mut a.polys[0]);
        }
        Ok(())
    }

    pub fn multiply_plain_inplace(&self, a: &mut Ciphertext, pt: &Plaintext) -> Result<()> {
        self.check_ct(a)?;
        self.check_pt(pt)?;
        let ctx = &self.ctx;
        let rr: RingRNS<u64> = ctx.ring_rns(a.level);

        let mut m_ntt: PolyRNS<u64> = match (ctx.scheme(), &pt.repr) {
            (SchemeType::Bfv, PlaintextRepr::Coeffs(m))
            | (SchemeType::Bgv, PlaintextRepr::Coeffs(m)) => {
                let m_centered: Vec<i64> = center_mod(m, ctx.plain_modulus());
                let mut out: PolyRNS<u64> = rr.new_polyrns();
                rr.from_i64(&m_centered, &mut out);
                out
            }
            (SchemeType::Ckks, PlaintextRepr::Rns { polys, level }) => {
                if *level != a.level {
                    return Err(Error::LevelMismatch {
                        lhs: *level,
                        rhs: a.level,
                    });
                }
                let product_scale: f64 = a.scale * pt.scale;
                self.check_scale_bound(product_scale, a.level)?;
                a.scale = product_scale;
                polys.clone()
            }
            _ => {
                return Err(Error::InvalidParameters(
                    "plaintext representation does not match the scheme".to_string(),
                ))
            }
        };
        rr.ntt_inplace::<false>(&mut m_ntt);

        for poly in a.polys.iter_mut() {
            for (i, ring) in rr.0.iter().enumerate() {
                ring.ntt_inplace::<false>(poly.at_mut(i));
                ring.mul_inplace(m_ntt.at(i), poly.at_mut(i));
                ring.intt_inplace::<false>(poly.at_mut(i));
            }
        }
        Ok(())
    }

    pub fn multiply_plain(&self, a: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.multiply_plain_inplace(&mut out, pt)?;
        Ok(out)
    }

    // ---- multiplication ---------------------------------------------

    /// The product carries three polynomial components until
    /// relinearized; a further multiplication, rotation or conjugation
    /// on the expanded form is rejected.
    pub fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.check_binary(a, b)?;

        let ctx = &self.ctx;
        let level: usize = a.level;
        let mut scale: f64 = 1.0;
        let mut correction_factor: u64 = 1;

        let polys: Vec<PolyRNS<u64>> = match ctx.scheme() {
            SchemeType::Ckks => {
                let product_scale: f64 = a.scale * b.scale;
                self.check_scale_bound(product_scale, level)?;
                scale = product_scale;
                self.tensor_mod_q(level, a, b)
            }
            SchemeType::Bgv => {
                let t: u64 = ctx.plain_modulus();
                correction_factor = mul_mod_u64(a.correction_factor, b.correction_factor, t);
                self.tensor_mod_q(level, a, b)
            }
            SchemeType::Bfv => self.bfv_tensor(level, a, b),
        };

        Ok(Ciphertext {
            polys,
            level,
            scale,
            correction_factor,
            parms_id: ctx.parms_id(),
        })
    }

    pub fn multiply_inplace(&self, a: &mut Ciphertext, b: &Ciphertext) -> Result<()> {
        *a = self.multiply(a, b)?;
        Ok(())
    }

    pub fn square(&self, a: &Ciphertext) -> Result<Ciphertext> {
        self.multiply(a, a)
    }

    pub fn square_inplace(&self, a: &mut Ciphertext) -> Result<()> {
        *a = self.multiply(a, a)?;
        Ok(())
    }

    pub fn multiply_many(&self, cts: &[Ciphertext], rk: &RelinKeys) -> Result<Ciphertext> {
        let (first, rest) = cts.split_first().ok_or_else(|| {
            Error::InvalidParameters("multiply_many needs at least one operand".to_string())
        })?;
        let mut out: Ciphertext = first.clone();
        for ct in rest {
            self.multiply_inplace(&mut out, ct)?;
            self.relinearize_inplace(&mut out, rk)?;
        }
        Ok(out)
    }

    pub fn exponentiate_inplace(
        &self,
        a: &mut Ciphertext,
        power: u64,
        rk: &RelinKeys,
    ) -> Result<()> {
        match self.ctx.scheme() {
            SchemeType::Bfv | SchemeType::Bgv => {}
            SchemeType::Ckks => {
                return Err(Error::InvalidParameters(
                    "exponentiate is defined for the integer schemes only".to_string(),
                ))
            }
        }
        if power == 0 {
            return Err(Error::InvalidParameters(
                "cannot exponentiate to the power zero".to_string(),
            ));
        }
        let base: Ciphertext = a.clone();
        let bits: u32 = 64 - power.leading_zeros();
        for i in (0..bits - 1).rev() {
            self.square_inplace(a)?;
            self.relinearize_inplace(a, rk)?;
            if (power >> i) & 1 == 1 {
                self.multiply_inplace(a, &base)?;
                self.relinearize_inplace(a, rk)?;
            }
        }
        Ok(())
    }

    pub fn exponentiate(&self, a: &Ciphertext, power: u64, rk: &RelinKeys) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.exponentiate_inplace(&mut out, power, rk)?;
        Ok(out)
    }

    // ---- relinearization --------------------------------------------

    pub fn relinearize_inplace(&self, a: &mut Ciphertext, rk: &RelinKeys) -> Result<()> {
        self.check_ct(a)?;
        if rk.parms_id != self.ctx.parms_id() {
            return Err(Error::MissingOrMismatchedKey("relinearization keys"));
        }
        if a.size() != 3 {
            return Err(Error::SizeMismatch {
                given: a.size(),
                required: 3,
            });
        }

        let c2: PolyRNS<u64> = a.polys.pop().unwrap();
        let (head, tail) = a.polys.split_at_mut(1);
        switch_key_inplace(
            &self.ctx,
            a.level,
            &c2,
            &rk.key,
            &mut head[0],
            &mut tail[0],
        )
    }

    pub fn relinearize(&self, a: &Ciphertext, rk: &RelinKeys) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.relinearize_inplace(&mut out, rk)?;
        Ok(out)
    }

    // ---- modulus chain ----------------------------------------------

    pub fn mod_switch_to_next_inplace(&self, a: &mut Ciphertext) -> Result<()> {
        self.check_ct(a)?;
        if a.level >= self.ctx.max_level() {
            return Err(Error::ChainExhausted);
        }
        let ctx = &self.ctx;
        let rr: RingRNS<u64> = ctx.ring_rns(a.level);
        let limbs: usize = ctx.limbs(a.level);

        match ctx.scheme() {
            SchemeType::Ckks => {
                a.polys.iter_mut().for_each(|p| p.truncate_level(limbs - 2));
            }
            SchemeType::Bfv => {
                a.polys
                    .iter_mut()
                    .for_each(|p| rr.div_round_by_last_modulus_inplace(p));
            }
            SchemeType::Bgv => {
                let t: u64 = ctx.plain_modulus();
                a.polys
                    .iter_mut()
                    .for_each(|p| div_by_last_modulus_bgv_inplace(&rr, t, p));
                let q_dropped: u64 = rr.0[limbs - 1].q() % t;
                a.correction_factor = mul_mod_u64(a.correction_factor, q_dropped, t);
            }
        }
        a.level += 1;
        Ok(())
    }

    pub fn mod_switch_to_next(&self, a: &Ciphertext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.mod_switch_to_next_inplace(&mut out)?;
        Ok(out)
    }

    pub fn mod_switch_to_inplace(&self, a: &mut Ciphertext, level: usize) -> Result<()> {
        self.check_ct(a)?;
        if level < a.level || level > self.ctx.max_level() {
            return Err(Error::InvalidParameters(format!(
                "cannot switch from level {} to level {}",
                a.level, level
            )));
        }
        while a.level < level {
            self.mod_switch_to_next_inplace(a)?;
        }
        Ok(())
    }

    /// Aligns an approximate-scheme plaintext with a deeper level.
    pub fn mod_switch_to_next_plain_inplace(&self, pt: &mut Plaintext) -> Result<()> {
        self.check_pt(pt)?;
        match &mut pt.repr {
            PlaintextRepr::Rns { polys, level } => {
                if *level >= self.ctx.max_level() {
                    return Err(Error::ChainExhausted);
                }
                let limbs: usize = self.ctx.limbs(*level);
                polys.truncate_level(limbs - 2);
                *level += 1;
                Ok(())
            }
            PlaintextRepr::Coeffs(_) => Err(Error::InvalidParameters(
                "only approximate-scheme plaintexts carry a chain level".to_string(),
            )),
        }
    }

    /// Drops one modulus and divides the scale by it, the approximate
    /// scheme's tool for keeping the scale stable across
    /// multiplications.
    pub fn rescale_to_next_inplace(&self, a: &mut Ciphertext) -> Result<()> {
        self.check_ct(a)?;
        if self.ctx.scheme() != SchemeType::Ckks {
            return Err(Error::InvalidParameters(
                "rescale_to_next requires the ckks scheme".to_string(),
            ));
        }
        self.check_canonical(a)?;
        if a.level >= self.ctx.max_level() {
            return Err(Error::ChainExhausted);
        }

        let rr: RingRNS<u64> = self.ctx.ring_rns(a.level);
        let limbs: usize = self.ctx.limbs(a.level);
        let q_dropped: f64 = rr.0[limbs - 1].q() as f64;
        a.polys
            .iter_mut()
            .for_each(|p| rr.div_round_by_last_modulus_inplace(p));
        a.scale /= q_dropped;
        a.level += 1;
        Ok(())
    }

    pub fn rescale_to_next(&self, a: &Ciphertext) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.rescale_to_next_inplace(&mut out)?;
        Ok(out)
    }

    // ---- rotations and conjugation ----------------------------------

    /// Applies the ring automorphism X -> X^galois_elt and switches the
    /// result back under the secret key.
    pub fn apply_galois_inplace(
        &self,
        a: &mut Ciphertext,
        galois_elt: usize,
        gk: &GaloisKeys,
    ) -> Result<()> {
        self.check_ct(a)?;
        self.check_canonical(a)?;
        if gk.parms_id != self.ctx.parms_id() {
            return Err(Error::MissingOrMismatchedKey("galois keys"));
        }
        let n: usize = self.ctx.n();
        if galois_elt & 1 == 0 || galois_elt >= 2 * n {
            return Err(Error::InvalidParameters(format!(
                "galois element {} is not an odd unit mod 2n",
                galois_elt
            )));
        }
        if galois_elt == 1 {
            return Ok(());
        }
        let key = gk
            .keys
            .get(&galois_elt)
            .ok_or(Error::MissingOrMismatchedKey(
                "galois key for the requested element",
            ))?;

        let rr: RingRNS<u64> = self.ctx.ring_rns(a.level);
        let idx: Vec<usize> = automorphism_index(n, galois_elt);

        let mut c0: PolyRNS<u64> = rr.new_polyrns();
        let mut c1_rot: PolyRNS<u64> = rr.new_polyrns();
        rr.automorphism_from_index(&a.polys[0], &idx, &mut c0);
        rr.automorphism_from_index(&a.polys[1], &idx, &mut c1_rot);

        let mut c1: PolyRNS<u64> = rr.new_polyrns();
        switch_key_inplace(&self.ctx, a.level, &c1_rot, key, &mut c0, &mut c1)?;
        a.polys[0] = c0;
        a.polys[1] = c1;
        Ok(())
    }

    pub fn apply_galois(
        &self,
        a: &Ciphertext,
        galois_elt: usize,
        gk: &GaloisKeys,
    ) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.apply_galois_inplace(&mut out, galois_elt, gk)?;
        Ok(out)
    }

    /// Cyclically rotates the approximate scheme's slot vector left by
    /// `steps` (right for negative steps).
    pub fn rotate_vector_inplace(
        &self,
        a: &mut Ciphertext,
        steps: i64,
        gk: &GaloisKeys,
    ) -> Result<()> {
        if self.ctx.scheme() != SchemeType::Ckks {
            return Err(Error::InvalidParameters(
                "rotate_vector requires the ckks scheme".to_string(),
            ));
        }
        self.rotate_internal(a, steps, gk)
    }

    pub fn rotate_vector(
        &self,
        a: &Ciphertext,
        steps: i64,
        gk: &GaloisKeys,
    ) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.rotate_vector_inplace(&mut out, steps, gk)?;
        Ok(out)
    }

    /// Cyclically rotates both rows of the batched 2 x (n/2) matrix.
    pub fn rotate_rows_inplace(
        &self,
        a: &mut Ciphertext,
        steps: i64,
        gk: &GaloisKeys,
    ) -> Result<()> {
        match self.ctx.scheme() {
            SchemeType::Bfv | SchemeType::Bgv => self.rotate_internal(a, steps, gk),
            SchemeType::Ckks => Err(Error::InvalidParameters(
                "rotate_rows is defined for the integer schemes only".to_string(),
            )),
        }
    }

    pub fn rotate_rows(&self, a: &Ciphertext, steps: i64, gk: &GaloisKeys) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.rotate_rows_inplace(&mut out, steps, gk)?;
        Ok(out)
    }

    /// Swaps the two rows of the batched matrix.
    pub fn rotate_columns_inplace(&self, a: &mut Ciphertext, gk: &GaloisKeys) -> Result<()> {
        match self.ctx.scheme() {
            SchemeType::Bfv | SchemeType::Bgv => {
                self.apply_galois_inplace(a, self.ctx.galois_elt_conjugate(), gk)
            }
            SchemeType::Ckks => Err(Error::InvalidParameters(
                "rotate_columns is defined for the integer schemes only".to_string(),
            )),
        }
    }

    pub fn rotate_columns(&self, a: &Ciphertext, gk: &GaloisKeys) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.rotate_columns_inplace(&mut out, gk)?;
        Ok(out)
    }

    /// Conjugates every slot of the approximate scheme.
    pub fn complex_conjugate_inplace(&self, a: &mut Ciphertext, gk: &GaloisKeys) -> Result<()> {
        if self.ctx.scheme() != SchemeType::Ckks {
            return Err(Error::InvalidParameters(
                "complex_conjugate requires the ckks scheme".to_string(),
            ));
        }
        self.apply_galois_inplace(a, self.ctx.galois_elt_conjugate(), gk)
    }

    pub fn complex_conjugate(&self, a: &Ciphertext, gk: &GaloisKeys) -> Result<Ciphertext> {
        let mut out: Ciphertext = a.clone();
        self.complex_conjugate_inplace(&mut out, gk)?;
        Ok(out)
    }

    fn rotate_internal(&self, a: &mut Ciphertext, steps: i64, gk: &GaloisKeys) -> Result<()> {
        let row_size: i64 = (self.ctx.n() as i64) >> 1;
        let r: u64 = steps.rem_euclid(row_size) as u64;
        if r == 0 {
            return Ok(());
        }

        // Prefer a single hop when a dedicated key exists, otherwise
        // decompose into the default power-of-two hops.
        let elt: usize = self.ctx.galois_elt_from_step(r as i64);
        if gk.has_key(elt) {
            return self.apply_galois_inplace(a, elt, gk);
        }
        for k in 0..64 - r.leading_zeros() {
            if (r >> k) & 1 == 1 {
                let elt_k: usize = self.ctx.galois_elt_from_step(1i64 << k);
                self.apply_galois_inplace(a, elt_k, gk)?;
            }
        }
        Ok(())
    }

    // ---- tensor products --------------------------------------------

    /// (a0, a1) x (b0, b1) -> (a0*b0, a0*b1 + a1*b0, a1*b1) mod Q.
    fn tensor_mod_q(&self, level: usize, a: &Ciphertext, b: &Ciphertext) -> Vec<PolyRNS<u64>> {
        let rr: RingRNS<u64> = self.ctx.ring_rns(level);
        let mut d0: PolyRNS<u64> = rr.new_polyrns();
        let mut d1: PolyRNS<u64> = rr.new_polyrns();
        let mut d2: PolyRNS<u64> = rr.new_polyrns();

        for (i, ring) in rr.0.iter().enumerate() {
            let mut a0: Poly<u64> = ring.new_poly();
            let mut a1: Poly<u64> = ring.new_poly();
            let mut b0: Poly<u64> = ring.new_poly();
            let mut b1: Poly<u64> = ring.new_poly();
            ring.ntt::<false>(a.polys[0].at(i), &mut a0);
            ring.ntt::<false>(a.polys[1].at(i), &mut a1);
            ring.ntt::<false>(b.polys[0].at(i), &mut b0);
            ring.ntt::<false>(b.polys[1].at(i), &mut b1);

            let mut tmp: Poly<u64> = ring.new_poly();
            ring.mul(&a0, &b0, &mut tmp);
            ring.intt::<false>(&tmp, d0.at_mut(i));

            ring.mul(&a0, &b1, &mut tmp);
            ring.mul_then_add_inplace(&a1, &b0, &mut tmp);
            ring.intt::<false>(&tmp, d1.at_mut(i));

            ring.mul(&a1, &b1, &mut tmp);
            ring.intt::<false>(&tmp, d2.at_mut(i));
        }
        vec![d0, d1, d2]
    }

    /// The BFV tensor product: lift both operands into the extension
    /// basis, tensor exactly, then scale by t/Q with exact CRT
    /// rounding back into the data chain.
    fn bfv_tensor(&self, level: usize, a: &Ciphertext, b: &Ciphertext) -> Vec<PolyRNS<u64>> {
        let ctx = &self.ctx;
        let rr: RingRNS<u64> = ctx.ring_rns(level);
        let limbs: usize = ctx.limbs(level);
        let n: usize = ctx.n();

        let mut ext_refs: Vec<&rns::ring::Ring<u64>> = rr.0.clone();
        ext_refs.extend(ctx.aux_rings().iter());
        let ext: RingRNS<u64> = RingRNS::from_refs(ext_refs);

        // Lift the four component polynomials into the extension basis
        // (centered representatives agree with the data limbs mod q_i).
        let lift = |p: &PolyRNS<u64>| -> PolyRNS<u64> {
            let mut coeffs: Vec<BigInt> = vec![BigInt::default(); n];
            rr.to_bigint_inplace(p, &mut coeffs);
            let mut out: PolyRNS<u64> = ext.new_polyrns();
            for (i, ring) in ext.0.iter().enumerate() {
                if i < limbs {
                    out.at_mut(i).copy_from(p.at(i));
                } else {
                    ring.from_bigint(&coeffs, out.at_mut(i));
                }
                ring.ntt_inplace::<false>(out.at_mut(i));
            }
            out
        };

        let a0: PolyRNS<u64> = lift(&a.polys[0]);
        let a1: PolyRNS<u64> = lift(&a.polys[1]);
        let b0: PolyRNS<u64> = lift(&b.polys[0]);
        let b1: PolyRNS<u64> = lift(&b.polys[1]);

        let mut d0: PolyRNS<u64> = ext.new_polyrns();
        let mut d1: PolyRNS<u64> = ext.new_polyrns();
        let mut d2: PolyRNS<u64> = ext.new_polyrns();
        ext.mul(&a0, &b0, &mut d0);
        ext.mul(&a0, &b1, &mut d1);
        ext.mul_then_add_inplace(&a1, &b0, &mut d1);
        ext.mul(&a1, &b1, &mut d2);

        let t: BigInt = BigInt::from(ctx.plain_modulus());
        let q: &BigInt = ctx.q_big(level);

        [d0, d1, d2]
            .into_iter()
            .map(|mut d| {
                ext.intt_inplace::<false>(&mut d);
                let mut coeffs: Vec<BigInt> = vec![BigInt::default(); n];
                ext.to_bigint_inplace(&d, &mut coeffs);
                coeffs
                    .iter_mut()
                    .for_each(|c| *c = (&*c * &t).div_round(q));
                let mut out: PolyRNS<u64> = rr.new_polyrns();
                rr.from_bigint_inplace(&coeffs, &mut out);
                out
            })
            .collect()
    }

    // ---- preconditions ----------------------------------------------

    fn check_ct(&self, a: &Ciphertext) -> Result<()> {
        if a.parms_id != self.ctx.parms_id() {
            return Err(Error::InvalidParameters(
                "ciphertext belongs to another parameter set".to_string(),
            ));
        }
        Ok(())
    }

    fn check_pt(&self, pt: &Plaintext) -> Result<()> {
        if pt.parms_id != self.ctx.parms_id() {
            return Err(Error::InvalidParameters(
                "plaintext belongs to another parameter set".to_string(),
            ));
        }
        Ok(())
    }

    fn check_canonical(&self, a: &Ciphertext) -> Result<()> {
        if a.size() != 2 {
            return Err(Error::SizeMismatch {
                given: a.size(),
                required: 2,
            });
        }
        Ok(())
    }

    /// Operands of a binary operation must share the parameter set, the
    /// canonical form, the level and, scheme depending, the scale or
    /// correction factor. Nothing is auto-aligned.
    fn check_binary(&self, a: &Ciphertext, b: &Ciphertext) -> Result<()> {
        self.check_ct(a)?;
        self.check_ct(b)?;
        self.check_canonical(a)?;
        self.check_canonical(b)?;
        if a.level != b.level {
            return Err(Error::LevelMismatch {
                lhs: a.level,
                rhs: b.level,
            });
        }
        match self.ctx.scheme() {
            SchemeType::Ckks => {
                if !scales_close(a.scale, b.scale) {
                    return Err(Error::ScaleMismatch {
                        lhs: a.scale,
                        rhs: b.scale,
                    });
                }
            }
            SchemeType::Bgv => {
                if a.correction_factor != b.correction_factor {
                    return Err(Error::ScaleMismatch {
                        lhs: a.correction_factor as f64,
                        rhs: b.correction_factor as f64,
                    });
                }
            }
            SchemeType::Bfv => {}
        }
        Ok(())
    }

    fn check_scale_bound(&self, scale: f64, level: usize) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidScale(scale));
        }
        let q_bits: u64 = self.ctx.q_big(level).bits();
        if scale.log2() >= q_bits as f64 {
            return Err(Error::InvalidScale(scale));
        }
        Ok(())
    }
}

fn scales_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= a.max(b) * SCALE_TOLERANCE
}

fn center_mod(m: &Poly<u64>, t: u64) -> Vec<i64> {
    let half: u64 = t >> 1;
    m.0.iter()
        .map(|&v| {
            if v > half {
                v as i64 - t as i64
            } else {
                v as i64
            }
        })
        .collect()
}
