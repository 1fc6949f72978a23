use crate::error::{Error, Result};
use crate::keys::{GaloisKeys, KeySwitchKey, PublicKey, RelinKeys, SecretKey};
use crate::parameters::{Context, SchemeType};

use rns::modulus::BARRETT;
use rns::poly::PolyRNS;
use rns::ring::{automorphism_index, RingRNS};
use sampling::distributions::{fill_normal, fill_ternary_prob, DEFAULT_SIGMA};
use sampling::source::{new_seed, Source};

use std::collections::BTreeMap;
use std::sync::Arc;

/// Noise samples are rejected beyond six standard deviations.
pub(crate) const NOISE_BOUND: f64 = 6.0 * DEFAULT_SIGMA;

/// Derives all key material for one parameter set from a single secret.
pub struct KeyGenerator {
    ctx: Arc<Context>,
    sk: SecretKey,
    source: Source,
}

impl KeyGenerator {
    /// Samples a fresh ternary secret key.
    pub fn new(ctx: &Arc<Context>) -> Self {
        let mut source: Source = Source::new(new_seed());
        let mut s_raw: Vec<i64> = vec![0i64; ctx.n()];
        fill_ternary_prob(&mut s_raw, 1.0 / 3.0, &mut source);

        let key_rr: RingRNS<u64> = ctx.key_ring_rns();
        let mut s: PolyRNS<u64> = key_rr.new_polyrns();
        key_rr.from_i64(&s_raw, &mut s);

        Self {
            ctx: ctx.clone(),
            sk: SecretKey {
                s,
                parms_id: ctx.parms_id(),
            },
            source,
        }
    }

    /// Reuses an existing secret key, e.g. to derive further rotation
    /// keys after the fact.
    pub fn with_secret_key(ctx: &Arc<Context>, sk: SecretKey) -> Result<Self> {
        if sk.parms_id != ctx.parms_id() {
            return Err(Error::KeyMismatch);
        }
        Ok(Self {
            ctx: ctx.clone(),
            sk,
            source: Source::new(new_seed()),
        })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.sk
    }

    /// A fresh encryption of zero under the secret key, over the data
    /// chain: (-(a*s + e), a).
    pub fn create_public_key(&mut self) -> PublicKey {
        let ctx = self.ctx.clone();
        let rr: RingRNS<u64> = ctx.ring_rns(0);

        let mut p1: PolyRNS<u64> = rr.new_polyrns();
        rr.fill_uniform(&mut self.source, &mut p1);

        // p0 = -(a*s) - e, limbwise through the NTT domain.
        let mut p0: PolyRNS<u64> = rr.new_polyrns();
        for (i, ring) in rr.0.iter().enumerate() {
            let mut a_ntt = ring.new_poly();
            ring.ntt::<false>(p1.at(i), &mut a_ntt);
            let mut s_ntt = ring.new_poly();
            ring.ntt::<false>(self.sk.s.at(i), &mut s_ntt);
            ring.mul_inplace(&s_ntt, &mut a_ntt);
            ring.intt_inplace::<false>(&mut a_ntt);
            ring.neg(&a_ntt, p0.at_mut(i));
        }

        let e: PolyRNS<u64> = self.sample_noise(&rr);
        rr.sub_inplace(&e, &mut p0);

        PublicKey {
            p0,
            p1,
            parms_id: ctx.parms_id(),
        }
    }

    /// Keys reducing s^2 back to s, enabling relinearization.
    pub fn create_relin_keys(&mut self) -> Result<RelinKeys> {
        let ctx = self.ctx.clone();
        if !ctx.using_keyswitching() {
            return Err(Error::InvalidParameters(
                "key switching requires at least two coefficient moduli".to_string(),
            ));
        }

        // target = s^2 over the full chain, in the NTT domain.
        let key_rr: RingRNS<u64> = ctx.key_ring_rns();
        let mut target: PolyRNS<u64> = key_rr.new_polyrns();
        for (i, ring) in key_rr.0.iter().enumerate() {
            let mut s_ntt = ring.new_poly();
            ring.ntt::<false>(self.sk.s.at(i), &mut s_ntt);
            let dst = target.at_mut(i);
            ring.mul(&s_ntt, &s_ntt, dst);
        }

        Ok(RelinKeys {
            key: self.generate_kswitch_key(&target),
            parms_id: ctx.parms_id(),
        })
    }

    /// Keys for the default rotation set: every power-of-two step plus
    /// the conjugation element.
    pub fn create_galois_keys(&mut self) -> Result<GaloisKeys> {
        let row_size: usize = self.ctx.n() >> 1;
        let mut elts: Vec<usize> = (0..row_size.ilog2())
            .map(|k| self.ctx.galois_elt_from_step(1i64 << k))
            .collect();
        elts.push(self.ctx.galois_elt_conjugate());
        self.create_galois_keys_for_elts(&elts)
    }

    /// Keys for caller-chosen rotation steps (single-hop rotations).
    pub fn create_galois_keys_for_steps(&mut self, steps: &[i64]) -> Result<GaloisKeys> {
        if steps.iter().any(|&s| s == 0) {
            return Err(Error::InvalidParameters(
                "rotation step 0 does not need a key".to_string(),
            ));
        }
        let elts: Vec<usize> = steps
            .iter()
            .map(|&s| self.ctx.galois_elt_from_step(s))
            .collect();
        self.create_galois_keys_for_elts(&elts)
    }

    fn create_galois_keys_for_elts(&mut self, elts: &[usize]) -> Result<GaloisKeys> {
        let ctx = self.ctx.clone();
        if !ctx.using_keyswitching() {
            return Err(Error::InvalidParameters(
                "key switching requires at least two coefficient moduli".to_string(),
            ));
        }

        let key_rr: RingRNS<u64> = ctx.key_ring_rns();
        let mut keys: BTreeMap<usize, KeySwitchKey> = BTreeMap::new();
        for &galois_elt in elts.iter() {
            if galois_elt & 1 == 0 || galois_elt >= 2 * ctx.n() {
                return Err(Error::InvalidParameters(format!(
                    "galois element {} is not an odd unit mod 2n",
                    galois_elt
                )));
            }
            if keys.contains_key(&galois_elt) {
                continue;
            }
            // target = s(X^galois_elt) over the full chain, NTT domain.
            let idx: Vec<usize> = automorphism_index(ctx.n(), galois_elt);
            let mut target: PolyRNS<u64> = key_rr.new_polyrns();
            key_rr.automorphism_from_index(&self.sk.s, &idx, &mut target);
            key_rr.ntt_inplace::<false>(&mut target);
            keys.insert(galois_elt, self.generate_kswitch_key(&target));
        }

        Ok(GaloisKeys {
            keys,
            parms_id: ctx.parms_id(),
        })
    }

    /// One gadget row per data limb: row i encrypts the target key
    /// scaled by the key modulus, embedded in limb i.
    fn generate_kswitch_key(&mut self, target_ntt: &PolyRNS<u64>) -> KeySwitchKey {
        let ctx = self.ctx.clone();
        let key_rr: RingRNS<u64> = ctx.key_ring_rns();
        let data_count: usize = ctx.data_count();
        let p_q: u64 = ctx.special_ring().q();

        // Secret key over the full chain in the NTT domain.
        let mut s_ntt: PolyRNS<u64> = key_rr.new_polyrns();
        key_rr.ntt::<false>(&self.sk.s, &mut s_ntt);

        let mut rows: Vec<(PolyRNS<u64>, PolyRNS<u64>)> = Vec::with_capacity(data_count);
        for i in 0..data_count {
            let mut a: PolyRNS<u64> = key_rr.new_polyrns();
            key_rr.fill_uniform(&mut self.source, &mut a);
            key_rr.ntt_inplace::<false>(&mut a);

            let mut e: PolyRNS<u64> = self.sample_noise(&key_rr);
            key_rr.ntt_inplace::<false>(&mut e);

            // b = -(a*s) - e
            let mut b: PolyRNS<u64> = key_rr.new_polyrns();
            key_rr.mul(&a, &s_ntt, &mut b);
            key_rr.add_inplace(&e, &mut b);
            key_rr.neg_inplace(&mut b);

            // b_i += (P mod q_i) * target_i
            let ring_i = key_rr.0[i];
            let p_mod_qi: u64 = ring_i.modulus.barrett.reduce::<BARRETT>(&p_q);
            let mut scaled = ring_i.new_poly();
            ring_i.mul_scalar(target_ntt.at(i), p_mod_qi, &mut scaled);
            ring_i.add_inplace(&scaled, b.at_mut(i));

            rows.push((b, a));
        }

        KeySwitchKey { rows }
    }

    /// Gaussian noise lifted into the chain; the integer schemes' BGV
    /// variant carries noise in the multiples of the plain modulus.
    fn sample_noise(&mut self, rr: &RingRNS<u64>) -> PolyRNS<u64> {
        let mut e_raw: Vec<i64> = vec![0i64; self.ctx.n()];
        fill_normal(&mut e_raw, DEFAULT_SIGMA, NOISE_BOUND, &mut self.source);
        let mut e: PolyRNS<u64> = rr.new_polyrns();
        rr.from_i64(&e_raw, &mut e);
        if self.ctx.scheme() == SchemeType::Bgv {
            let t: u64 = self.ctx.plain_modulus();
            for (i, ring) in rr.0.iter().enumerate() {
                ring.mul_scalar_inplace(t, e.at_mut(i));
            }
        }
        e
    }
}
