use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::key_generator::NOISE_BOUND;
use crate::keys::PublicKey;
use crate::parameters::{Context, SchemeType};
use crate::plaintext::{Plaintext, PlaintextRepr};

use rns::poly::{Poly, PolyRNS};
use rns::ring::RingRNS;
use sampling::distributions::{fill_normal, fill_ternary_prob, DEFAULT_SIGMA};
use sampling::source::{new_seed, Source};

use std::sync::Arc;

/// Encrypts plaintexts under a public key. Fresh ciphertexts start at
/// level 0 with the maximum noise budget unless a deeper starting
/// level is requested.
pub struct Encryptor {
    ctx: Arc<Context>,
    pk: PublicKey,
    source: Source,
}

impl Encryptor {
    pub fn new(ctx: &Arc<Context>, pk: &PublicKey) -> Result<Self> {
        if pk.parms_id != ctx.parms_id() {
            return Err(Error::KeyMismatch);
        }
        Ok(Self {
            ctx: ctx.clone(),
            pk: pk.clone(),
            source: Source::new(new_seed()),
        })
    }

    pub fn encrypt(&mut self, pt: &Plaintext) -> Result<Ciphertext> {
        self.encrypt_at_level(pt, 0)
    }

    /// Encrypts at a caller-specified starting level of the chain.
    pub fn encrypt_at_level(&mut self, pt: &Plaintext, level: usize) -> Result<Ciphertext> {
        let ctx = self.ctx.clone();
        if level > ctx.max_level() {
            return Err(Error::InvalidParameters(format!(
                "level {} beyond the last level {}",
                level,
                ctx.max_level()
            )));
        }
        if pt.parms_id != ctx.parms_id() {
            return Err(Error::InvalidParameters(
                "plaintext belongs to another parameter set".to_string(),
            ));
        }

        let rr: RingRNS<u64> = ctx.ring_rns(level);

        // (c0, c1) = (pk0*u + e0, pk1*u + e1), an encryption of zero.
        let mut u_raw: Vec<i64> = vec![0i64; ctx.n()];
        fill_ternary_prob(&mut u_raw, 1.0 / 3.0, &mut self.source);
        let mut u: PolyRNS<u64> = rr.new_polyrns();
        rr.from_i64(&u_raw, &mut u);
        rr.ntt_inplace::<false>(&mut u);

        let mut c0: PolyRNS<u64> = rr.new_polyrns();
        let mut c1: PolyRNS<u64> = rr.new_polyrns();
        for (i, ring) in rr.0.iter().enumerate() {
            let mut tmp: Poly<u64> = ring.new_poly();
            ring.ntt::<false>(self.pk.p0.at(i), &mut tmp);
            ring.mul_inplace(u.at(i), &mut tmp);
            ring.intt::<false>(&tmp, c0.at_mut(i));

            ring.ntt::<false>(self.pk.p1.at(i), &mut tmp);
            ring.mul_inplace(u.at(i), &mut tmp);
            ring.intt::<false>(&tmp, c1.at_mut(i));
        }

        let e0: PolyRNS<u64> = self.sample_noise(&rr);
        let e1: PolyRNS<u64> = self.sample_noise(&rr);
        rr.add_inplace(&e0, &mut c0);
        rr.add_inplace(&e1, &mut c1);

        let mut scale: f64 = 1.0;
        match (ctx.scheme(), &pt.repr) {
            (SchemeType::Bfv, PlaintextRepr::Coeffs(m)) => {
                // c0 += Delta * m with m lifted from its centered
                // representative mod t.
                let m_centered: Vec<i64> = self.center_plain(m);
                let delta: &[u64] = ctx.delta_mod_qi(level);
                for (i, ring) in rr.0.iter().enumerate() {
                    let mut m_i: Poly<u64> = ring.new_poly();
                    ring.from_i64(&m_centered, &mut m_i);
                    ring.mul_scalar_inplace(delta[i], &mut m_i);
                    ring.add_inplace(&m_i, c0.at_mut(i));
                }
            }
            (SchemeType::Bgv, PlaintextRepr::Coeffs(m)) => {
                let m_centered: Vec<i64> = self.center_plain(m);
                let mut m_rns: PolyRNS<u64> = rr.new_polyrns();
                rr.from_i64(&m_centered, &mut m_rns);
                rr.add_inplace(&m_rns, &mut c0);
            }
            (SchemeType::Ckks, PlaintextRepr::Rns { polys, level: pt_level }) => {
                if *pt_level != level {
                    return Err(Error::LevelMismatch {
                        lhs: *pt_level,
                        rhs: level,
                    });
                }
                rr.add_inplace(polys, &mut c0);
                scale = pt.scale;
            }
            _ => {
                return Err(Error::InvalidParameters(
                    "plaintext representation does not match the scheme".to_string(),
                ));
            }
        }

        Ok(Ciphertext {
            polys: vec![c0, c1],
            level,
            scale,
            correction_factor: 1,
            parms_id: ctx.parms_id(),
        })
    }

    fn center_plain(&self, m: &Poly<u64>) -> Vec<i64> {
        let t: u64 = self.ctx.plain_modulus();
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

    /// Fresh Gaussian noise; the BGV variant carries it in the
    /// multiples of the plain modulus.
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
