use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keys::SecretKey;
use crate::parameters::{mul_mod_u64, Context, SchemeType};
use crate::plaintext::{Plaintext, PlaintextRepr};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use rns::num_bigint::Div;
use rns::poly::{Poly, PolyRNS};
use rns::ring::RingRNS;

use std::sync::Arc;

/// Decrypts ciphertexts under the secret key. An exhausted noise
/// budget is not detected here: decryption then simply returns garbage,
/// by design.
pub struct Decryptor {
    ctx: Arc<Context>,
    sk: SecretKey,
}

impl Decryptor {
    pub fn new(ctx: &Arc<Context>, sk: &SecretKey) -> Result<Self> {
        if sk.parms_id != ctx.parms_id() {
            return Err(Error::KeyMismatch);
        }
        Ok(Self {
            ctx: ctx.clone(),
            sk: sk.clone(),
        })
    }

    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        let ctx = &self.ctx;
        if ct.parms_id != ctx.parms_id() {
            return Err(Error::KeyMismatch);
        }

        let x: PolyRNS<u64> = self.dot_with_secret_powers(ct);

        match ctx.scheme() {
            SchemeType::Bfv => {
                // m = round(t * x / Q) mod t
                let rr: RingRNS<u64> = ctx.ring_rns(ct.level);
                let mut coeffs: Vec<BigInt> = vec![BigInt::default(); ctx.n()];
                rr.to_bigint_inplace(&x, &mut coeffs);
                let t: BigInt = BigInt::from(ctx.plain_modulus());
                let q: &BigInt = ctx.q_big(ct.level);
                let mut m: Poly<u64> = Poly::new(ctx.n());
                for (c, out) in coeffs.iter().zip(m.0.iter_mut()) {
                    let scaled: BigInt = (c * &t).div_round(q);
                    *out = scaled.mod_floor(&t).to_u64().unwrap();
                }
                Ok(Plaintext {
                    repr: PlaintextRepr::Coeffs(m),
                    scale: 1.0,
                    parms_id: ctx.parms_id(),
                })
            }
            SchemeType::Bgv => {
                // m = ([x]_Q mod t) * correction_factor mod t
                let rr: RingRNS<u64> = ctx.ring_rns(ct.level);
                let mut coeffs: Vec<BigInt> = vec![BigInt::default(); ctx.n()];
                rr.to_bigint_inplace(&x, &mut coeffs);
                let t: u64 = ctx.plain_modulus();
                let t_big: BigInt = BigInt::from(t);
                let cf: u64 = ct.correction_factor;
                let mut m: Poly<u64> = Poly::new(ctx.n());
                for (c, out) in coeffs.iter().zip(m.0.iter_mut()) {
                    let reduced: u64 = c.mod_floor(&t_big).to_u64().unwrap();
                    *out = mul_mod_u64(reduced, cf, t);
                }
                Ok(Plaintext {
                    repr: PlaintextRepr::Coeffs(m),
                    scale: 1.0,
                    parms_id: ctx.parms_id(),
                })
            }
            SchemeType::Ckks => Ok(Plaintext {
                repr: PlaintextRepr::Rns {
                    polys: x,
                    level: ct.level,
                },
                scale: ct.scale,
                parms_id: ctx.parms_id(),
            }),
        }
    }

    /// Remaining headroom, in bits, before the accumulated noise
    /// corrupts decryption. 0 means correctness is no longer
    /// guaranteed. Integer schemes only.
    pub fn invariant_noise_budget(&self, ct: &Ciphertext) -> Result<u32> {
        let ctx = &self.ctx;
        if ct.parms_id != ctx.parms_id() {
            return Err(Error::KeyMismatch);
        }
        if ctx.scheme() == SchemeType::Ckks {
            return Err(Error::InvalidParameters(
                "the noise budget is defined for the integer schemes only".to_string(),
            ));
        }

        let x: PolyRNS<u64> = self.dot_with_secret_powers(ct);
        let rr: RingRNS<u64> = ctx.ring_rns(ct.level);
        let mut coeffs: Vec<BigInt> = vec![BigInt::default(); ctx.n()];
        rr.to_bigint_inplace(&x, &mut coeffs);

        let q: &BigInt = ctx.q_big(ct.level);
        let q_half: BigInt = q >> 1;
        let t: BigInt = BigInt::from(ctx.plain_modulus());

        // BFV: noise = [t * (c0 + c1*s)]_Q centered. BGV: the whole
        // payload m + t*e must stay below Q/2.
        let mut max_noise: BigInt = BigInt::zero();
        for c in coeffs.iter() {
            let w: BigInt = match ctx.scheme() {
                SchemeType::Bfv => {
                    let mut w: BigInt = (c * &t).mod_floor(q);
                    if w > q_half {
                        w -= q;
                    }
                    w
                }
                _ => c.clone(),
            };
            let w_abs: BigInt = w.abs();
            if w_abs > max_noise {
                max_noise = w_abs;
            }
        }

        let q_bits: i64 = q.bits() as i64;
        let noise_bits: i64 = max_noise.bits() as i64;
        Ok((q_bits - 1 - (noise_bits + 1)).max(0) as u32)
    }

    /// x = c0 + c1*s + c2*s^2 + ... over the data chain at the
    /// ciphertext's level.
    fn dot_with_secret_powers(&self, ct: &Ciphertext) -> PolyRNS<u64> {
        let ctx = &self.ctx;
        let rr: RingRNS<u64> = ctx.ring_rns(ct.level);
        let mut x: PolyRNS<u64> = rr.new_polyrns();
        for (i, ring) in rr.0.iter().enumerate() {
            let mut s_ntt: Poly<u64> = ring.new_poly();
            ring.ntt::<false>(self.sk.s.at(i), &mut s_ntt);

            let mut acc: Poly<u64> = ring.new_poly();
            ring.ntt::<false>(ct.polys[0].at(i), &mut acc);

            let mut s_pow: Poly<u64> = s_ntt.clone();
            for k in 1..ct.polys.len() {
                let mut c_k: Poly<u64> = ring.new_poly();
                ring.ntt::<false>(ct.polys[k].at(i), &mut c_k);
                ring.mul_then_add_inplace(&c_k, &s_pow, &mut acc);
                if k + 1 < ct.polys.len() {
                    ring.mul_inplace(&s_ntt, &mut s_pow);
                }
            }
            ring.intt::<false>(&acc, x.at_mut(i));
        }
        x
    }
}
