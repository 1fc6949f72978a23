use crate::error::{Error, Result};
use crate::parameters::{pow_mod_usize, Context, SchemeType};
use crate::plaintext::{Plaintext, PlaintextRepr};

use num_bigint::BigInt;
use num_complex::Complex64;
use num_traits::ToPrimitive;
use rns::modulus::WordOps;
use rns::poly::PolyRNS;
use rns::ring::RingRNS;

use std::sync::Arc;

/// Encodes vectors of up to n/2 complex values into scaled plaintext
/// polynomials through the canonical embedding. Slot j corresponds to
/// evaluation at the 2n-th root zeta^(5^j), so the Galois element 5^r
/// realizes a left rotation by r slots and 2n-1 realizes conjugation.
pub struct CkksEncoder {
    ctx: Arc<Context>,
    slots: usize,
    /// 5^j mod 2n, the slot orbit
    rot_group: Vec<usize>,
    /// exp(2*pi*i * j / 2n) for j in 0..=2n
    ksi_pows: Vec<Complex64>,
}

impl CkksEncoder {
    pub fn new(ctx: &Arc<Context>) -> Result<Self> {
        if ctx.scheme() != SchemeType::Ckks {
            return Err(Error::InvalidParameters(
                "the approximate encoder is defined for the ckks scheme only".to_string(),
            ));
        }
        let n: usize = ctx.n();
        let m: usize = 2 * n;
        let slots: usize = n >> 1;

        let rot_group: Vec<usize> = (0..slots)
            .map(|j| pow_mod_usize(5, j as u64, m as u64))
            .collect();

        let angle: f64 = 2.0 * std::f64::consts::PI / m as f64;
        let ksi_pows: Vec<Complex64> = (0..=m)
            .map(|j| Complex64::new((angle * j as f64).cos(), (angle * j as f64).sin()))
            .collect();

        Ok(Self {
            ctx: ctx.clone(),
            slots,
            rot_group,
            ksi_pows,
        })
    }

    /// Half the degree: the complex packing uses conjugate symmetry.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn encode(&self, values: &[f64], scale: f64) -> Result<Plaintext> {
        let complex: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.encode_complex(&complex, scale)
    }

    /// Round-trip error is bounded by the rounding noise, on the order
    /// of 1/scale per slot.
    pub fn encode_complex(&self, values: &[Complex64], scale: f64) -> Result<Plaintext> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidScale(scale));
        }
        if values.len() > self.slots {
            return Err(Error::CapacityExceeded {
                given: values.len(),
                capacity: self.slots,
            });
        }

        let mut vals: Vec<Complex64> = vec![Complex64::new(0.0, 0.0); self.slots];
        vals[..values.len()].copy_from_slice(values);
        self.embed_inv(&mut vals);

        // Real and imaginary parts land in the low and high coefficient
        // halves; scaled coefficients must stay well inside an i64.
        let bound: f64 = (1u64 << 62) as f64;
        let mut coeffs: Vec<i64> = vec![0i64; self.ctx.n()];
        for (i, v) in vals.iter().enumerate() {
            let re: f64 = (v.re * scale).round();
            let im: f64 = (v.im * scale).round();
            if re.abs() >= bound || im.abs() >= bound {
                return Err(Error::InvalidScale(scale));
            }
            coeffs[i] = re as i64;
            coeffs[i + self.slots] = im as i64;
        }

        let rr: RingRNS<u64> = self.ctx.ring_rns(0);
        let mut polys: PolyRNS<u64> = rr.new_polyrns();
        rr.from_i64(&coeffs, &mut polys);

        Ok(Plaintext {
            repr: PlaintextRepr::Rns { polys, level: 0 },
            scale,
            parms_id: self.ctx.parms_id(),
        })
    }

    /// Returns all n/2 slots; callers keep the prefix they encoded.
    pub fn decode(&self, pt: &Plaintext) -> Result<Vec<Complex64>> {
        if pt.parms_id != self.ctx.parms_id() {
            return Err(Error::InvalidParameters(
                "plaintext belongs to another parameter set".to_string(),
            ));
        }
        let (polys, level) = match &pt.repr {
            PlaintextRepr::Rns { polys, level } => (polys, *level),
            PlaintextRepr::Coeffs(_) => {
                return Err(Error::InvalidParameters(
                    "plaintext is not in the approximate representation".to_string(),
                ))
            }
        };
        if !pt.scale.is_finite() || pt.scale <= 0.0 {
            return Err(Error::InvalidScale(pt.scale));
        }

        let rr: RingRNS<u64> = self.ctx.ring_rns(level);
        let mut coeffs: Vec<BigInt> = vec![BigInt::default(); self.ctx.n()];
        rr.to_bigint_inplace(polys, &mut coeffs);

        let mut vals: Vec<Complex64> = (0..self.slots)
            .map(|i| {
                Complex64::new(
                    coeffs[i].to_f64().unwrap_or(f64::MAX) / pt.scale,
                    coeffs[i + self.slots].to_f64().unwrap_or(f64::MAX) / pt.scale,
                )
            })
            .collect();
        self.embed(&mut vals);
        Ok(vals)
    }

    /// Coefficient domain to slot values: evaluation at the slot orbit
    /// roots, as a special FFT over the group generated by 5.
    fn embed(&self, vals: &mut [Complex64]) {
        let m: usize = 2 * self.ctx.n();
        let size: usize = vals.len();
        bit_reverse(vals);
        let mut len: usize = 2;
        while len <= size {
            let lenh: usize = len >> 1;
            let lenq: usize = len << 2;
            let gap: usize = m / lenq;
            for i in (0..size).step_by(len) {
                for j in 0..lenh {
                    let idx: usize = (self.rot_group[j] % lenq) * gap;
                    let u: Complex64 = vals[i + j];
                    let v: Complex64 = vals[i + j + lenh] * self.ksi_pows[idx];
                    vals[i + j] = u + v;
                    vals[i + j + lenh] = u - v;
                }
            }
            len <<= 1;
        }
    }

    /// Slot values to coefficient domain: the inverse special FFT,
    /// including the 1/slots normalization.
    fn embed_inv(&self, vals: &mut [Complex64]) {
        let m: usize = 2 * self.ctx.n();
        let size: usize = vals.len();
        let mut len: usize = size;
        while len >= 2 {
            let lenh: usize = len >> 1;
            let lenq: usize = len << 2;
            let gap: usize = m / lenq;
            for i in (0..size).step_by(len) {
                for j in 0..lenh {
                    let idx: usize = (lenq - (self.rot_group[j] % lenq)) % lenq * gap;
                    let u: Complex64 = vals[i + j] + vals[i + j + lenh];
                    let v: Complex64 = (vals[i + j] - vals[i + j + lenh]) * self.ksi_pows[idx];
                    vals[i + j] = u;
                    vals[i + j + lenh] = v;
                }
            }
            len >>= 1;
        }
        bit_reverse(vals);
        let inv: f64 = 1.0 / size as f64;
        vals.iter_mut().for_each(|v| *v *= inv);
    }
}

fn bit_reverse(vals: &mut [Complex64]) {
    let n: usize = vals.len();
    let log_n: u32 = n.log2() as u32;
    for i in 0..n {
        let j: usize = i.reverse_bits_msb(log_n);
        if i < j {
            vals.swap(i, j);
        }
    }
}
