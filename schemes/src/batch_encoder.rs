use crate::error::{Error, Result};
use crate::parameters::{Context, SchemeType};
use crate::plaintext::{Plaintext, PlaintextRepr};

use rns::poly::Poly;
use rns::ring::Ring;

use std::collections::HashMap;
use std::sync::Arc;

/// Packs n integer slots into one plaintext via the NTT over the plain
/// modulus. The slot layout is the 2 x (n/2) matrix whose rows are the
/// orbits of the generator 3, so that the Galois automorphisms realize
/// row rotation and row swap.
pub struct BatchEncoder {
    ctx: Arc<Context>,
    ring: Ring<u64>,
    index_map: Vec<usize>,
}

impl BatchEncoder {
    pub fn new(ctx: &Arc<Context>) -> Result<Self> {
        match ctx.scheme() {
            SchemeType::Bfv | SchemeType::Bgv => {}
            SchemeType::Ckks => {
                return Err(Error::InvalidParameters(
                    "batching is defined for the integer schemes only".to_string(),
                ))
            }
        }
        let n: usize = ctx.n();
        let t: u64 = ctx.plain_modulus();
        let nth_root: u64 = (n as u64) << 1;
        if !primality_test::is_prime(t) || t % nth_root != 1 {
            return Err(Error::InvalidParameters(format!(
                "batching requires a prime plain modulus congruent to 1 mod {}",
                nth_root
            )));
        }

        let ring: Ring<u64> = Ring::new(n, t);

        // Recover the NTT's evaluation order empirically: transforming
        // the monomial X yields the evaluation point of every output
        // index, and a discrete-log table over the 2n-th roots turns
        // those points into exponents.
        let mut x: Poly<u64> = ring.new_poly();
        x.0[1] = 1;
        ring.ntt_inplace::<false>(&mut x);

        let mut dlog: HashMap<u64, usize> = HashMap::with_capacity(2 * n);
        let mut power: u64 = 1;
        for k in 0..2 * n {
            dlog.insert(power, k);
            power = ring.modulus.mul_mod(power, ring.psi());
        }

        let mut position_of_exponent: HashMap<usize, usize> = HashMap::with_capacity(n);
        for (i, &value) in x.0.iter().enumerate() {
            let exponent: usize = dlog[&value];
            debug_assert!(exponent & 1 == 1);
            position_of_exponent.insert(exponent, i);
        }

        // Row 0 holds the orbit of 3, row 1 the orbit of -3.
        let m: usize = 2 * n;
        let mut index_map: Vec<usize> = vec![0; n];
        let mut g: usize = 1;
        for j in 0..n / 2 {
            index_map[j] = position_of_exponent[&g];
            index_map[j + n / 2] = position_of_exponent[&(m - g)];
            g = g * 3 % m;
        }

        Ok(Self {
            ctx: ctx.clone(),
            ring,
            index_map,
        })
    }

    /// One slot per coefficient.
    pub fn slot_count(&self) -> usize {
        self.ctx.n()
    }

    /// Packs up to n values, each below the plain modulus. Unfilled
    /// slots are zero. Exact round-trip with [BatchEncoder::decode].
    pub fn encode(&self, values: &[u64]) -> Result<Plaintext> {
        let n: usize = self.slot_count();
        if values.len() > n {
            return Err(Error::CapacityExceeded {
                given: values.len(),
                capacity: n,
            });
        }
        let t: u64 = self.ring.q();
        if let Some(&v) = values.iter().find(|&&v| v >= t) {
            return Err(Error::CapacityExceeded {
                given: v as usize,
                capacity: t as usize,
            });
        }

        let mut slots: Poly<u64> = self.ring.new_poly();
        for (j, &v) in values.iter().enumerate() {
            slots.0[self.index_map[j]] = v;
        }
        self.ring.intt_inplace::<false>(&mut slots);

        Ok(Plaintext {
            repr: PlaintextRepr::Coeffs(slots),
            scale: 1.0,
            parms_id: self.ctx.parms_id(),
        })
    }

    /// Packs signed values of magnitude at most (t-1)/2, reduced into
    /// the plaintext space.
    pub fn encode_signed(&self, values: &[i64]) -> Result<Plaintext> {
        let t: u64 = self.ring.q();
        let half: i64 = ((t - 1) / 2) as i64;
        if let Some(&v) = values.iter().find(|&&v| v.abs() > half) {
            return Err(Error::CapacityExceeded {
                given: v.unsigned_abs() as usize,
                capacity: half as usize,
            });
        }
        let unsigned: Vec<u64> = values
            .iter()
            .map(|&v| v.rem_euclid(t as i64) as u64)
            .collect();
        self.encode(&unsigned)
    }

    pub fn decode(&self, pt: &Plaintext) -> Result<Vec<u64>> {
        if pt.parms_id != self.ctx.parms_id() {
            return Err(Error::InvalidParameters(
                "plaintext belongs to another parameter set".to_string(),
            ));
        }
        let coeffs: &Poly<u64> = match &pt.repr {
            PlaintextRepr::Coeffs(p) => p,
            PlaintextRepr::Rns { .. } => {
                return Err(Error::InvalidParameters(
                    "plaintext is not in the batch representation".to_string(),
                ))
            }
        };

        let mut slots: Poly<u64> = self.ring.new_poly();
        self.ring.ntt::<false>(coeffs, &mut slots);
        Ok(self.index_map.iter().map(|&i| slots.0[i]).collect())
    }

    pub fn decode_signed(&self, pt: &Plaintext) -> Result<Vec<i64>> {
        let t: u64 = self.ring.q();
        let half: u64 = t >> 1;
        Ok(self
            .decode(pt)?
            .into_iter()
            .map(|v| {
                if v > half {
                    v as i64 - t as i64
                } else {
                    v as i64
                }
            })
            .collect())
    }
}
