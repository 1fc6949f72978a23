use crate::error::{Error, Result};

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rns::modulus::prime::NTTFriendlyPrimesGenerator;
use rns::ring::{Ring, RingRNS};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The closed set of supported schemes; every downstream component
/// dispatches on this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeType {
    Bfv,
    Bgv,
    Ckks,
}

impl SchemeType {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            SchemeType::Bfv => 1,
            SchemeType::Bgv => 2,
            SchemeType::Ckks => 3,
        }
    }
}

/// The parameter literal handed to [Context::new]. For CKKS the plain
/// modulus must be 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionParameters {
    pub scheme: SchemeType,
    pub poly_modulus_degree: usize,
    pub coeff_modulus: Vec<u64>,
    pub plain_modulus: u64,
}

/// Maximum total coefficient-modulus bits per degree for 128-bit
/// classical security (HE standard).
fn max_coeff_modulus_bits(degree: usize) -> Option<u32> {
    match degree {
        1024 => Some(27),
        2048 => Some(54),
        4096 => Some(109),
        8192 => Some(218),
        16384 => Some(438),
        32768 => Some(881),
        _ => None,
    }
}

pub mod modulus_chain {
    use super::*;

    /// Generates distinct NTT-friendly primes (q = 1 mod 2*degree) of
    /// the requested bit sizes, scanning downward from each power of
    /// two, in the order the sizes are given.
    pub fn create(degree: usize, bit_sizes: &[usize]) -> Result<Vec<u64>> {
        if degree < 1024 || !degree.is_power_of_two() {
            return Err(Error::InvalidParameters(format!(
                "degree {} is not a supported power of two",
                degree
            )));
        }
        if bit_sizes.is_empty() {
            return Err(Error::InvalidParameters("empty bit-size list".to_string()));
        }
        if bit_sizes.iter().any(|&b| b < 20 || b > 60) {
            return Err(Error::InvalidParameters(
                "prime bit sizes must lie in [20, 60]".to_string(),
            ));
        }

        let nth_root: u64 = (degree as u64) << 1;
        let mut generators: std::collections::BTreeMap<usize, NTTFriendlyPrimesGenerator> =
            std::collections::BTreeMap::new();
        let mut chain: Vec<u64> = Vec::with_capacity(bit_sizes.len());
        for &bits in bit_sizes.iter() {
            let generator = generators
                .entry(bits)
                .or_insert_with(|| NTTFriendlyPrimesGenerator::new(bits as u64, nth_root));
            match generator.next_downstream_prime() {
                Some(q) => chain.push(q),
                None => {
                    return Err(Error::InvalidParameters(format!(
                        "not enough {}-bit primes congruent to 1 mod {}",
                        bits, nth_root
                    )))
                }
            }
        }
        Ok(chain)
    }

    /// The default BFV/BGV coefficient-modulus chain per degree, sized
    /// to the 128-bit security ceiling.
    pub fn bfv_default(degree: usize) -> Result<Vec<u64>> {
        let bit_sizes: &[usize] = match degree {
            1024 => &[27],
            2048 => &[54],
            4096 => &[36, 36, 37],
            8192 => &[43, 43, 44, 44, 44],
            16384 => &[48, 48, 48, 49, 49, 49, 49, 49, 49],
            32768 => &[55; 16],
            _ => {
                return Err(Error::InvalidParameters(format!(
                    "no default chain for degree {}",
                    degree
                )))
            }
        };
        create(degree, bit_sizes)
    }
}

/// A validated, frozen parameter set with every precomputation the
/// downstream components consume. Shared read-only behind an Arc.
pub struct Context {
    scheme: SchemeType,
    n: usize,
    moduli: Vec<u64>,
    plain_modulus: u64,
    rings: Vec<Ring<u64>>,
    /// rings[..data_count] form the data chain; with more than one
    /// modulus the last ring is the key-switching modulus.
    data_count: usize,
    /// extension basis for the BFV tensor product
    aux_rings: Vec<Ring<u64>>,
    parms_id: u64,
    /// product of the data primes still in the chain, per level
    q_big: Vec<BigInt>,
    /// BFV only: floor(Q_level / t) mod q_i, per level
    delta_mod_qi: Vec<Vec<u64>>,
}

impl Context {
    pub fn new(params: &EncryptionParameters) -> Result<Context> {
        let n: usize = params.poly_modulus_degree;
        if n < 1024 || n > 32768 || !n.is_power_of_two() {
            return Err(Error::InvalidParameters(format!(
                "degree {} is not a power of two in [1024, 32768]",
                n
            )));
        }

        let moduli: &[u64] = &params.coeff_modulus;
        if moduli.is_empty() {
            return Err(Error::InvalidParameters(
                "empty coefficient modulus chain".to_string(),
            ));
        }

        let nth_root: u64 = (n as u64) << 1;
        let mut total_bits: u32 = 0;
        for (i, &q) in moduli.iter().enumerate() {
            if q <= 2 || q.ilog2() + 1 > 61 {
                return Err(Error::InvalidParameters(format!(
                    "coefficient modulus {} out of range",
                    q
                )));
            }
            if !primality_test::is_prime(q) {
                return Err(Error::InvalidParameters(format!(
                    "coefficient modulus {} is not prime",
                    q
                )));
            }
            if q % nth_root != 1 {
                return Err(Error::InvalidParameters(format!(
                    "coefficient modulus {} is not 1 mod {}",
                    q, nth_root
                )));
            }
            if moduli[..i].contains(&q) {
                return Err(Error::InvalidParameters(format!(
                    "duplicate coefficient modulus {}",
                    q
                )));
            }
            total_bits += q.ilog2() + 1;
        }

        let max_bits: u32 = max_coeff_modulus_bits(n).unwrap();
        if total_bits > max_bits {
            return Err(Error::InvalidParameters(format!(
                "total modulus size {} bits exceeds the {}-bit budget for degree {}",
                total_bits, max_bits, n
            )));
        }

        let t: u64 = params.plain_modulus;
        match params.scheme {
            SchemeType::Bfv | SchemeType::Bgv => {
                if t < 2 {
                    return Err(Error::InvalidParameters(format!(
                        "plain modulus {} out of range",
                        t
                    )));
                }
                if moduli.contains(&t) {
                    return Err(Error::InvalidParameters(
                        "plain modulus collides with the coefficient modulus chain".to_string(),
                    ));
                }
                if t >= moduli[0] {
                    return Err(Error::InvalidParameters(format!(
                        "plain modulus {} leaves no room under the first modulus {}",
                        t, moduli[0]
                    )));
                }
            }
            SchemeType::Ckks => {
                if t != 0 {
                    return Err(Error::InvalidParameters(
                        "plain modulus must be 0 for the ckks scheme".to_string(),
                    ));
                }
            }
        }

        let data_count: usize = if moduli.len() > 1 {
            moduli.len() - 1
        } else {
            1
        };

        let rings: Vec<Ring<u64>> = moduli.iter().map(|&q| Ring::new(n, q)).collect();

        // Per-level chain metadata. Level l keeps data limbs 0..data_count-l.
        let mut q_big: Vec<BigInt> = Vec::with_capacity(data_count);
        let mut delta_mod_qi: Vec<Vec<u64>> = Vec::with_capacity(data_count);
        for level in 0..data_count {
            let limbs: usize = data_count - level;
            let mut q: BigInt = BigInt::from(1);
            for ring in rings[..limbs].iter() {
                q *= BigInt::from(ring.q());
            }
            if params.scheme == SchemeType::Bfv {
                let delta: BigInt = &q / BigInt::from(t);
                let delta_residues: Vec<u64> = rings[..limbs]
                    .iter()
                    .map(|ring| (&delta % BigInt::from(ring.q())).to_u64().unwrap())
                    .collect();
                delta_mod_qi.push(delta_residues);
            }
            q_big.push(q);
        }

        let aux_rings: Vec<Ring<u64>> = if params.scheme == SchemeType::Bfv {
            Self::build_aux_basis(n, moduli, t, q_big[0].bits() as usize)?
        } else {
            Vec::new()
        };

        let mut hasher: DefaultHasher = DefaultHasher::new();
        params.scheme.to_u8().hash(&mut hasher);
        n.hash(&mut hasher);
        moduli.hash(&mut hasher);
        t.hash(&mut hasher);
        let parms_id: u64 = hasher.finish();

        Ok(Context {
            scheme: params.scheme,
            n,
            moduli: moduli.to_vec(),
            plain_modulus: t,
            rings,
            data_count,
            aux_rings,
            parms_id,
            q_big,
            delta_mod_qi,
        })
    }

    /// The BFV tensor product lifts operands to a basis large enough to
    /// hold n * (Q/2)^2 exactly before the t/Q scaling.
    fn build_aux_basis(
        n: usize,
        moduli: &[u64],
        t: u64,
        q_bits: usize,
    ) -> Result<Vec<Ring<u64>>> {
        let aux_bits: usize = 50;
        let needed: usize = q_bits + n.ilog2() as usize + 2;
        let count: usize = needed.div_ceil(aux_bits);
        let mut generator: NTTFriendlyPrimesGenerator =
            NTTFriendlyPrimesGenerator::new(aux_bits as u64, (n as u64) << 1);
        let mut aux: Vec<u64> = Vec::with_capacity(count);
        while aux.len() < count {
            match generator.next_downstream_prime() {
                Some(q) if !moduli.contains(&q) && q != t => aux.push(q),
                Some(_) => {}
                None => {
                    return Err(Error::InvalidParameters(
                        "not enough auxiliary primes for the multiplication basis".to_string(),
                    ))
                }
            }
        }
        Ok(aux.into_iter().map(|q| Ring::new(n, q)).collect())
    }

    #[inline(always)]
    pub fn scheme(&self) -> SchemeType {
        self.scheme
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn poly_modulus_degree(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    pub fn coeff_modulus(&self) -> &[u64] {
        &self.moduli
    }

    #[inline(always)]
    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }

    /// The deepest level a ciphertext can reach.
    #[inline(always)]
    pub fn max_level(&self) -> usize {
        self.data_count - 1
    }

    /// Number of data limbs alive at the given level.
    #[inline(always)]
    pub fn limbs(&self, level: usize) -> usize {
        debug_assert!(level <= self.max_level());
        self.data_count - level
    }

    pub(crate) fn data_count(&self) -> usize {
        self.data_count
    }

    /// True when the chain carries a dedicated key-switching modulus.
    pub fn using_keyswitching(&self) -> bool {
        self.moduli.len() > 1
    }

    /// The data chain at the given level.
    pub(crate) fn ring_rns(&self, level: usize) -> RingRNS<'_, u64> {
        RingRNS::new(&self.rings[..self.limbs(level)])
    }

    /// The full chain (data + key modulus), used by key material.
    pub(crate) fn key_ring_rns(&self) -> RingRNS<'_, u64> {
        RingRNS::new(&self.rings)
    }

    /// The mixed basis used while switching keys at the given level:
    /// the live data limbs followed by the key modulus.
    pub(crate) fn keyswitch_ring_rns(&self, level: usize) -> RingRNS<'_, u64> {
        debug_assert!(self.using_keyswitching());
        let mut refs: Vec<&Ring<u64>> = self.rings[..self.limbs(level)].iter().collect();
        refs.push(&self.rings[self.moduli.len() - 1]);
        RingRNS::from_refs(refs)
    }

    pub(crate) fn ring_at(&self, i: usize) -> &Ring<u64> {
        &self.rings[i]
    }

    pub(crate) fn special_ring(&self) -> &Ring<u64> {
        &self.rings[self.moduli.len() - 1]
    }

    pub(crate) fn aux_rings(&self) -> &[Ring<u64>] {
        &self.aux_rings
    }

    pub(crate) fn q_big(&self, level: usize) -> &BigInt {
        &self.q_big[level]
    }

    pub(crate) fn delta_mod_qi(&self, level: usize) -> &[u64] {
        &self.delta_mod_qi[level]
    }

    /// The Galois element realizing a slot rotation by the given step:
    /// g^step mod 2n, with g = 3 for the batched integer schemes and
    /// g = 5 for the approximate scheme's slot orbit.
    pub(crate) fn galois_elt_from_step(&self, step: i64) -> usize {
        let generator: u64 = match self.scheme {
            SchemeType::Bfv | SchemeType::Bgv => 3,
            SchemeType::Ckks => 5,
        };
        let row_size: i64 = (self.n as i64) >> 1;
        let step: u64 = step.rem_euclid(row_size) as u64;
        pow_mod_usize(generator, step, (self.n as u64) << 1)
    }

    /// The Galois element realizing complex conjugation (CKKS) or the
    /// row swap (BFV/BGV).
    pub(crate) fn galois_elt_conjugate(&self) -> usize {
        2 * self.n - 1
    }
}

/// Square-and-multiply modulo a power of two (the Galois group order
/// 2n), where Montgomery arithmetic does not apply.
pub(crate) fn pow_mod_usize(base: u64, exponent: u64, modulus: u64) -> usize {
    debug_assert!(modulus.is_power_of_two());
    let mask: u64 = modulus - 1;
    let mut result: u64 = 1;
    let mut base: u64 = base & mask;
    let mut exponent: u64 = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.wrapping_mul(base) & mask;
        }
        base = base.wrapping_mul(base) & mask;
        exponent >>= 1;
    }
    result as usize
}

/// Extended-Euclid inverse of a mod m, for coprime operands.
pub(crate) fn inv_mod_u64(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient: i128 = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}

pub(crate) fn mul_mod_u64(a: u64, b: u64, m: u64) -> u64 {
    (a as u128 * b as u128 % m as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfv_default_chain_is_ntt_friendly() {
        let chain: Vec<u64> = modulus_chain::bfv_default(4096).unwrap();
        assert_eq!(chain.len(), 3);
        for &q in chain.iter() {
            assert_eq!(q % 8192, 1);
        }
        assert_eq!(chain[0].ilog2() + 1, 36);
        assert_eq!(chain[2].ilog2() + 1, 37);
    }

    #[test]
    fn context_rejects_bad_degree() {
        let params = EncryptionParameters {
            scheme: SchemeType::Bfv,
            poly_modulus_degree: 3000,
            coeff_modulus: vec![1032193],
            plain_modulus: 17,
        };
        assert!(matches!(
            Context::new(&params),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn context_rejects_oversized_chain() {
        let chain: Vec<u64> = modulus_chain::create(1024, &[27, 27]).unwrap();
        let params = EncryptionParameters {
            scheme: SchemeType::Ckks,
            poly_modulus_degree: 1024,
            coeff_modulus: chain,
            plain_modulus: 0,
        };
        assert!(matches!(
            Context::new(&params),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn context_freezes_chain_metadata() {
        let chain: Vec<u64> = modulus_chain::bfv_default(4096).unwrap();
        let params = EncryptionParameters {
            scheme: SchemeType::Bfv,
            poly_modulus_degree: 4096,
            coeff_modulus: chain,
            plain_modulus: 1032193,
        };
        let ctx: Context = Context::new(&params).unwrap();
        assert_eq!(ctx.max_level(), 1);
        assert_eq!(ctx.limbs(0), 2);
        assert_eq!(ctx.limbs(1), 1);
        assert!(ctx.using_keyswitching());
        assert!(!ctx.aux_rings().is_empty());
        assert!(ctx.q_big(1) < ctx.q_big(0));
    }

    #[test]
    fn inv_mod_is_an_inverse() {
        let t: u64 = 1032193;
        for &a in [2u64, 3, 65537, 999999].iter() {
            let inv: u64 = inv_mod_u64(a % t, t).unwrap();
            assert_eq!(mul_mod_u64(a % t, inv, t), 1);
        }
        assert!(inv_mod_u64(0, t).is_none());
    }

    #[test]
    fn galois_elements_are_odd(){
        let chain: Vec<u64> = modulus_chain::bfv_default(4096).unwrap();
        let ctx: Context = Context::new(&EncryptionParameters {
            scheme: SchemeType::Bgv,
            poly_modulus_degree: 4096,
            coeff_modulus: chain,
            plain_modulus: 1032193,
        })
        .unwrap();
        for step in [1i64, 2, 7, -1, -3] {
            assert_eq!(ctx.galois_elt_from_step(step) & 1, 1);
        }
        assert_eq!(ctx.galois_elt_conjugate(), 8191);
    }
}
