use rns::poly::PolyRNS;

use std::collections::BTreeMap;

/// The secret key: a ternary polynomial held as residues over the full
/// chain (data and key moduli), in the coefficient domain. It never
/// leaves the owning party; only the decryptor and the key generator
/// consume it.
#[derive(Clone, Debug, PartialEq)]
pub struct SecretKey {
    pub(crate) s: PolyRNS<u64>,
    pub(crate) parms_id: u64,
}

impl SecretKey {
    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }
}

/// The public encryption key: an encryption of zero over the data
/// chain, in the coefficient domain.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    pub(crate) p0: PolyRNS<u64>,
    pub(crate) p1: PolyRNS<u64>,
    pub(crate) parms_id: u64,
}

impl PublicKey {
    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }
}

/// A gadget of RLWE rows over the extended basis (data chain plus key
/// modulus), stored in the NTT domain: row i carries the switched-out
/// key scaled by the key modulus, embedded in data limb i.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct KeySwitchKey {
    /// (b, a) pairs, one per data limb
    pub(crate) rows: Vec<(PolyRNS<u64>, PolyRNS<u64>)>,
}

/// Enables reducing a degree-3 ciphertext back to canonical degree-2
/// form after a multiplication.
#[derive(Clone, Debug, PartialEq)]
pub struct RelinKeys {
    pub(crate) key: KeySwitchKey,
    pub(crate) parms_id: u64,
}

impl RelinKeys {
    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }
}

/// Keys for the ring automorphisms behind slot rotation and
/// conjugation, indexed by Galois element.
#[derive(Clone, Debug, PartialEq)]
pub struct GaloisKeys {
    pub(crate) keys: BTreeMap<usize, KeySwitchKey>,
    pub(crate) parms_id: u64,
}

impl GaloisKeys {
    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }

    pub fn has_key(&self, galois_elt: usize) -> bool {
        self.keys.contains_key(&galois_elt)
    }

    pub fn galois_elts(&self) -> impl Iterator<Item = usize> + '_ {
        self.keys.keys().copied()
    }
}
