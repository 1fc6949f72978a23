use rns::poly::{Poly, PolyRNS};

/// The two plaintext representations of the supported schemes.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PlaintextRepr {
    /// Coefficients modulo the plain modulus (BFV/BGV batch encoding).
    Coeffs(Poly<u64>),
    /// Scaled RNS encoding at a chain level (CKKS).
    Rns { polys: PolyRNS<u64>, level: usize },
}

/// An encoded message, not yet tied to a modulus-chain level unless it
/// carries the approximate scheme's RNS representation.
#[derive(Clone, Debug, PartialEq)]
pub struct Plaintext {
    pub(crate) repr: PlaintextRepr,
    pub(crate) scale: f64,
    pub(crate) parms_id: u64,
}

impl Plaintext {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }

    /// The chain level of an RNS plaintext; None for the coefficient
    /// representation, which is level-independent.
    pub fn level(&self) -> Option<usize> {
        match &self.repr {
            PlaintextRepr::Coeffs(_) => None,
            PlaintextRepr::Rns { level, .. } => Some(*level),
        }
    }
}
