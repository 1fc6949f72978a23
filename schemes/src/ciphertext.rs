use rns::poly::PolyRNS;

/// An encrypted value: a tuple of RNS polynomials at a chain level.
/// Size 2 is the canonical form; size 3 appears transiently after a
/// multiplication until relinearization. The level only moves toward
/// the end of the chain, the size only grows through multiplication
/// and only shrinks back to 2 through relinearization.
#[derive(Clone, Debug, PartialEq)]
pub struct Ciphertext {
    pub(crate) polys: Vec<PolyRNS<u64>>,
    pub(crate) level: usize,
    pub(crate) scale: f64,
    /// BGV decryption factor accumulated by modulus switching; 1 for
    /// the other schemes.
    pub(crate) correction_factor: u64,
    pub(crate) parms_id: u64,
}

impl Ciphertext {
    /// Number of polynomial components (2 in canonical form).
    pub fn size(&self) -> usize {
        self.polys.len()
    }

    /// Index into the modulus chain: the number of dropped moduli.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn correction_factor(&self) -> u64 {
        self.correction_factor
    }

    pub fn parms_id(&self) -> u64 {
        self.parms_id
    }

    /// True when the ciphertext is in the 2-element canonical form
    /// required by rotation, conjugation, and further multiplication.
    pub fn is_canonical(&self) -> bool {
        self.polys.len() == 2
    }
}
