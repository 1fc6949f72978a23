use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// A dense polynomial with n coefficients modulo a single prime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly<O>(pub Vec<O>);

impl<O> Poly<O>
where
    O: Default + Clone + Copy,
{
    pub fn new(n: usize) -> Self {
        Self(vec![O::default(); n])
    }

    pub fn n(&self) -> usize {
        self.0.len()
    }

    pub fn set_all(&mut self, v: &O) {
        self.0.fill(*v)
    }

    pub fn zero(&mut self) {
        self.set_all(&O::default())
    }

    pub fn copy_from(&mut self, other: &Poly<O>) {
        if std::ptr::eq(self, other) {
            return;
        }
        self.0.resize(other.n(), O::default());
        self.0.copy_from_slice(&other.0)
    }
}

impl Poly<u64> {
    pub fn write_to<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.n() as u64)?;
        for &c in self.0.iter() {
            writer.write_u64::<LittleEndian>(c)?;
        }
        Ok(())
    }

    pub fn read_from<R: std::io::Read>(reader: &mut R) -> std::io::Result<Poly<u64>> {
        let n: usize = reader.read_u64::<LittleEndian>()? as usize;
        if n > 1 << 20 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("polynomial length {} out of bounds", n),
            ));
        }
        let mut coeffs: Vec<u64> = vec![0u64; n];
        for c in coeffs.iter_mut() {
            *c = reader.read_u64::<LittleEndian>()?;
        }
        Ok(Poly(coeffs))
    }
}

/// A polynomial in RNS representation: one residue polynomial per prime
/// of the modulus chain, lowest prime first. The level is the index of
/// the last populated limb.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolyRNS<O>(pub Vec<Poly<O>>);

impl<O> PolyRNS<O>
where
    O: Default + Clone + Copy,
{
    pub fn new(n: usize, level: usize) -> Self {
        Self((0..level + 1).map(|_| Poly::new(n)).collect())
    }

    pub fn n(&self) -> usize {
        self.0[0].n()
    }

    pub fn level(&self) -> usize {
        self.0.len() - 1
    }

    pub fn at(&self, i: usize) -> &Poly<O> {
        assert!(
            i <= self.level(),
            "invalid limb index: i={} > level={}",
            i,
            self.level()
        );
        &self.0[i]
    }

    pub fn at_mut(&mut self, i: usize) -> &mut Poly<O> {
        &mut self.0[i]
    }

    pub fn split_at_mut(&mut self, i: usize) -> (&mut [Poly<O>], &mut [Poly<O>]) {
        self.0.split_at_mut(i)
    }

    /// Drops limbs above the given level.
    pub fn truncate_level(&mut self, level: usize) {
        assert!(
            level <= self.level(),
            "invalid level: level={} > self.level()={}",
            level,
            self.level()
        );
        self.0.truncate(level + 1);
    }

    pub fn zero(&mut self) {
        self.0.iter_mut().for_each(|p| p.zero())
    }

    pub fn copy_from(&mut self, other: &PolyRNS<O>) {
        if std::ptr::eq(self, other) {
            return;
        }
        self.0.resize(other.level() + 1, Poly::new(other.n()));
        self.0
            .iter_mut()
            .zip(other.0.iter())
            .for_each(|(a, b)| a.copy_from(b));
    }
}

impl PolyRNS<u64> {
    pub fn write_to<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.0.len() as u64)?;
        for p in self.0.iter() {
            p.write_to(writer)?;
        }
        Ok(())
    }

    pub fn read_from<R: std::io::Read>(reader: &mut R) -> std::io::Result<PolyRNS<u64>> {
        let limbs: usize = reader.read_u64::<LittleEndian>()? as usize;
        if limbs == 0 || limbs > 64 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("limb count {} out of bounds", limbs),
            ));
        }
        let mut polys: Vec<Poly<u64>> = Vec::with_capacity(limbs);
        for _ in 0..limbs {
            polys.push(Poly::read_from(reader)?);
        }
        Ok(PolyRNS(polys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyrns_level_and_limbs() {
        let a: PolyRNS<u64> = PolyRNS::new(8, 2);
        assert_eq!(a.level(), 2);
        assert_eq!(a.n(), 8);
    }

    #[test]
    fn truncate_drops_top_limbs() {
        let mut a: PolyRNS<u64> = PolyRNS::new(8, 3);
        a.truncate_level(1);
        assert_eq!(a.level(), 1);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut a: PolyRNS<u64> = PolyRNS::new(4, 1);
        a.at_mut(0).0.copy_from_slice(&[1, 2, 3, 4]);
        a.at_mut(1).0.copy_from_slice(&[5, 6, 7, 8]);
        let mut bytes: Vec<u8> = Vec::new();
        a.write_to(&mut bytes).unwrap();
        let b: PolyRNS<u64> = PolyRNS::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(a, b);
    }
}
