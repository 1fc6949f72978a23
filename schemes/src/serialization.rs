use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keys::{GaloisKeys, KeySwitchKey, PublicKey, RelinKeys, SecretKey};
use crate::parameters::{Context, SchemeType};
use crate::plaintext::{Plaintext, PlaintextRepr};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rns::poly::{Poly, PolyRNS};

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;

const MAGIC: u32 = 0x524e_5331;

const TAG_CIPHERTEXT: u8 = 1;
const TAG_PLAINTEXT: u8 = 2;
const TAG_SECRET_KEY: u8 = 3;
const TAG_PUBLIC_KEY: u8 = 4;
const TAG_RELIN_KEYS: u8 = 5;
const TAG_GALOIS_KEYS: u8 = 6;

/// Serializes a value into a little-endian byte stream.
pub trait WriterTo {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    fn save_to_vec(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        self.write_to(&mut bytes)
            .expect("writing to a Vec cannot fail");
        bytes
    }
}

/// Deserializes a value, validating the byte stream against the
/// supplied parameter set. Incompatible or corrupted bytes are a hard
/// error, never silently accepted.
pub trait ReaderFrom: Sized {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self>;

    fn load(ctx: &Arc<Context>, bytes: &[u8]) -> Result<Self> {
        Self::read_from(ctx, &mut &bytes[..])
    }
}

fn write_header<W: Write>(writer: &mut W, tag: u8, parms_id: u64) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(MAGIC)?;
    writer.write_u8(tag)?;
    writer.write_u64::<LittleEndian>(parms_id)
}

fn read_header<R: Read>(ctx: &Arc<Context>, reader: &mut R, tag: u8) -> Result<()> {
    let magic: u32 = reader.read_u32::<LittleEndian>()?;
    if magic != MAGIC {
        return Err(Error::DeserializationError(
            "unrecognized byte stream".to_string(),
        ));
    }
    let found: u8 = reader.read_u8()?;
    if found != tag {
        return Err(Error::DeserializationError(format!(
            "type tag {} where {} was expected",
            found, tag
        )));
    }
    let parms_id: u64 = reader.read_u64::<LittleEndian>()?;
    if parms_id != ctx.parms_id() {
        return Err(Error::DeserializationError(
            "byte stream was produced under an incompatible parameter set".to_string(),
        ));
    }
    Ok(())
}

/// Checks a deserialized RNS polynomial against the moduli it claims to
/// live under.
fn validate_polyrns(ctx: &Context, p: &PolyRNS<u64>, limbs: usize, special: bool) -> Result<()> {
    let expected: usize = limbs + special as usize;
    if p.0.len() != expected {
        return Err(Error::DeserializationError(format!(
            "{} limbs where {} were expected",
            p.0.len(),
            expected
        )));
    }
    for (i, poly) in p.0.iter().enumerate() {
        if poly.n() != ctx.n() {
            return Err(Error::DeserializationError(format!(
                "polynomial degree {} does not match the context degree {}",
                poly.n(),
                ctx.n()
            )));
        }
        let q: u64 = if special && i == limbs {
            ctx.special_ring().q()
        } else {
            ctx.ring_at(i).q()
        };
        if poly.0.iter().any(|&c| c >= q) {
            return Err(Error::DeserializationError(format!(
                "coefficient out of range for modulus {}",
                q
            )));
        }
    }
    Ok(())
}

impl WriterTo for Ciphertext {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_header(writer, TAG_CIPHERTEXT, self.parms_id)?;
        writer.write_u64::<LittleEndian>(self.level as u64)?;
        writer.write_u64::<LittleEndian>(self.polys.len() as u64)?;
        writer.write_f64::<LittleEndian>(self.scale)?;
        writer.write_u64::<LittleEndian>(self.correction_factor)?;
        for p in self.polys.iter() {
            p.write_to(writer)?;
        }
        Ok(())
    }
}

impl ReaderFrom for Ciphertext {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self> {
        read_header(ctx, reader, TAG_CIPHERTEXT)?;
        let level: usize = reader.read_u64::<LittleEndian>()? as usize;
        if level > ctx.max_level() {
            return Err(Error::DeserializationError(format!(
                "level {} beyond the last level {}",
                level,
                ctx.max_level()
            )));
        }
        let size: usize = reader.read_u64::<LittleEndian>()? as usize;
        if !(2..=3).contains(&size) {
            return Err(Error::DeserializationError(format!(
                "ciphertext size {} out of range",
                size
            )));
        }
        let scale: f64 = reader.read_f64::<LittleEndian>()?;
        match ctx.scheme() {
            SchemeType::Ckks => {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(Error::DeserializationError(format!(
                        "invalid scale {}",
                        scale
                    )));
                }
            }
            _ => {
                if scale != 1.0 {
                    return Err(Error::DeserializationError(format!(
                        "invalid scale {}",
                        scale
                    )));
                }
            }
        }
        let correction_factor: u64 = reader.read_u64::<LittleEndian>()?;
        match ctx.scheme() {
            SchemeType::Bgv => {
                if correction_factor == 0 || correction_factor >= ctx.plain_modulus() {
                    return Err(Error::DeserializationError(format!(
                        "invalid correction factor {}",
                        correction_factor
                    )));
                }
            }
            _ => {
                if correction_factor != 1 {
                    return Err(Error::DeserializationError(format!(
                        "invalid correction factor {}",
                        correction_factor
                    )));
                }
            }
        }
        let mut polys: Vec<PolyRNS<u64>> = Vec::with_capacity(size);
        for _ in 0..size {
            let p: PolyRNS<u64> = PolyRNS::read_from(reader)?;
            validate_polyrns(ctx, &p, ctx.limbs(level), false)?;
            polys.push(p);
        }
        Ok(Ciphertext {
            polys,
            level,
            scale,
            correction_factor,
            parms_id: ctx.parms_id(),
        })
    }
}

impl WriterTo for Plaintext {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_header(writer, TAG_PLAINTEXT, self.parms_id)?;
        match &self.repr {
            PlaintextRepr::Coeffs(p) => {
                writer.write_u8(0)?;
                writer.write_f64::<LittleEndian>(self.scale)?;
                p.write_to(writer)
            }
            PlaintextRepr::Rns { polys, level } => {
                writer.write_u8(1)?;
                writer.write_f64::<LittleEndian>(self.scale)?;
                writer.write_u64::<LittleEndian>(*level as u64)?;
                polys.write_to(writer)
            }
        }
    }
}

impl ReaderFrom for Plaintext {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self> {
        read_header(ctx, reader, TAG_PLAINTEXT)?;
        let repr_tag: u8 = reader.read_u8()?;
        let scale: f64 = reader.read_f64::<LittleEndian>()?;
        match repr_tag {
            0 => {
                if ctx.scheme() == SchemeType::Ckks {
                    return Err(Error::DeserializationError(
                        "coefficient plaintext under an approximate-scheme context".to_string(),
                    ));
                }
                let p: Poly<u64> = Poly::read_from(reader)?;
                if p.n() != ctx.n() {
                    return Err(Error::DeserializationError(format!(
                        "polynomial degree {} does not match the context degree {}",
                        p.n(),
                        ctx.n()
                    )));
                }
                let t: u64 = ctx.plain_modulus();
                if p.0.iter().any(|&c| c >= t) {
                    return Err(Error::DeserializationError(format!(
                        "coefficient out of range for modulus {}",
                        t
                    )));
                }
                Ok(Plaintext {
                    repr: PlaintextRepr::Coeffs(p),
                    scale,
                    parms_id: ctx.parms_id(),
                })
            }
            1 => {
                if ctx.scheme() != SchemeType::Ckks {
                    return Err(Error::DeserializationError(
                        "approximate plaintext under an integer-scheme context".to_string(),
                    ));
                }
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(Error::DeserializationError(format!(
                        "invalid scale {}",
                        scale
                    )));
                }
                let level: usize = reader.read_u64::<LittleEndian>()? as usize;
                if level > ctx.max_level() {
                    return Err(Error::DeserializationError(format!(
                        "level {} beyond the last level {}",
                        level,
                        ctx.max_level()
                    )));
                }
                let polys: PolyRNS<u64> = PolyRNS::read_from(reader)?;
                validate_polyrns(ctx, &polys, ctx.limbs(level), false)?;
                Ok(Plaintext {
                    repr: PlaintextRepr::Rns { polys, level },
                    scale,
                    parms_id: ctx.parms_id(),
                })
            }
            _ => Err(Error::DeserializationError(format!(
                "unknown plaintext representation {}",
                repr_tag
            ))),
        }
    }
}

impl WriterTo for SecretKey {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_header(writer, TAG_SECRET_KEY, self.parms_id)?;
        self.s.write_to(writer)
    }
}

impl ReaderFrom for SecretKey {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self> {
        read_header(ctx, reader, TAG_SECRET_KEY)?;
        let s: PolyRNS<u64> = PolyRNS::read_from(reader)?;
        let full: usize = ctx.coeff_modulus().len();
        validate_polyrns(ctx, &s, full.min(ctx.data_count()), full > 1)?;
        Ok(SecretKey {
            s,
            parms_id: ctx.parms_id(),
        })
    }
}

impl WriterTo for PublicKey {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_header(writer, TAG_PUBLIC_KEY, self.parms_id)?;
        self.p0.write_to(writer)?;
        self.p1.write_to(writer)
    }
}

impl ReaderFrom for PublicKey {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self> {
        read_header(ctx, reader, TAG_PUBLIC_KEY)?;
        let p0: PolyRNS<u64> = PolyRNS::read_from(reader)?;
        let p1: PolyRNS<u64> = PolyRNS::read_from(reader)?;
        validate_polyrns(ctx, &p0, ctx.data_count(), false)?;
        validate_polyrns(ctx, &p1, ctx.data_count(), false)?;
        Ok(PublicKey {
            p0,
            p1,
            parms_id: ctx.parms_id(),
        })
    }
}

impl KeySwitchKey {
    fn write_rows<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.rows.len() as u64)?;
        for (b, a) in self.rows.iter() {
            b.write_to(writer)?;
            a.write_to(writer)?;
        }
        Ok(())
    }

    fn read_rows<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<KeySwitchKey> {
        let count: usize = reader.read_u64::<LittleEndian>()? as usize;
        if count != ctx.data_count() {
            return Err(Error::DeserializationError(format!(
                "{} gadget rows where {} were expected",
                count,
                ctx.data_count()
            )));
        }
        let mut rows: Vec<(PolyRNS<u64>, PolyRNS<u64>)> = Vec::with_capacity(count);
        for _ in 0..count {
            let b: PolyRNS<u64> = PolyRNS::read_from(reader)?;
            let a: PolyRNS<u64> = PolyRNS::read_from(reader)?;
            validate_polyrns(ctx, &b, ctx.data_count(), true)?;
            validate_polyrns(ctx, &a, ctx.data_count(), true)?;
            rows.push((b, a));
        }
        Ok(KeySwitchKey { rows })
    }
}

impl WriterTo for RelinKeys {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_header(writer, TAG_RELIN_KEYS, self.parms_id)?;
        self.key.write_rows(writer)
    }
}

impl ReaderFrom for RelinKeys {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self> {
        read_header(ctx, reader, TAG_RELIN_KEYS)?;
        if !ctx.using_keyswitching() {
            return Err(Error::DeserializationError(
                "the parameter set carries no key-switching modulus".to_string(),
            ));
        }
        Ok(RelinKeys {
            key: KeySwitchKey::read_rows(ctx, reader)?,
            parms_id: ctx.parms_id(),
        })
    }
}

impl WriterTo for GaloisKeys {
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_header(writer, TAG_GALOIS_KEYS, self.parms_id)?;
        writer.write_u64::<LittleEndian>(self.keys.len() as u64)?;
        for (&elt, key) in self.keys.iter() {
            writer.write_u64::<LittleEndian>(elt as u64)?;
            key.write_rows(writer)?;
        }
        Ok(())
    }
}

impl ReaderFrom for GaloisKeys {
    fn read_from<R: Read>(ctx: &Arc<Context>, reader: &mut R) -> Result<Self> {
        read_header(ctx, reader, TAG_GALOIS_KEYS)?;
        if !ctx.using_keyswitching() {
            return Err(Error::DeserializationError(
                "the parameter set carries no key-switching modulus".to_string(),
            ));
        }
        let count: usize = reader.read_u64::<LittleEndian>()? as usize;
        if count > 4 * ctx.n() {
            return Err(Error::DeserializationError(format!(
                "galois key count {} out of range",
                count
            )));
        }
        let mut keys: BTreeMap<usize, KeySwitchKey> = BTreeMap::new();
        for _ in 0..count {
            let elt: usize = reader.read_u64::<LittleEndian>()? as usize;
            if elt & 1 == 0 || elt >= 2 * ctx.n() {
                return Err(Error::DeserializationError(format!(
                    "galois element {} is not an odd unit mod 2n",
                    elt
                )));
            }
            keys.insert(elt, KeySwitchKey::read_rows(ctx, reader)?);
        }
        Ok(GaloisKeys {
            keys,
            parms_id: ctx.parms_id(),
        })
    }
}
