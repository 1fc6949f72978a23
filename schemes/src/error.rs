use std::fmt::{Display, Formatter};

/// The closed error taxonomy of the evaluation core. Every violated
/// precondition surfaces synchronously as one of these; nothing is
/// retried or silently corrected.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Parameter-set construction or validation failed; also raised
    /// when an operation is not defined for the context's scheme.
    InvalidParameters(String),
    /// Encoder input does not fit the available slots or the plaintext
    /// space.
    CapacityExceeded { given: usize, capacity: usize },
    /// An encoding scale is non-positive, non-finite, or exceeds the
    /// representable range.
    InvalidScale(f64),
    /// Binary-operation operands live at different levels of the
    /// modulus chain.
    LevelMismatch { lhs: usize, rhs: usize },
    /// Operand scales (or BGV correction factors) differ beyond the
    /// tolerance.
    ScaleMismatch { lhs: f64, rhs: f64 },
    /// A ciphertext is not in the size required by the operation.
    SizeMismatch { given: usize, required: usize },
    /// Relinearization or Galois key material is absent or was
    /// generated under a different parameter set.
    MissingOrMismatchedKey(&'static str),
    /// A further modulus-chain drop was requested at the last level.
    ChainExhausted,
    /// Persisted bytes are corrupted or belong to an incompatible
    /// parameter set.
    DeserializationError(String),
    /// Key material does not match the parameter set of the value it
    /// is applied to.
    KeyMismatch,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            Error::CapacityExceeded { given, capacity } => {
                write!(f, "capacity exceeded: {} values for {} slots", given, capacity)
            }
            Error::InvalidScale(scale) => write!(f, "invalid scale: {}", scale),
            Error::LevelMismatch { lhs, rhs } => {
                write!(f, "level mismatch: {} != {}", lhs, rhs)
            }
            Error::ScaleMismatch { lhs, rhs } => {
                write!(f, "scale mismatch: {} != {}", lhs, rhs)
            }
            Error::SizeMismatch { given, required } => {
                write!(f, "size mismatch: ciphertext size {} != {}", given, required)
            }
            Error::MissingOrMismatchedKey(kind) => {
                write!(f, "missing or mismatched key: {}", kind)
            }
            Error::ChainExhausted => write!(f, "modulus chain exhausted"),
            Error::DeserializationError(msg) => write!(f, "deserialization error: {}", msg),
            Error::KeyMismatch => write!(f, "key material does not match the parameter set"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::DeserializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
