//! RNS implementations of the BFV, BGV and CKKS homomorphic encryption
//! schemes: parameter contexts, encoders, key material, encryption and
//! the evaluator performing arithmetic on ciphertexts.

pub mod batch_encoder;
pub mod ciphertext;
pub mod ckks_encoder;
pub mod decryptor;
pub mod encryptor;
pub mod error;
pub mod evaluator;
pub mod key_generator;
mod key_switching;
pub mod keys;
pub mod parameters;
pub mod plaintext;
pub mod serialization;

pub use batch_encoder::BatchEncoder;
pub use ciphertext::Ciphertext;
pub use ckks_encoder::CkksEncoder;
pub use decryptor::Decryptor;
pub use encryptor::Encryptor;
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use key_generator::KeyGenerator;
pub use keys::{GaloisKeys, PublicKey, RelinKeys, SecretKey};
pub use parameters::{modulus_chain, Context, EncryptionParameters, SchemeType};
pub use plaintext::Plaintext;
pub use serialization::{ReaderFrom, WriterTo};
