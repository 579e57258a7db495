#![cfg_attr(doc, doc = include_str!("../README.md"))]

mod aes_sha1;
mod aes_sha2;
mod arcfour;
mod cts;
mod des;
mod des3;
mod enctype;
mod error;
mod rc4;
mod suite;
mod utils;

pub mod key_usage;

pub use self::des::des_encryption_key;
pub use self::enctype::{EncType, ProtocolGeneration, SealAlgorithm, SignAlgorithm};
pub use self::error::{CryptoError, CryptoResult};
pub use self::suite::{CipherSuite, SEQUENCE_BLOCK_SIZE};
pub use self::utils::constant_time_eq;
