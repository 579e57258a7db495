use core::fmt;

use rand::RngCore as _;

use crate::aes_sha1::Sha1Profile;
use crate::aes_sha2::Sha2Profile;
use crate::cts::AES_BLOCK_SIZE;
use crate::des::{des3_cbc_decrypt, des3_cbc_encrypt, des_cbc_decrypt, des_cbc_encrypt, des_encryption_key, ZERO_IV};
use crate::key_usage::{KG_USAGE_SIGN, KG_USAGE_SIGN_MS};
use crate::utils::ensure_key_length;
use crate::{arcfour, des, des3};
use crate::{CryptoError, CryptoResult, EncType, ProtocolGeneration, SealAlgorithm, SignAlgorithm};

/// Length of the legacy encrypted sequence number block (4 bytes number + 4 direction bytes).
pub const SEQUENCE_BLOCK_SIZE: usize = 8;

/// Algorithm table for one negotiated key.
///
/// Built once from the context key and never mutated: a new key means a new suite.
#[derive(Clone)]
pub struct CipherSuite {
    enc_type: EncType,
    key: Vec<u8>,
}

impl fmt::Debug for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSuite")
            .field("enc_type", &self.enc_type)
            .finish_non_exhaustive()
    }
}

impl CipherSuite {
    pub fn new(enc_type: EncType, key: &[u8]) -> CryptoResult<Self> {
        ensure_key_length(key, enc_type.key_length())?;

        Ok(Self {
            enc_type,
            key: key.to_vec(),
        })
    }

    /// Builds a suite from an on-the-wire enc-type number.
    pub fn from_raw(enc_type: i32, key: &[u8]) -> CryptoResult<Self> {
        Self::new(EncType::from_raw(enc_type)?, key)
    }

    pub fn enc_type(&self) -> EncType {
        self.enc_type
    }

    pub fn generation(&self) -> ProtocolGeneration {
        self.enc_type.generation()
    }

    pub fn checksum_length(&self) -> usize {
        self.enc_type.checksum_length()
    }

    pub fn confounder_size(&self) -> usize {
        self.enc_type.confounder_size()
    }

    pub fn block_size(&self) -> usize {
        self.enc_type.block_size()
    }

    pub fn sign_algorithm(&self) -> CryptoResult<SignAlgorithm> {
        self.enc_type.sign_algorithm().ok_or_else(|| self.unsupported())
    }

    pub fn seal_algorithm(&self) -> CryptoResult<SealAlgorithm> {
        self.enc_type.seal_algorithm().ok_or_else(|| self.unsupported())
    }

    /// Bytes added by [`CipherSuite::encrypt`] on top of the plaintext: confounder and trailing MAC.
    pub fn encryption_overhead(&self) -> usize {
        self.confounder_size() + self.checksum_length()
    }

    /// Key usage legacy tokens sign with; RC4-HMAC MIC tokens use 15.
    pub fn legacy_sign_usage(&self, mic: bool) -> i32 {
        if mic && self.enc_type == EncType::Rc4Hmac {
            KG_USAGE_SIGN_MS
        } else {
            KG_USAGE_SIGN
        }
    }

    /// Computes the token checksum over the concatenation of `parts`.
    ///
    /// DES-MAC-MD5 ignores `key_usage`; every other algorithm derives its checksum key from it.
    pub fn checksum(&self, key_usage: i32, parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
        match self.enc_type {
            EncType::DesCbcCrc | EncType::DesCbcMd4 | EncType::DesCbcMd5 => des::mac_md5(&self.key, parts),
            EncType::Des3CbcSha1Kd => des3::checksum(&self.key, key_usage, parts),
            EncType::Rc4Hmac => arcfour::checksum(&self.key, key_usage, parts),
            EncType::Aes128CtsHmacSha196 => Sha1Profile::Aes128.checksum(&self.key, key_usage, parts),
            EncType::Aes256CtsHmacSha196 => Sha1Profile::Aes256.checksum(&self.key, key_usage, parts),
            EncType::Aes128CtsHmacSha256128 => Sha2Profile::Aes128Sha256.checksum(&self.key, key_usage, parts),
            EncType::Aes256CtsHmacSha384192 => Sha2Profile::Aes256Sha384.checksum(&self.key, key_usage, parts),
        }
    }

    /// Encrypts the legacy sequence number block, keyed by the token checksum.
    pub fn encrypt_sequence(&self, checksum: &[u8], block: &[u8; SEQUENCE_BLOCK_SIZE]) -> CryptoResult<[u8; SEQUENCE_BLOCK_SIZE]> {
        let out = match self.enc_type {
            EncType::DesCbcCrc | EncType::DesCbcMd4 | EncType::DesCbcMd5 => {
                des_cbc_encrypt(&self.key, sequence_iv(checksum)?, block)?
            }
            EncType::Des3CbcSha1Kd => des3_cbc_encrypt(&self.key, sequence_iv(checksum)?, block)?,
            EncType::Rc4Hmac => arcfour::apply_sequence_keystream(&self.key, checksum, block)?,
            _ => return Err(self.unsupported()),
        };

        to_sequence_block(&out)
    }

    pub fn decrypt_sequence(&self, checksum: &[u8], block: &[u8; SEQUENCE_BLOCK_SIZE]) -> CryptoResult<[u8; SEQUENCE_BLOCK_SIZE]> {
        let out = match self.enc_type {
            EncType::DesCbcCrc | EncType::DesCbcMd4 | EncType::DesCbcMd5 => {
                des_cbc_decrypt(&self.key, sequence_iv(checksum)?, block)?
            }
            EncType::Des3CbcSha1Kd => des3_cbc_decrypt(&self.key, sequence_iv(checksum)?, block)?,
            EncType::Rc4Hmac => arcfour::apply_sequence_keystream(&self.key, checksum, block)?,
            _ => return Err(self.unsupported()),
        };

        to_sequence_block(&out)
    }

    /// Seals `confounder | data | padding` of a legacy Wrap token.
    ///
    /// DES uses the key XOR-ed with 0xF0, DES3 the raw key, both in CBC mode with a zero IV.
    /// RC4-HMAC derives its key from the sequence number.
    pub fn encrypt_legacy(&self, sequence_number: u32, data: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.enc_type {
            EncType::DesCbcCrc | EncType::DesCbcMd4 | EncType::DesCbcMd5 => {
                des_cbc_encrypt(&des_encryption_key(&self.key), &ZERO_IV, data)
            }
            EncType::Des3CbcSha1Kd => des3_cbc_encrypt(&self.key, &ZERO_IV, data),
            EncType::Rc4Hmac => arcfour::apply_data_keystream(&self.key, sequence_number, data),
            _ => Err(self.unsupported()),
        }
    }

    pub fn decrypt_legacy(&self, sequence_number: u32, data: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.enc_type {
            EncType::DesCbcCrc | EncType::DesCbcMd4 | EncType::DesCbcMd5 => {
                des_cbc_decrypt(&des_encryption_key(&self.key), &ZERO_IV, data)
            }
            EncType::Des3CbcSha1Kd => des3_cbc_decrypt(&self.key, &ZERO_IV, data),
            EncType::Rc4Hmac => arcfour::apply_data_keystream(&self.key, sequence_number, data),
            _ => Err(self.unsupported()),
        }
    }

    /// RFC 3961 simplified-profile encryption: `E(Ke, confounder | plaintext) | MAC`.
    ///
    /// The confounder is drawn fresh for every call.
    pub fn encrypt(&self, key_usage: i32, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.enc_type {
            EncType::Aes128CtsHmacSha196 => Sha1Profile::Aes128.encrypt(&self.key, key_usage, plaintext),
            EncType::Aes256CtsHmacSha196 => Sha1Profile::Aes256.encrypt(&self.key, key_usage, plaintext),
            EncType::Aes128CtsHmacSha256128 => {
                Sha2Profile::Aes128Sha256.encrypt(&self.key, key_usage, &random_confounder(), plaintext)
            }
            EncType::Aes256CtsHmacSha384192 => {
                Sha2Profile::Aes256Sha384.encrypt(&self.key, key_usage, &random_confounder(), plaintext)
            }
            _ => Err(self.unsupported()),
        }
    }

    /// Inverse of [`CipherSuite::encrypt`]. Returns the plaintext with the confounder removed.
    pub fn decrypt(&self, key_usage: i32, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.enc_type {
            EncType::Aes128CtsHmacSha196 => Sha1Profile::Aes128.decrypt(&self.key, key_usage, ciphertext),
            EncType::Aes256CtsHmacSha196 => Sha1Profile::Aes256.decrypt(&self.key, key_usage, ciphertext),
            EncType::Aes128CtsHmacSha256128 => Sha2Profile::Aes128Sha256.decrypt(&self.key, key_usage, ciphertext),
            EncType::Aes256CtsHmacSha384192 => Sha2Profile::Aes256Sha384.decrypt(&self.key, key_usage, ciphertext),
            _ => Err(self.unsupported()),
        }
    }

    fn unsupported(&self) -> CryptoError {
        CryptoError::UnsupportedEncType(self.enc_type.as_raw())
    }
}

fn random_confounder() -> [u8; AES_BLOCK_SIZE] {
    let mut confounder = [0; AES_BLOCK_SIZE];
    rand::rng().fill_bytes(&mut confounder);
    confounder
}

fn sequence_iv(checksum: &[u8]) -> CryptoResult<&[u8]> {
    checksum.get(..SEQUENCE_BLOCK_SIZE).ok_or(CryptoError::CipherLength {
        got: checksum.len(),
        min: SEQUENCE_BLOCK_SIZE,
    })
}

fn to_sequence_block(bytes: &[u8]) -> CryptoResult<[u8; SEQUENCE_BLOCK_SIZE]> {
    bytes.try_into().map_err(|_| CryptoError::CipherLength {
        got: bytes.len(),
        min: SEQUENCE_BLOCK_SIZE,
    })
}
