//! [RFC 3962](https://www.rfc-editor.org/rfc/rfc3962): aes128/256-cts-hmac-sha1-96, provided by `picky-krb`.

use picky_krb::crypto::{ChecksumSuite, CipherSuite as KrbCipherSuite};

use crate::CryptoResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sha1Profile {
    Aes128,
    Aes256,
}

impl Sha1Profile {
    fn cipher_suite(self) -> KrbCipherSuite {
        match self {
            Self::Aes128 => KrbCipherSuite::Aes128CtsHmacSha196,
            Self::Aes256 => KrbCipherSuite::Aes256CtsHmacSha196,
        }
    }

    fn checksum_suite(self) -> ChecksumSuite {
        match self {
            Self::Aes128 => ChecksumSuite::HmacSha196Aes128,
            Self::Aes256 => ChecksumSuite::HmacSha196Aes256,
        }
    }

    /// `HMAC(Kc, parts)[..12]`
    pub(crate) fn checksum(self, key: &[u8], usage: i32, parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
        Ok(self.checksum_suite().hasher().checksum(key, usage, &parts.concat())?)
    }

    /// `E(Ke, conf | plaintext) | HMAC(Ki, conf | plaintext)[..12]` with a fresh random confounder.
    pub(crate) fn encrypt(self, key: &[u8], usage: i32, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.cipher_suite().cipher().encrypt(key, usage, plaintext)?)
    }

    /// Returns the plaintext with the confounder stripped.
    pub(crate) fn decrypt(self, key: &[u8], usage: i32, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(self.cipher_suite().cipher().decrypt(key, usage, ciphertext)?)
    }
}
