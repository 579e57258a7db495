//! [RFC 8009](https://www.rfc-editor.org/rfc/rfc8009): aes128-cts-hmac-sha256-128 and aes256-cts-hmac-sha384-192.

use crate::cts::{self, AES_BLOCK_SIZE};
use crate::key_usage::{usage_kc, usage_ke, usage_ki};
use crate::utils::{constant_time_eq, hmac_sha256, hmac_sha384};
use crate::{CryptoError, CryptoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sha2Profile {
    Aes128Sha256,
    Aes256Sha384,
}

impl Sha2Profile {
    pub(crate) fn mac_size(self) -> usize {
        match self {
            Self::Aes128Sha256 => 16,
            Self::Aes256Sha384 => 24,
        }
    }

    fn encryption_key_size(self) -> usize {
        match self {
            Self::Aes128Sha256 => 16,
            Self::Aes256Sha384 => 32,
        }
    }

    fn hmac(self, key: &[u8], parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
        match self {
            Self::Aes128Sha256 => hmac_sha256(key, parts),
            Self::Aes256Sha384 => hmac_sha384(key, parts),
        }
    }

    /// KDF-HMAC-SHA2(key, label, k) = k-truncate(HMAC(key, 00000001 | label | 00 | k))
    fn kdf(self, key: &[u8], label: &[u8], out_len: usize) -> CryptoResult<Vec<u8>> {
        let bits = u32::try_from(out_len * 8).map_err(|_| CryptoError::KeyLength {
            got: out_len,
            expected: self.encryption_key_size(),
        })?;

        let mut out = self.hmac(key, &[1u32.to_be_bytes().as_slice(), label, &[0u8][..], bits.to_be_bytes().as_slice()])?;
        out.truncate(out_len);

        Ok(out)
    }

    pub(crate) fn checksum(self, key: &[u8], usage: i32, parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
        let kc = self.kdf(key, &usage_kc(usage), self.mac_size())?;

        let mut mac = self.hmac(&kc, parts)?;
        mac.truncate(self.mac_size());

        Ok(mac)
    }

    /// `C = E(Ke, conf | plaintext)`, then `C | HMAC(Ki, IV | C)[..h]`
    pub(crate) fn encrypt(
        self,
        key: &[u8],
        usage: i32,
        confounder: &[u8; AES_BLOCK_SIZE],
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let ke = self.kdf(key, &usage_ke(usage), self.encryption_key_size())?;
        let ki = self.kdf(key, &usage_ki(usage), self.mac_size())?;

        let mut data = Vec::with_capacity(AES_BLOCK_SIZE + plaintext.len());
        data.extend_from_slice(confounder);
        data.extend_from_slice(plaintext);

        let iv = [0; AES_BLOCK_SIZE];
        let mut encrypted = cts::encrypt(&ke, &data)?;

        let mac = self.hmac(&ki, &[iv.as_slice(), encrypted.as_slice()])?;
        encrypted.extend_from_slice(&mac[..self.mac_size()]);

        Ok(encrypted)
    }

    pub(crate) fn decrypt(self, key: &[u8], usage: i32, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let min = AES_BLOCK_SIZE + self.mac_size();

        if ciphertext.len() < min {
            return Err(CryptoError::CipherLength {
                got: ciphertext.len(),
                min,
            });
        }

        let ke = self.kdf(key, &usage_ke(usage), self.encryption_key_size())?;
        let ki = self.kdf(key, &usage_ki(usage), self.mac_size())?;

        let (encrypted, mac) = ciphertext.split_at(ciphertext.len() - self.mac_size());
        let iv = [0; AES_BLOCK_SIZE];

        // verify before decrypting
        let expected = self.hmac(&ki, &[iv.as_slice(), encrypted])?;
        if !constant_time_eq(&expected[..self.mac_size()], mac) {
            return Err(CryptoError::IntegrityCheck);
        }

        let mut data = cts::decrypt(&ke, encrypted)?;

        Ok(data.split_off(AES_BLOCK_SIZE))
    }
}
